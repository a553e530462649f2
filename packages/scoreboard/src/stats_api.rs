//! `stats.nba.com` scoreboard client.
//!
//! Calls the `scoreboardv2` endpoint once per game date and decodes its
//! `resultSets` payload:
//!
//! ```json
//! {"resultSets": [{"name": "LineScore", "headers": ["GAME_SEQUENCE", ...],
//!                  "rowSet": [[1, ...], [1, ...]]}, ...]}
//! ```
//!
//! The API rejects requests without browser-like headers, so the client
//! always sends them.

use std::time::Duration;

use async_trait::async_trait;
use nba_stats_scoreboard_models::{Dataset, DateKey, NamedDataset};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue, ORIGIN, REFERER};

use crate::{FetchError, ScoreboardProvider};

/// Base URL of the stats API.
pub const DEFAULT_BASE_URL: &str = "https://stats.nba.com/stats";

/// Per-request timeout. The stats API is slow to answer for busy dates.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// NBA league identifier (`00`; the WNBA and G League use others).
const LEAGUE_ID: &str = "00";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(ORIGIN, HeaderValue::from_static("https://www.nba.com"));
    headers.insert(REFERER, HeaderValue::from_static("https://www.nba.com/"));
    headers.insert(
        HeaderName::from_static("x-nba-stats-origin"),
        HeaderValue::from_static("stats"),
    );
    headers.insert(
        HeaderName::from_static("x-nba-stats-token"),
        HeaderValue::from_static("true"),
    );
    headers
}

/// [`ScoreboardProvider`] backed by the public stats API.
pub struct StatsApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl StatsApiClient {
    /// Builds a client against [`DEFAULT_BASE_URL`].
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Builds a client against a different host (mirrors, proxies).
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the HTTP client cannot be built.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(default_headers())
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// URL of the `scoreboardv2` request for `date`.
    #[must_use]
    pub fn scoreboard_url(&self, date: DateKey) -> String {
        format!(
            "{}/scoreboardv2?GameDate={}&LeagueID={LEAGUE_ID}&DayOffset=0",
            self.base_url,
            date.to_string().replace('/', "%2F"),
        )
    }
}

#[async_trait]
impl ScoreboardProvider for StatsApiClient {
    async fn scoreboard(&self, date: DateKey) -> Result<NamedDataset, FetchError> {
        let url = self.scoreboard_url(date);
        log::trace!("GET {url}");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { date, status });
        }

        let body: serde_json::Value = response.json().await?;
        parse_result_sets(date, &body)
    }
}

/// Decodes a stats API `resultSets` payload into named datasets.
///
/// # Errors
///
/// Returns [`FetchError::Payload`] if the payload is missing `resultSets`
/// or a result set is missing its `name`, `headers`, or `rowSet`, and
/// [`FetchError::Dataset`] if a row's width does not match its headers.
pub fn parse_result_sets(
    date: DateKey,
    body: &serde_json::Value,
) -> Result<NamedDataset, FetchError> {
    let payload_err = |message: String| FetchError::Payload { date, message };

    let result_sets = body["resultSets"]
        .as_array()
        .ok_or_else(|| payload_err("no resultSets array".to_string()))?;

    let mut out = NamedDataset::new();

    for (i, set) in result_sets.iter().enumerate() {
        let name = set["name"]
            .as_str()
            .ok_or_else(|| payload_err(format!("result set {i} has no name")))?;

        let columns = set["headers"]
            .as_array()
            .ok_or_else(|| payload_err(format!("{name} has no headers")))?
            .iter()
            .map(|h| {
                h.as_str()
                    .map(String::from)
                    .ok_or_else(|| payload_err(format!("{name} has a non-string header: {h}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rows = set["rowSet"]
            .as_array()
            .ok_or_else(|| payload_err(format!("{name} has no rowSet")))?
            .iter()
            .map(|row| {
                row.as_array()
                    .cloned()
                    .ok_or_else(|| payload_err(format!("{name} has a non-array row")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        out.insert(name.to_string(), Dataset::new(columns, rows)?);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn day() -> DateKey {
        DateKey::new(NaiveDate::from_ymd_opt(2019, 12, 1).unwrap())
    }

    #[test]
    fn parses_result_sets() {
        let body = json!({
            "resource": "scoreboard",
            "resultSets": [
                {
                    "name": "LineScore",
                    "headers": ["GAME_SEQUENCE", "TEAM_ABBREVIATION", "PTS"],
                    "rowSet": [[1, "BOS", 113], [1, "BKN", 104]]
                },
                {
                    "name": "Available",
                    "headers": ["GAME_ID", "PT_AVAILABLE"],
                    "rowSet": [["0021900297", 1]]
                },
                {
                    "name": "TicketLinks",
                    "headers": ["GAME_ID", "LEAG_TIX"],
                    "rowSet": []
                }
            ]
        });

        let sets = parse_result_sets(day(), &body).unwrap();
        assert_eq!(sets.len(), 3);
        assert_eq!(sets["LineScore"].len(), 2);
        assert_eq!(sets["LineScore"].columns()[1], "TEAM_ABBREVIATION");
        assert_eq!(sets["LineScore"].rows()[1][1], json!("BKN"));
        assert!(sets["TicketLinks"].is_empty());
    }

    #[test]
    fn missing_result_sets_is_a_payload_error() {
        let err = parse_result_sets(day(), &json!({"message": "throttled"})).unwrap_err();
        assert!(matches!(err, FetchError::Payload { .. }));
    }

    #[test]
    fn ragged_row_is_a_dataset_error() {
        let body = json!({
            "resultSets": [{"name": "LineScore", "headers": ["A", "B"], "rowSet": [[1]]}]
        });
        let err = parse_result_sets(day(), &body).unwrap_err();
        assert!(matches!(err, FetchError::Dataset(_)));
    }

    #[test]
    fn builds_scoreboard_url() {
        let client = StatsApiClient::with_base_url("http://localhost:8080/stats/").unwrap();
        assert_eq!(
            client.scoreboard_url(day()),
            "http://localhost:8080/stats/scoreboardv2?GameDate=2019%2F12%2F01&LeagueID=00&DayOffset=0"
        );
    }
}
