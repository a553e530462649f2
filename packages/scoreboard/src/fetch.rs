//! Date-range fetch with fixed pacing.
//!
//! One request per calendar day, strictly in order. After every
//! `batch_size_days`-th request the loop sleeps for `pause` so the stats
//! API does not start rejecting us. There is no retry: the first provider
//! error aborts the whole range.

use std::sync::Arc;
use std::time::Duration;

use nba_stats_scoreboard_models::{DateKey, ScoreboardData};

use crate::progress::ProgressCallback;
use crate::{FetchError, ScoreboardProvider};

/// Request pacing for a range fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Number of days requested between pauses. `0` disables pausing.
    pub batch_size_days: u32,
    /// How long to pause after each batch.
    pub pause: Duration,
}

impl Pacing {
    /// 30 days per batch, 60 second pause.
    pub const DEFAULT: Self = Self {
        batch_size_days: 30,
        pause: Duration::from_secs(60),
    };

    /// Whether to pause after the `n`-th request (1-indexed).
    #[must_use]
    pub const fn pause_after(&self, n: usize) -> bool {
        self.batch_size_days > 0 && n % self.batch_size_days as usize == 0
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Fetches scoreboard data for every day from `start` to `end` inclusive.
///
/// Both bounds default to yesterday when `None`.
///
/// # Errors
///
/// Returns [`FetchError::InvalidRange`] if `start` is after `end`, or the
/// first error the provider returns. Nothing fetched before the error is
/// returned.
pub async fn fetch_scoreboard_range(
    provider: &dyn ScoreboardProvider,
    start: Option<DateKey>,
    end: Option<DateKey>,
    pacing: Pacing,
    progress: Arc<dyn ProgressCallback>,
) -> Result<ScoreboardData, FetchError> {
    let start = start.unwrap_or_else(DateKey::yesterday);
    let end = end.unwrap_or_else(DateKey::yesterday);
    if start > end {
        return Err(FetchError::InvalidRange { start, end });
    }

    let days: Vec<DateKey> = DateKey::range(start, end).collect();
    log::info!(
        "Fetching scoreboard data for {} day(s): {start} to {end}",
        days.len()
    );
    progress.set_total(days.len() as u64);

    let mut out = ScoreboardData::new();

    for (i, day) in days.iter().enumerate() {
        log::debug!("Getting scoreboard data for date: {day}");
        progress.set_message(format!("Scoreboard {day}"));

        let datasets = provider.scoreboard(*day).await?;
        log::debug!("{day}: received {} result set(s)", datasets.len());
        out.insert(*day, datasets);
        progress.inc(1);

        if pacing.pause_after(i + 1) {
            log::debug!(
                "Fetched {} of {} day(s), sleeping for {:?}",
                i + 1,
                days.len(),
                pacing.pause
            );
            tokio::time::sleep(pacing.pause).await;
            log::debug!("Resuming scoreboard fetch");
        }
    }

    progress.finish(format!("Fetched {} day(s)", out.len()));
    log::info!("Found {} day(s) of scoreboard data", out.len());

    Ok(out)
}
