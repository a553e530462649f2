#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Scoreboard data shapes shared by the fetcher, transformer, and uploader.
//!
//! A scoreboard run produces a [`ScoreboardData`] map: one [`NamedDataset`]
//! per [`DateKey`], where each named [`Dataset`] is a result set returned by
//! the stats API (e.g. `LineScore`, `Available`) with the provider's column
//! names kept verbatim.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// `chrono` format string used to render a [`DateKey`].
pub const DATE_KEY_FORMAT: &str = "%Y/%m/%d";

/// Column that pairs the away and home `LineScore` rows of one game.
pub const GAME_SEQUENCE_COLUMN: &str = "GAME_SEQUENCE";

/// Item names returned by the `scoreboardv2` endpoint, plus the derived
/// `mergedLineScore` item.
pub mod items {
    pub const GAME_HEADER: &str = "GameHeader";
    pub const LINE_SCORE: &str = "LineScore";
    pub const SERIES_STANDINGS: &str = "SeriesStandings";
    pub const LAST_MEETING: &str = "LastMeeting";
    pub const EAST_CONF_STANDINGS_BY_DAY: &str = "EastConfStandingsByDay";
    pub const WEST_CONF_STANDINGS_BY_DAY: &str = "WestConfStandingsByDay";
    pub const TEAM_LEADERS: &str = "TeamLeaders";
    pub const AVAILABLE: &str = "Available";
    pub const TICKET_LINKS: &str = "TicketLinks";
    pub const WIN_PROBABILITY: &str = "WinProbability";

    /// Away/home `LineScore` rows joined into one row per game.
    pub const MERGED_LINE_SCORE: &str = "mergedLineScore";
}

/// Errors raised while building scoreboard data shapes.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// A row does not have one cell per column.
    #[error("Row {row} has {found} cells, expected {expected}")]
    RowWidth {
        /// Zero-based row position.
        row: usize,
        /// Number of columns in the dataset.
        expected: usize,
        /// Number of cells in the offending row.
        found: usize,
    },

    /// A date string did not match [`DATE_KEY_FORMAT`].
    #[error("Invalid date key {value:?}: {source}")]
    DateKey {
        /// The rejected input.
        value: String,
        /// Underlying parse failure.
        source: chrono::ParseError,
    },
}

/// A calendar date used as the top-level key of scoreboard data.
///
/// Displays (and serializes) as `YYYY/MM/DD`, which is also the form the
/// stats API expects for its `GameDate` parameter. Ordering is
/// chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// Wraps a calendar date.
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Returns the wrapped calendar date.
    #[must_use]
    pub const fn date(self) -> NaiveDate {
        self.0
    }

    /// Returns the day before today on the local clock.
    #[must_use]
    pub fn yesterday() -> Self {
        Self(Local::now().date_naive() - Duration::days(1))
    }

    /// Returns every day from `start` to `end`, both inclusive.
    ///
    /// Yields nothing when `start` is after `end`.
    pub fn range(start: Self, end: Self) -> impl Iterator<Item = Self> {
        start
            .0
            .iter_days()
            .take_while(move |d| *d <= end.0)
            .map(Self)
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl From<DateKey> for String {
    fn from(key: DateKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for DateKey {
    type Error = DatasetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for DateKey {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, DATE_KEY_FORMAT)
            .map(Self)
            .map_err(|source| DatasetError::DateKey {
                value: s.to_string(),
                source,
            })
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_KEY_FORMAT))
    }
}

/// An ordered table of rows with named columns.
///
/// Cells are JSON scalars exactly as the stats API returned them.
/// Deserialization goes through [`Dataset::new`], so ragged rows are
/// rejected there too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<serde_json::Value>>,
}

impl Dataset {
    /// Builds a dataset, checking that every row has one cell per column.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::RowWidth`] for the first row whose width
    /// differs from the column count.
    pub fn new(
        columns: Vec<String>,
        rows: Vec<Vec<serde_json::Value>>,
    ) -> Result<Self, DatasetError> {
        if let Some((row, cells)) = rows
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != columns.len())
        {
            return Err(DatasetError::RowWidth {
                row,
                expected: columns.len(),
                found: cells.len(),
            });
        }

        Ok(Self { columns, rows })
    }

    /// A dataset with no columns and no rows.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<serde_json::Value>] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// `true` when the dataset has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the named column, if present.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of the named column in row order.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<&serde_json::Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }
}

#[derive(Deserialize)]
struct RawDataset {
    columns: Vec<String>,
    rows: Vec<Vec<serde_json::Value>>,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = DatasetError;

    fn try_from(raw: RawDataset) -> Result<Self, Self::Error> {
        Self::new(raw.columns, raw.rows)
    }
}

/// Named result sets returned for one date, keyed by item name.
pub type NamedDataset = BTreeMap<String, Dataset>;

/// Scoreboard data for a range of dates.
pub type ScoreboardData = BTreeMap<DateKey, NamedDataset>;
