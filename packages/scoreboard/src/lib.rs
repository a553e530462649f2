#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Scoreboard collection and reshaping.
//!
//! [`fetch::fetch_scoreboard_range`] walks a date range against any
//! [`ScoreboardProvider`] (normally [`stats_api::StatsApiClient`]), pausing
//! between batches of days so the stats API does not throttle us.
//! [`merge::merge_line_score`] then pairs the away and home `LineScore` rows
//! of every game into a `mergedLineScore` dataset.

pub mod fetch;
pub mod merge;
pub mod progress;
pub mod stats_api;

use async_trait::async_trait;
use nba_stats_scoreboard_models::{DatasetError, DateKey, NamedDataset};

/// Errors that can occur while fetching scoreboard data.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The stats API answered with a non-success status.
    #[error("Stats API returned HTTP {status} for {date}")]
    Status {
        /// Requested game date.
        date: DateKey,
        /// Response status.
        status: reqwest::StatusCode,
    },

    /// The response body did not have the expected `resultSets` shape.
    #[error("Unexpected stats API payload for {date}: {message}")]
    Payload {
        /// Requested game date.
        date: DateKey,
        /// Description of what went wrong.
        message: String,
    },

    /// A result set could not be turned into a dataset.
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// The requested range ends before it starts.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange {
        /// First requested day.
        start: DateKey,
        /// Last requested day.
        end: DateKey,
    },
}

/// Errors that can occur while reshaping scoreboard data.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// A date is missing an item the transform depends on.
    #[error("{date}: missing {item} dataset")]
    MissingItem {
        /// Date being transformed.
        date: DateKey,
        /// Item that was expected.
        item: &'static str,
    },

    /// An item is missing a column the transform depends on.
    #[error("{date}: {item} has no {column} column")]
    MissingColumn {
        /// Date being transformed.
        date: DateKey,
        /// Item that was inspected.
        item: &'static str,
        /// Column that was expected.
        column: &'static str,
    },

    /// The joined rows did not form a valid dataset.
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
}

/// A remote service that returns the scoreboard result sets for one day.
#[async_trait]
pub trait ScoreboardProvider: Send + Sync {
    /// Fetches every named result set for `date`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request fails or the response cannot
    /// be decoded.
    async fn scoreboard(&self, date: DateKey) -> Result<NamedDataset, FetchError>;
}
