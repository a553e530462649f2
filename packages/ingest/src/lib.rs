#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! NBA scoreboard ingestion: fetch a date range from the stats API, merge
//! the line scores, upload the configured batch of items, and record how
//! every upload went in the monitor table.

pub mod config;
pub mod upload;

use std::sync::Arc;
use std::time::Instant;

use duckdb::Connection;
use nba_stats_database::monitor::persist_monitor_records;
use nba_stats_database::{DbError, db};
use nba_stats_database_models::{ItemMapping, MonitorRecord};
use nba_stats_scoreboard::fetch::{Pacing, fetch_scoreboard_range};
use nba_stats_scoreboard::merge::merge_line_score;
use nba_stats_scoreboard::progress::ProgressCallback;
use nba_stats_scoreboard::{FetchError, ScoreboardProvider, TransformError};
use nba_stats_scoreboard_models::DateKey;

use crate::config::{AppConfig, ConfigError, MappingConfig, TableTarget};

/// Errors that abort an ingestion run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),

    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

/// Data and monitoring store connections.
///
/// When both connection strings point at the same database file a single
/// connection serves both, since `DuckDB` holds an exclusive lock per file.
pub struct Stores {
    data: Connection,
    monitor: Option<Connection>,
}

impl Stores {
    /// Opens the stores named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if either connection fails.
    pub fn open(config: &AppConfig) -> Result<Self, DbError> {
        log::info!("Pushing data to db at: {}", config.db_url);
        let data = db::connect(&config.db_url)?;

        let monitor = if db::same_database(&config.db_url, &config.monitor_db_url) {
            log::info!("Monitor stats share the data db connection");
            None
        } else {
            log::info!("Pushing monitor stats to db at: {}", config.monitor_db_url);
            Some(db::connect(&config.monitor_db_url)?)
        };

        Ok(Self { data, monitor })
    }

    /// Wraps existing connections. `monitor = None` records into `data`.
    #[must_use]
    pub const fn new(data: Connection, monitor: Option<Connection>) -> Self {
        Self { data, monitor }
    }

    /// Whether monitor records go through the data connection.
    #[must_use]
    pub const fn shares_connection(&self) -> bool {
        self.monitor.is_none()
    }

    #[must_use]
    pub const fn data(&self) -> &Connection {
        &self.data
    }

    #[must_use]
    pub fn monitor(&self) -> &Connection {
        self.monitor.as_ref().unwrap_or(&self.data)
    }
}

/// Everything a run needs besides the stores and the provider.
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// First day to fetch; yesterday when `None`.
    pub start: Option<DateKey>,
    /// Last day to fetch; yesterday when `None`.
    pub end: Option<DateKey>,
    pub pacing: Pacing,
    /// Items to upload.
    pub batch: Vec<ItemMapping>,
    /// Where monitor records go.
    pub monitor: TableTarget,
}

impl RunPlan {
    /// Resolves the batch (`batch`, or the config's default) and pacing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownBatch`] if the batch is not defined.
    pub fn new(
        config: &AppConfig,
        mapping: &MappingConfig,
        batch: Option<&str>,
        start: Option<DateKey>,
        end: Option<DateKey>,
    ) -> Result<Self, ConfigError> {
        let batch_name = batch.unwrap_or(&config.batch);
        log::info!("Using batch: {batch_name}");

        Ok(Self {
            start,
            end,
            pacing: config.pacing(),
            batch: mapping.batch(batch_name)?,
            monitor: mapping.monitor.clone(),
        })
    }
}

/// Outcome counts of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Dates fetched.
    pub dates: usize,
    /// Items uploaded (one per monitor record).
    pub uploaded: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Rows written to the monitor table.
    pub monitor_rows: u64,
}

impl RunSummary {
    #[must_use]
    pub fn from_records(dates: usize, records: &[MonitorRecord], monitor_rows: u64) -> Self {
        let succeeded = records.iter().filter(|r| r.success).count();
        Self {
            dates,
            uploaded: records.len(),
            succeeded,
            failed: records.len() - succeeded,
            monitor_rows,
        }
    }
}

/// Runs the full fetch, merge, upload, and monitor pipeline.
///
/// Fetch and transform errors abort the run before anything is written.
/// Upload failures are per item and only show up in the monitor records and
/// the summary.
///
/// # Errors
///
/// Returns [`IngestError`] if the fetch, the merge, or the monitor write
/// fails.
pub async fn run(
    provider: &dyn ScoreboardProvider,
    stores: &mut Stores,
    plan: &RunPlan,
    progress: Arc<dyn ProgressCallback>,
) -> Result<RunSummary, IngestError> {
    let start = Instant::now();

    log::info!("Getting data...");
    let mut data =
        fetch_scoreboard_range(provider, plan.start, plan.end, plan.pacing, progress).await?;
    merge_line_score(&mut data)?;
    log::info!("Retrieved data for {} date(s)", data.len());

    let records = upload::batch_upload(&data, &mut stores.data, &plan.batch);

    let monitor_conn = match stores.monitor.as_mut() {
        Some(conn) => conn,
        None => &mut stores.data,
    };
    let monitor_rows = persist_monitor_records(
        monitor_conn,
        &plan.monitor.table,
        plan.monitor.action,
        &records,
    )?;

    let summary = RunSummary::from_records(data.len(), &records, monitor_rows);
    log::info!(
        "Finished run in {:.1}s: {} date(s), {} item(s) uploaded, {} succeeded, {} failed",
        start.elapsed().as_secs_f64(),
        summary.dates,
        summary.uploaded,
        summary.succeeded,
        summary.failed
    );

    Ok(summary)
}
