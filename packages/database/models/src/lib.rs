#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Upload configuration and outcome types.
//!
//! An [`ItemMapping`] says where a scoreboard item goes and how it is
//! written. Every upload attempt yields a [`MonitorRecord`] that captures
//! the destination table's row count before and after the write.

use nba_stats_scoreboard_models::{Dataset, DateKey};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// How a dataset is written to its destination table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum WriteAction {
    /// Refuse to write if the table already exists.
    Fail,
    /// Drop and recreate the table, then write.
    Replace,
    /// Add rows to the table, creating it if needed.
    Append,
}

/// Destination of one scoreboard item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMapping {
    /// Item name as returned by the stats API (e.g. `"LineScore"`).
    pub item: String,
    /// Destination table name.
    pub table: String,
    /// Write mode.
    pub action: WriteAction,
}

impl ItemMapping {
    #[must_use]
    pub fn new(item: impl Into<String>, table: impl Into<String>, action: WriteAction) -> Self {
        Self {
            item: item.into(),
            table: table.into(),
            action,
        }
    }
}

/// Outcome of uploading one item for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorRecord {
    /// Scoreboard date the item belongs to.
    pub date: DateKey,
    /// Item name.
    pub item: String,
    /// Destination row count before the write.
    pub pre_offset: u64,
    /// Destination row count after the write (last successful read).
    pub post_offset: u64,
    /// Number of rows in the uploaded dataset.
    pub size: u64,
    /// Whether the write is considered verified.
    pub success: bool,
}

/// Columns of the monitor table, in order.
pub const MONITOR_COLUMNS: [&str; 6] = [
    "date",
    "item",
    "pre_offset",
    "post_offset",
    "size",
    "success",
];

/// Offset-delta verification of a completed write.
///
/// `REPLACE` rewrites the whole table, so its offsets are not comparable
/// and the write always counts as verified. Otherwise the table must have
/// grown by exactly `size` rows.
#[must_use]
pub fn write_verified(action: WriteAction, pre_offset: u64, post_offset: u64, size: u64) -> bool {
    action == WriteAction::Replace || post_offset.checked_sub(pre_offset) == Some(size)
}

/// Converts monitor records into a dataset with [`MONITOR_COLUMNS`], ready
/// to be written to the monitor table.
#[must_use]
pub fn monitor_dataset(records: &[MonitorRecord]) -> Dataset {
    let columns = MONITOR_COLUMNS.iter().map(ToString::to_string).collect();
    let rows = records
        .iter()
        .map(|r| {
            vec![
                serde_json::Value::from(r.date.date().format("%Y-%m-%d").to_string()),
                serde_json::Value::from(r.item.clone()),
                serde_json::Value::from(r.pre_offset),
                serde_json::Value::from(r.post_offset),
                serde_json::Value::from(r.size),
                serde_json::Value::from(r.success),
            ]
        })
        .collect();

    Dataset::new(columns, rows).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_write_actions() {
        assert_eq!("append".parse::<WriteAction>().unwrap(), WriteAction::Append);
        assert_eq!("REPLACE".parse::<WriteAction>().unwrap(), WriteAction::Replace);
        assert_eq!(WriteAction::Fail.to_string(), "fail");
        assert!("upsert".parse::<WriteAction>().is_err());
    }

    #[test]
    fn append_verified_only_on_exact_delta() {
        assert!(write_verified(WriteAction::Append, 10, 15, 5));
        assert!(!write_verified(WriteAction::Append, 10, 14, 5));
        assert!(!write_verified(WriteAction::Fail, 10, 5, 5));
        assert!(write_verified(WriteAction::Fail, 0, 5, 5));
    }

    #[test]
    fn replace_is_always_verified() {
        assert!(write_verified(WriteAction::Replace, 100, 3, 3));
        assert!(write_verified(WriteAction::Replace, 0, 0, 7));
    }

    #[test]
    fn monitor_dataset_has_one_row_per_record() {
        let record = MonitorRecord {
            date: DateKey::new(NaiveDate::from_ymd_opt(2019, 12, 1).unwrap()),
            item: "LineScore".to_string(),
            pre_offset: 0,
            post_offset: 14,
            size: 14,
            success: true,
        };
        let ds = monitor_dataset(&[record.clone(), record]);
        assert_eq!(ds.columns(), MONITOR_COLUMNS);
        assert_eq!(ds.len(), 2);
        assert_eq!(
            ds.rows()[0],
            vec![
                json!("2019-12-01"),
                json!("LineScore"),
                json!(0),
                json!(14),
                json!(14),
                json!(true)
            ]
        );
    }
}
