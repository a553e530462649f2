//! Batch upload of scoreboard data with row-count verification.
//!
//! Every (date, item) pair with a mapping and a non-empty dataset is written
//! to its table inside its own transaction: count rows, write, count again.
//! The counts and the outcome land in a [`MonitorRecord`]. A failed item is
//! rolled back and recorded with `success = false`; the batch carries on.

use std::collections::HashMap;

use duckdb::Connection;
use nba_stats_database::DbError;
use nba_stats_database::tables::{row_count, write_dataset};
use nba_stats_database_models::{ItemMapping, MonitorRecord, write_verified};
use nba_stats_scoreboard_models::{Dataset, DateKey, ScoreboardData};

/// Indexes `batch` by item name. A later mapping for the same item wins.
#[must_use]
pub fn item_lookup(batch: &[ItemMapping]) -> HashMap<&str, &ItemMapping> {
    batch.iter().map(|m| (m.item.as_str(), m)).collect()
}

/// Uploads every mapped, non-empty item of every date in `data`.
///
/// Returns one record per attempted upload, ordered by date then item name.
/// Unmapped and empty items are skipped without a record.
pub fn batch_upload(
    data: &ScoreboardData,
    conn: &mut Connection,
    batch: &[ItemMapping],
) -> Vec<MonitorRecord> {
    let lookup = item_lookup(batch);
    let mut records = Vec::new();

    for (date, datasets) in data {
        log::info!("Uploading data for date: {date}");

        for (item, dataset) in datasets {
            let Some(mapping) = lookup.get(item.as_str()).copied() else {
                log::debug!("{date}: {item} is not in the batch, skipping");
                continue;
            };
            if dataset.is_empty() {
                log::info!("{date}: no {item} data to upload");
                continue;
            }

            records.push(upload_item(conn, *date, mapping, dataset));
        }
    }

    records
}

fn upload_item(
    conn: &mut Connection,
    date: DateKey,
    mapping: &ItemMapping,
    dataset: &Dataset,
) -> MonitorRecord {
    let mut record = MonitorRecord {
        date,
        item: mapping.item.clone(),
        pre_offset: 0,
        post_offset: 0,
        size: dataset.len() as u64,
        success: false,
    };

    match write_counted(conn, mapping, dataset, &mut record) {
        Ok(()) => {
            record.success = write_verified(
                mapping.action,
                record.pre_offset,
                record.post_offset,
                record.size,
            );
            if record.success {
                log::info!(
                    "{date}: {} -> {} ({}) ok, {} row(s)",
                    mapping.item,
                    mapping.table,
                    mapping.action,
                    record.size
                );
            } else {
                log::warn!(
                    "{date}: {} -> {} offset mismatch: pre {} post {} size {}",
                    mapping.item,
                    mapping.table,
                    record.pre_offset,
                    record.post_offset,
                    record.size
                );
            }
        }
        Err(e) => {
            log::error!(
                "{date}: failed to upload {} to {}: {e}",
                mapping.item,
                mapping.table
            );
        }
    }

    record
}

/// Read-write-read for one item in a single transaction. Offsets are stored
/// into `record` as soon as they are read.
fn write_counted(
    conn: &mut Connection,
    mapping: &ItemMapping,
    dataset: &Dataset,
    record: &mut MonitorRecord,
) -> Result<(), DbError> {
    let tx = conn.transaction()?;

    record.pre_offset = row_count(&tx, &mapping.table)?;
    let written = write_dataset(&tx, &mapping.table, dataset, mapping.action)?;
    if written != record.size {
        log::warn!(
            "{}: wrote {written} of {} row(s) to {}",
            record.date,
            record.size,
            mapping.table
        );
    }
    record.post_offset = row_count(&tx, &mapping.table)?;

    tx.commit()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use nba_stats_database_models::WriteAction;
    use nba_stats_scoreboard_models::{NamedDataset, items};
    use serde_json::json;

    use super::*;

    fn date(day: u32) -> DateKey {
        DateKey::new(NaiveDate::from_ymd_opt(2019, 12, day).unwrap())
    }

    fn dataset(rows: usize) -> Dataset {
        Dataset::new(
            vec!["GAME_SEQUENCE".to_string(), "PTS".to_string()],
            (0..rows).map(|i| vec![json!(i / 2 + 1), json!(100 + i)]).collect(),
        )
        .unwrap()
    }

    fn one_day(day: u32, sets: &[(&str, Dataset)]) -> ScoreboardData {
        let named: NamedDataset = sets
            .iter()
            .map(|(name, ds)| ((*name).to_string(), ds.clone()))
            .collect();
        let mut data = ScoreboardData::new();
        data.insert(date(day), named);
        data
    }

    fn conn() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn looks_up_items() {
        let batch = [
            ItemMapping::new(items::GAME_HEADER, "game_header", WriteAction::Append),
            ItemMapping::new(items::LINE_SCORE, "line_score", WriteAction::Replace),
        ];
        let lookup = item_lookup(&batch);
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup[items::LINE_SCORE].table, "line_score");
        assert_eq!(lookup[items::GAME_HEADER].action, WriteAction::Append);
        assert!(!lookup.contains_key(items::TEAM_LEADERS));
    }

    #[test]
    fn append_twice_grows_offsets() {
        let mut conn = conn();
        let batch = [ItemMapping::new(
            items::LINE_SCORE,
            "line_score",
            WriteAction::Append,
        )];
        let data = one_day(1, &[(items::LINE_SCORE, dataset(14))]);

        let first = batch_upload(&data, &mut conn, &batch);
        let second = batch_upload(&data, &mut conn, &batch);

        assert_eq!(first.len(), 1);
        assert_eq!(
            (first[0].pre_offset, first[0].post_offset, first[0].size, first[0].success),
            (0, 14, 14, true)
        );
        assert_eq!(
            (second[0].pre_offset, second[0].post_offset, second[0].size, second[0].success),
            (14, 28, 14, true)
        );
    }

    #[test]
    fn append_to_populated_table() {
        let mut conn = conn();
        let batch = [ItemMapping::new(items::GAME_HEADER, "game_header", WriteAction::Append)];
        write_dataset(&conn, "game_header", &dataset(9), WriteAction::Append).unwrap();

        let records = batch_upload(
            &one_day(1, &[(items::GAME_HEADER, dataset(4))]),
            &mut conn,
            &batch,
        );
        assert_eq!((records[0].pre_offset, records[0].post_offset), (9, 13));
        assert!(records[0].success);
    }

    #[test]
    fn replace_always_succeeds() {
        let mut conn = conn();
        let batch = [ItemMapping::new(items::TEAM_LEADERS, "team_leaders", WriteAction::Replace)];
        write_dataset(&conn, "team_leaders", &dataset(20), WriteAction::Append).unwrap();

        let records = batch_upload(
            &one_day(1, &[(items::TEAM_LEADERS, dataset(6))]),
            &mut conn,
            &batch,
        );
        assert_eq!((records[0].pre_offset, records[0].post_offset), (20, 6));
        assert!(records[0].success);
    }

    #[test]
    fn fractional_value_in_integer_column_is_a_failure() {
        let mut conn = conn();
        let batch = [ItemMapping::new(items::LINE_SCORE, "line_score", WriteAction::Append)];
        let pct = |cells: Vec<serde_json::Value>| {
            Dataset::new(
                vec!["FG_PCT".to_string()],
                cells.into_iter().map(|c| vec![c]).collect(),
            )
            .unwrap()
        };

        let mut data = one_day(1, &[(items::LINE_SCORE, pct(vec![json!(1), json!(0)]))]);
        data.extend(one_day(2, &[(items::LINE_SCORE, pct(vec![json!(0.512)]))]));
        let records = batch_upload(&data, &mut conn, &batch);

        assert!(records[0].success);
        assert!(!records[1].success);
        assert_eq!((records[1].pre_offset, records[1].post_offset), (2, 0));
        assert_eq!(row_count(&conn, "line_score").unwrap(), 2);
    }

    #[test]
    fn failing_item_does_not_stop_the_rest() {
        let mut conn = conn();
        let batch = [
            ItemMapping::new(items::GAME_HEADER, "game_header", WriteAction::Fail),
            ItemMapping::new(items::LINE_SCORE, "line_score", WriteAction::Append),
            ItemMapping::new(items::TEAM_LEADERS, "team_leaders", WriteAction::Append),
        ];
        write_dataset(&conn, "game_header", &dataset(3), WriteAction::Append).unwrap();

        let data = one_day(
            1,
            &[
                (items::GAME_HEADER, dataset(2)),
                (items::LINE_SCORE, dataset(4)),
                (items::TEAM_LEADERS, dataset(2)),
            ],
        );
        let records = batch_upload(&data, &mut conn, &batch);

        assert_eq!(records.len(), 3);
        let header = records.iter().find(|r| r.item == items::GAME_HEADER).unwrap();
        assert!(!header.success);
        assert_eq!((header.pre_offset, header.post_offset, header.size), (3, 0, 2));
        assert!(
            records
                .iter()
                .filter(|r| r.item != items::GAME_HEADER)
                .all(|r| r.success)
        );
        assert_eq!(row_count(&conn, "game_header").unwrap(), 3);
    }

    #[test]
    fn schema_mismatch_is_recorded_and_rolled_back() {
        let mut conn = conn();
        conn.execute_batch("CREATE TABLE line_score (other INTEGER)").unwrap();
        let batch = [ItemMapping::new(items::LINE_SCORE, "line_score", WriteAction::Append)];

        let records = batch_upload(
            &one_day(1, &[(items::LINE_SCORE, dataset(4))]),
            &mut conn,
            &batch,
        );
        assert!(!records[0].success);
        assert_eq!(records[0].pre_offset, 0);
        assert_eq!(row_count(&conn, "line_score").unwrap(), 0);
    }

    #[test]
    fn skips_unmapped_and_empty_items() {
        let mut conn = conn();
        let batch = [
            ItemMapping::new(items::LINE_SCORE, "line_score", WriteAction::Append),
            ItemMapping::new(items::MERGED_LINE_SCORE, "merged", WriteAction::Append),
        ];
        let data = one_day(
            1,
            &[
                (items::LINE_SCORE, dataset(2)),
                (items::MERGED_LINE_SCORE, Dataset::empty()),
                (items::TICKET_LINKS, dataset(1)),
            ],
        );

        let records = batch_upload(&data, &mut conn, &batch);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].item, items::LINE_SCORE);
        assert!(!nba_stats_database::tables::table_exists(&conn, "merged").unwrap());
    }

    #[test]
    fn records_are_ordered_by_date_then_item() {
        let mut conn = conn();
        let batch = [
            ItemMapping::new(items::LINE_SCORE, "line_score", WriteAction::Append),
            ItemMapping::new(items::GAME_HEADER, "game_header", WriteAction::Append),
        ];
        let mut data = one_day(2, &[(items::LINE_SCORE, dataset(2)), (items::GAME_HEADER, dataset(1))]);
        data.extend(one_day(1, &[(items::LINE_SCORE, dataset(2)), (items::GAME_HEADER, dataset(1))]));

        let keys: Vec<_> = batch_upload(&data, &mut conn, &batch)
            .into_iter()
            .map(|r| (r.date, r.item))
            .collect();
        assert_eq!(
            keys,
            vec![
                (date(1), items::GAME_HEADER.to_string()),
                (date(1), items::LINE_SCORE.to_string()),
                (date(2), items::GAME_HEADER.to_string()),
                (date(2), items::LINE_SCORE.to_string()),
            ]
        );
    }
}
