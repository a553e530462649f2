//! Upload monitor persistence.
//!
//! The monitor table has a fixed schema rather than one inferred from the
//! first batch of records:
//!
//! | column | type |
//! | --- | --- |
//! | `id` | `BIGINT` primary key, from `<table>_id_seq` |
//! | `date` | `DATE` |
//! | `item` | `VARCHAR` |
//! | `pre_offset`, `post_offset`, `size` | `BIGINT` |
//! | `success` | `BOOLEAN` |

use duckdb::Connection;
use nba_stats_database_models::{MonitorRecord, WriteAction, monitor_dataset};

use crate::DbError;
use crate::tables::{quote_ident, table_exists, write_dataset};

fn sequence_name(table: &str) -> String {
    format!("{table}_id_seq")
}

/// Prepares `table` for a monitor write according to `action`.
///
/// # Errors
///
/// Returns [`DbError::TableExists`] for a `fail` write to an existing
/// table, or [`DbError::DuckDb`] if the DDL fails.
pub fn create_monitor_table(
    conn: &Connection,
    table: &str,
    action: WriteAction,
) -> Result<(), DbError> {
    let exists = table_exists(conn, table)?;
    let sequence = quote_ident(&sequence_name(table));

    match action {
        WriteAction::Fail if exists => {
            return Err(DbError::TableExists {
                table: table.to_string(),
            });
        }
        WriteAction::Append if exists => return Ok(()),
        WriteAction::Replace => {
            conn.execute_batch(&format!(
                "DROP TABLE IF EXISTS {}; DROP SEQUENCE IF EXISTS {sequence};",
                quote_ident(table)
            ))?;
        }
        WriteAction::Fail | WriteAction::Append => {}
    }

    conn.execute_batch(&format!(
        r#"CREATE SEQUENCE IF NOT EXISTS {sequence};
         CREATE TABLE {} (
             "id" BIGINT PRIMARY KEY DEFAULT nextval('{}'),
             "date" DATE NOT NULL,
             "item" VARCHAR NOT NULL,
             "pre_offset" BIGINT NOT NULL,
             "post_offset" BIGINT NOT NULL,
             "size" BIGINT NOT NULL,
             "success" BOOLEAN NOT NULL
         );"#,
        quote_ident(table),
        sequence_name(table).replace('\'', "''"),
    ))?;

    Ok(())
}

/// Writes monitor records to `table` in a single transaction.
///
/// An empty record list is a no-op. Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError`] if the write fails; nothing is persisted in that
/// case.
pub fn persist_monitor_records(
    conn: &mut Connection,
    table: &str,
    action: WriteAction,
    records: &[MonitorRecord],
) -> Result<u64, DbError> {
    if records.is_empty() {
        log::info!("No monitor records to persist");
        return Ok(0);
    }

    let tx = conn.transaction()?;
    create_monitor_table(&tx, table, action)?;
    let written = write_dataset(&tx, table, &monitor_dataset(records), WriteAction::Append)?;
    tx.commit()?;

    log::info!("Persisted {written} monitor record(s) to {table}");

    Ok(written)
}
