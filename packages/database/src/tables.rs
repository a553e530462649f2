//! Dataset tables: existence checks, row counts, and writes.
//!
//! Table columns are derived from the dataset being written. Each column's
//! SQL type is inferred from its non-null cells: all booleans become
//! `BOOLEAN`, all integers `BIGINT`, any other all-numeric column `DOUBLE`,
//! and everything else (including all-null columns) `VARCHAR`.
//!
//! Appends to an existing table bind every value to the type the table
//! already has, and refuse cells that would be silently cast.

use std::collections::HashMap;

use chrono::NaiveDate;
use duckdb::Connection;
use duckdb::types::Value;
use nba_stats_database_models::WriteAction;
use nba_stats_scoreboard_models::Dataset;

use crate::DbError;

/// Upper bound on bound parameters per multi-row `INSERT`.
const MAX_PARAMS_PER_INSERT: usize = 10_000;

/// SQL type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    BigInt,
    Double,
    Date,
    Varchar,
}

impl ColumnType {
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Boolean => "BOOLEAN",
            Self::BigInt => "BIGINT",
            Self::Double => "DOUBLE",
            Self::Date => "DATE",
            Self::Varchar => "VARCHAR",
        }
    }

    /// Maps a `DuckDB` `data_type` name (as reported by
    /// `information_schema.columns`) onto the types values are bound as.
    #[must_use]
    pub fn from_sql(data_type: &str) -> Self {
        let upper = data_type.to_ascii_uppercase();
        match upper.as_str() {
            "BOOLEAN" => Self::Boolean,
            "TINYINT" | "SMALLINT" | "INTEGER" | "BIGINT" | "HUGEINT" | "UTINYINT"
            | "USMALLINT" | "UINTEGER" | "UBIGINT" => Self::BigInt,
            "FLOAT" | "REAL" | "DOUBLE" => Self::Double,
            "DATE" => Self::Date,
            _ if upper.starts_with("DECIMAL") => Self::Double,
            _ => Self::Varchar,
        }
    }

    /// Infers the type of a column from its cells.
    pub fn infer<'a>(cells: impl Iterator<Item = &'a serde_json::Value>) -> Self {
        let mut inferred: Option<Self> = None;

        for cell in cells {
            let cell_type = match cell {
                serde_json::Value::Null => continue,
                serde_json::Value::Bool(_) => Self::Boolean,
                serde_json::Value::Number(n) if n.is_i64() => Self::BigInt,
                serde_json::Value::Number(_) => Self::Double,
                _ => return Self::Varchar,
            };

            inferred = Some(match (inferred, cell_type) {
                (None, t) => t,
                (Some(a), b) if a == b => a,
                (Some(Self::BigInt | Self::Double), Self::BigInt | Self::Double) => Self::Double,
                _ => return Self::Varchar,
            });
        }

        inferred.unwrap_or(Self::Varchar)
    }

    /// Converts a JSON cell into a `DuckDB` value for a column of this type.
    ///
    /// Returns `None` when the cell cannot be stored without losing
    /// information, e.g. `0.512` into a `BIGINT` column.
    #[must_use]
    pub fn to_value(self, cell: &serde_json::Value) -> Option<Value> {
        match (self, cell) {
            (_, serde_json::Value::Null) => Some(Value::Null),
            (Self::Boolean, serde_json::Value::Bool(b)) => Some(Value::Boolean(*b)),
            (Self::BigInt, serde_json::Value::Number(n)) => n.as_i64().map(Value::BigInt),
            (Self::Double, serde_json::Value::Number(n)) => n.as_f64().map(Value::Double),
            (Self::Date, serde_json::Value::String(s)) => {
                let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
                let days = date.signed_duration_since(NaiveDate::default()).num_days();
                i32::try_from(days).ok().map(Value::Date32)
            }
            (Self::Varchar, serde_json::Value::String(s)) => Some(Value::Text(s.clone())),
            (Self::Varchar, other) => Some(Value::Text(other.to_string())),
            _ => None,
        }
    }
}

/// Quotes an identifier for use in SQL.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Returns whether `table` exists in the current schema.
///
/// # Errors
///
/// Returns [`DbError`] if the catalog query fails.
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, DbError> {
    let mut stmt = conn.prepare(
        "SELECT COUNT(*) FROM information_schema.tables
         WHERE table_schema = current_schema() AND table_name = ?",
    )?;
    let count: i64 = stmt.query_row([table], |row| row.get(0))?;
    Ok(count > 0)
}

/// Returns the number of rows in `table`, or `0` if it does not exist.
///
/// # Errors
///
/// Returns [`DbError`] if either query fails.
pub fn row_count(conn: &Connection, table: &str) -> Result<u64, DbError> {
    if !table_exists(conn, table)? {
        return Ok(0);
    }

    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
        [],
        |row| row.get(0),
    )?;
    Ok(u64::try_from(count).unwrap_or(0))
}

/// Column name → type of an existing table, in the current schema.
///
/// # Errors
///
/// Returns [`DbError`] if the catalog query fails.
pub fn table_columns(conn: &Connection, table: &str) -> Result<HashMap<String, ColumnType>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT column_name, data_type FROM information_schema.columns
         WHERE table_schema = current_schema() AND table_name = ?",
    )?;
    let rows = stmt.query_map([table], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut columns = HashMap::new();
    for row in rows {
        let (name, data_type) = row?;
        columns.insert(name, ColumnType::from_sql(&data_type));
    }
    Ok(columns)
}

/// Writes `dataset` to `table` using `action`.
///
/// - [`WriteAction::Fail`] errors if the table exists, otherwise creates it.
/// - [`WriteAction::Replace`] drops any existing table and recreates it.
/// - [`WriteAction::Append`] creates the table if absent and adds rows.
///
/// Rows are inserted by column name, so appending to a table with extra
/// columns leaves those `NULL`. When appending to an existing table, values
/// are bound with the table's column types. Returns the number of rows
/// inserted.
///
/// Not transactional by itself; callers that need the write to be atomic
/// run it inside a transaction.
///
/// # Errors
///
/// Returns [`DbError::TableExists`] for a `fail` write to an existing
/// table, [`DbError::NoColumns`] if a table must be created from a dataset
/// without columns, [`DbError::UnknownColumn`] or
/// [`DbError::IncompatibleValue`] if the dataset does not fit an existing
/// table, or [`DbError::DuckDb`] if any statement fails.
pub fn write_dataset(
    conn: &Connection,
    table: &str,
    dataset: &Dataset,
    action: WriteAction,
) -> Result<u64, DbError> {
    let exists = table_exists(conn, table)?;

    let types = match action {
        WriteAction::Fail if exists => {
            return Err(DbError::TableExists {
                table: table.to_string(),
            });
        }
        WriteAction::Append if exists => existing_types(conn, table, dataset)?,
        WriteAction::Replace => {
            conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))?;
            create_table(conn, table, dataset)?
        }
        WriteAction::Fail | WriteAction::Append => create_table(conn, table, dataset)?,
    };

    let inserted = insert_rows(conn, table, dataset, &types)?;
    log::debug!("{table}: {action} wrote {inserted} row(s)");

    Ok(inserted)
}

fn inferred_types(dataset: &Dataset) -> Vec<ColumnType> {
    (0..dataset.columns().len())
        .map(|i| ColumnType::infer(dataset.rows().iter().map(|row| &row[i])))
        .collect()
}

fn existing_types(
    conn: &Connection,
    table: &str,
    dataset: &Dataset,
) -> Result<Vec<ColumnType>, DbError> {
    let columns = table_columns(conn, table)?;

    dataset
        .columns()
        .iter()
        .map(|name| {
            columns
                .get(name)
                .copied()
                .ok_or_else(|| DbError::UnknownColumn {
                    table: table.to_string(),
                    column: name.clone(),
                })
        })
        .collect()
}

/// Creates `table` from the dataset's columns and inferred types.
fn create_table(
    conn: &Connection,
    table: &str,
    dataset: &Dataset,
) -> Result<Vec<ColumnType>, DbError> {
    if dataset.columns().is_empty() {
        return Err(DbError::NoColumns {
            table: table.to_string(),
        });
    }

    let types = inferred_types(dataset);
    let columns = dataset
        .columns()
        .iter()
        .zip(&types)
        .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.sql()))
        .collect::<Vec<_>>()
        .join(", ");

    conn.execute_batch(&format!("CREATE TABLE {} ({columns})", quote_ident(table)))?;

    Ok(types)
}

fn insert_rows(
    conn: &Connection,
    table: &str,
    dataset: &Dataset,
    types: &[ColumnType],
) -> Result<u64, DbError> {
    let width = dataset.columns().len();
    if dataset.is_empty() || width == 0 {
        return Ok(0);
    }

    let column_list = dataset
        .columns()
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let row_placeholders = format!("({})", vec!["?"; width].join(", "));
    let chunk_rows = (MAX_PARAMS_PER_INSERT / width).max(1);

    let mut total_inserted = 0u64;

    for chunk in dataset.rows().chunks(chunk_rows) {
        let sql = format!(
            "INSERT INTO {} ({column_list}) VALUES {}",
            quote_ident(table),
            vec![row_placeholders.as_str(); chunk.len()].join(", "),
        );

        let mut stmt = conn.prepare(&sql)?;
        let mut param_idx = 1usize;

        for row in chunk {
            for ((cell, ty), column) in row.iter().zip(types).zip(dataset.columns()) {
                let value = ty.to_value(cell).ok_or_else(|| DbError::IncompatibleValue {
                    table: table.to_string(),
                    column: column.clone(),
                    column_type: ty.sql(),
                    value: cell.to_string(),
                })?;
                stmt.raw_bind_parameter(param_idx, value)?;
                param_idx += 1;
            }
        }

        let rows = stmt.raw_execute()?;
        total_inserted += u64::try_from(rows).unwrap_or(0);
    }

    Ok(total_inserted)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn conn() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    fn line_score(rows: usize) -> Dataset {
        Dataset::new(
            vec![
                "GAME_SEQUENCE".to_string(),
                "TEAM_ABBREVIATION".to_string(),
                "PTS".to_string(),
                "FG_PCT".to_string(),
            ],
            (0..rows)
                .map(|i| vec![json!(i / 2 + 1), json!(format!("T{i}")), json!(100 + i), json!(0.5)])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn infers_column_types() {
        assert_eq!(ColumnType::infer([json!(1), json!(null), json!(2)].iter()), ColumnType::BigInt);
        assert_eq!(ColumnType::infer([json!(1), json!(0.5)].iter()), ColumnType::Double);
        assert_eq!(ColumnType::infer([json!(true), json!(false)].iter()), ColumnType::Boolean);
        assert_eq!(ColumnType::infer([json!(1), json!("a")].iter()), ColumnType::Varchar);
        assert_eq!(ColumnType::infer([json!(true), json!(1)].iter()), ColumnType::Varchar);
        assert_eq!(ColumnType::infer([json!(null)].iter()), ColumnType::Varchar);
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("line_score"), "\"line_score\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn missing_table_counts_zero() {
        let conn = conn();
        assert!(!table_exists(&conn, "line_score").unwrap());
        assert_eq!(row_count(&conn, "line_score").unwrap(), 0);
    }

    #[test]
    fn append_creates_then_grows() {
        let conn = conn();
        assert_eq!(
            write_dataset(&conn, "line_score", &line_score(4), WriteAction::Append).unwrap(),
            4
        );
        assert_eq!(
            write_dataset(&conn, "line_score", &line_score(6), WriteAction::Append).unwrap(),
            6
        );
        assert_eq!(row_count(&conn, "line_score").unwrap(), 10);
    }

    #[test]
    fn replace_resets_contents() {
        let conn = conn();
        write_dataset(&conn, "line_score", &line_score(8), WriteAction::Append).unwrap();
        write_dataset(&conn, "line_score", &line_score(2), WriteAction::Replace).unwrap();
        assert_eq!(row_count(&conn, "line_score").unwrap(), 2);
    }

    #[test]
    fn fail_refuses_existing_table() {
        let conn = conn();
        write_dataset(&conn, "line_score", &line_score(2), WriteAction::Fail).unwrap();
        let err = write_dataset(&conn, "line_score", &line_score(2), WriteAction::Fail).unwrap_err();
        assert!(matches!(err, DbError::TableExists { .. }));
        assert_eq!(row_count(&conn, "line_score").unwrap(), 2);
    }

    #[test]
    fn append_with_incompatible_schema_fails() {
        let conn = conn();
        conn.execute_batch("CREATE TABLE line_score (other_column INTEGER)")
            .unwrap();
        assert!(matches!(
            write_dataset(&conn, "line_score", &line_score(2), WriteAction::Append),
            Err(DbError::UnknownColumn { .. })
        ));
    }

    fn fg_pct(cells: &[serde_json::Value]) -> Dataset {
        Dataset::new(
            vec!["FG_PCT".to_string()],
            cells.iter().map(|c| vec![c.clone()]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn append_refuses_fraction_in_integer_column() {
        let conn = conn();
        write_dataset(&conn, "t", &fg_pct(&[json!(1), json!(0)]), WriteAction::Append).unwrap();

        let err = write_dataset(&conn, "t", &fg_pct(&[json!(0.512)]), WriteAction::Append)
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::IncompatibleValue { ref column, column_type: "BIGINT", .. } if column == "FG_PCT"
        ));
        assert_eq!(row_count(&conn, "t").unwrap(), 2);
    }

    #[test]
    fn append_widens_integers_into_double_column() {
        let conn = conn();
        write_dataset(&conn, "t", &fg_pct(&[json!(0.512)]), WriteAction::Append).unwrap();
        write_dataset(&conn, "t", &fg_pct(&[json!(1)]), WriteAction::Append).unwrap();

        let max: f64 = conn
            .query_row("SELECT MAX(FG_PCT) FROM t", [], |row| row.get(0))
            .unwrap();
        assert!((max - 1.0).abs() < f64::EPSILON);
        assert_eq!(table_columns(&conn, "t").unwrap()["FG_PCT"], ColumnType::Double);
    }

    #[test]
    fn append_binds_dates_into_date_column() {
        let conn = conn();
        conn.execute_batch("CREATE TABLE t (day DATE)").unwrap();
        let ds = Dataset::new(vec!["day".to_string()], vec![vec![json!("2019-12-01")]]).unwrap();
        write_dataset(&conn, "t", &ds, WriteAction::Append).unwrap();

        let day: String = conn
            .query_row("SELECT CAST(day AS VARCHAR) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(day, "2019-12-01");

        let bad = Dataset::new(vec!["day".to_string()], vec![vec![json!("yesterday")]]).unwrap();
        assert!(matches!(
            write_dataset(&conn, "t", &bad, WriteAction::Append),
            Err(DbError::IncompatibleValue { .. })
        ));
    }

    #[test]
    fn maps_catalog_type_names() {
        assert_eq!(ColumnType::from_sql("INTEGER"), ColumnType::BigInt);
        assert_eq!(ColumnType::from_sql("DECIMAL(18,3)"), ColumnType::Double);
        assert_eq!(ColumnType::from_sql("date"), ColumnType::Date);
        assert_eq!(ColumnType::from_sql("TIMESTAMP"), ColumnType::Varchar);
    }

    #[test]
    fn large_datasets_are_chunked() {
        let conn = conn();
        let rows = MAX_PARAMS_PER_INSERT / 4 * 2 + 3;
        write_dataset(&conn, "line_score", &line_score(rows), WriteAction::Append).unwrap();
        assert_eq!(row_count(&conn, "line_score").unwrap(), rows as u64);
    }

    #[test]
    fn values_round_trip_with_inferred_types() {
        let conn = conn();
        let ds = Dataset::new(
            vec!["id".to_string(), "name".to_string(), "pct".to_string(), "live".to_string()],
            vec![vec![json!(7), json!("BOS"), json!(0.512), json!(true)]],
        )
        .unwrap();
        write_dataset(&conn, "t", &ds, WriteAction::Append).unwrap();

        let (id, name, pct, live): (i64, String, f64, bool) = conn
            .query_row("SELECT id, name, pct, live FROM t", [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .unwrap();
        assert_eq!(id, 7);
        assert_eq!(name, "BOS");
        assert!((pct - 0.512).abs() < 1e-9);
        assert!(live);
    }

    #[test]
    fn empty_dataset_without_columns_cannot_create_table() {
        let conn = conn();
        let err = write_dataset(&conn, "t", &Dataset::empty(), WriteAction::Append).unwrap_err();
        assert!(matches!(err, DbError::NoColumns { .. }));
    }
}
