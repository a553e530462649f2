#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! `DuckDB` storage for scoreboard datasets and upload monitor records.
//!
//! The store is used as a black box with four operations: create a table
//! if absent, append rows, replace a table's contents, and count rows.
//! Tables are created from the dataset's own columns; there is no schema
//! migration.

pub mod db;
pub mod monitor;
pub mod tables;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` query or connection error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// I/O error (creating the database directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A `fail` write targeted a table that already exists.
    #[error("Table {table} already exists")]
    TableExists {
        /// Destination table.
        table: String,
    },

    /// An append names a column the existing table does not have.
    #[error("Table {table} has no column {column}")]
    UnknownColumn {
        /// Destination table.
        table: String,
        /// Dataset column.
        column: String,
    },

    /// A cell cannot be stored in its column without being altered.
    #[error("Cannot store {value} in {column_type} column {table}.{column}")]
    IncompatibleValue {
        /// Destination table.
        table: String,
        /// Destination column.
        column: String,
        /// SQL type of the column.
        column_type: &'static str,
        /// Offending cell, as JSON.
        value: String,
    },

    /// A table cannot be created from a dataset without columns.
    #[error("Cannot create table {table} from a dataset with no columns")]
    NoColumns {
        /// Destination table.
        table: String,
    },
}
