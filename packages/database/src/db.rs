//! Database connection utilities.

use std::path::{Component, Path, PathBuf};

use duckdb::Connection;

use crate::DbError;

/// URL scheme accepted in front of a `DuckDB` file path.
const DUCKDB_SCHEME: &str = "duckdb://";

/// Where a connection string points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    /// Private in-memory database, discarded when the connection closes.
    Memory,
    /// Database file on disk.
    File(PathBuf),
}

/// Parses a connection string.
///
/// Accepts `:memory:`, `duckdb://` (in-memory), `duckdb://<path>`, or a bare
/// file path.
#[must_use]
pub fn parse_url(url: &str) -> DbLocation {
    let path = url.strip_prefix(DUCKDB_SCHEME).unwrap_or(url).trim();

    if path.is_empty() || path == ":memory:" {
        DbLocation::Memory
    } else {
        DbLocation::File(PathBuf::from(path))
    }
}

/// Absolute form of `path` with `.` components removed. Existing files are
/// canonicalized so symlinks and `..` resolve too.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Whether two connection strings name the same database file.
///
/// In-memory databases are private to their connection, so they never
/// count as the same database.
#[must_use]
pub fn same_database(a: &str, b: &str) -> bool {
    match (parse_url(a), parse_url(b)) {
        (DbLocation::File(a), DbLocation::File(b)) => normalize(&a) == normalize(&b),
        _ => false,
    }
}

/// Opens (or creates) the database a connection string points at.
///
/// # Errors
///
/// Returns [`DbError`] if the parent directory cannot be created or the
/// connection fails.
pub fn connect(url: &str) -> Result<Connection, DbError> {
    match parse_url(url) {
        DbLocation::Memory => {
            log::debug!("Opening in-memory DuckDB database");
            Ok(Connection::open_in_memory()?)
        }
        DbLocation::File(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                std::fs::create_dir_all(parent)?;
            }
            log::debug!("Opening DuckDB database at {}", path.display());
            Ok(Connection::open(&path)?)
        }
    }
}
