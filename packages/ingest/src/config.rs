//! Run configuration.
//!
//! Two layers:
//!
//! - [`AppConfig`] holds connection strings and pacing. Defaults are
//!   overridden by environment variables prefixed with the app name
//!   (`NBA_DB_URL`, `NBA_MONITOR_DB_URL`, `NBA_TIMEOUT_INTERVAL`,
//!   `NBA_TIMEOUT_SECS`, `NBA_BATCH`).
//! - [`MappingConfig`] holds the item → table mapping, the named batches,
//!   and the monitor table. It is parsed from `config/mapping.toml`, which
//!   is embedded at compile time via [`include_str!`].

use std::collections::BTreeMap;
use std::time::Duration;

use nba_stats_database_models::{ItemMapping, WriteAction};
use nba_stats_scoreboard::fetch::Pacing;
use serde::Deserialize;

/// Item mapping, batches, and monitor target baked into the binary.
const MAPPING_TOML: &str = include_str!("../config/mapping.toml");

pub const DEFAULT_APP_NAME: &str = "NBA";
pub const DEFAULT_DB_URL: &str = "duckdb://data/nba.duckdb";
pub const DEFAULT_MONITOR_DB_URL: &str = "duckdb://data/nba_monitor.duckdb";
pub const DEFAULT_TIMEOUT_INTERVAL_DAYS: u32 = 30;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_BATCH: &str = "default";

/// Errors raised while building configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment override could not be parsed.
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// The requested batch is not defined.
    #[error("Unknown batch {name:?} (available: {available})")]
    UnknownBatch { name: String, available: String },

    /// A batch lists an item that has no table mapping.
    #[error("Batch {batch:?} references unmapped item {item:?}")]
    UnmappedItem { batch: String, item: String },

    /// The mapping TOML is malformed.
    #[error("Invalid mapping config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Connection strings, pacing, and the default batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Prefix of the environment variables that configure the app.
    pub app_name: String,
    /// Data store connection string.
    pub db_url: String,
    /// Monitoring store connection string.
    pub monitor_db_url: String,
    /// Days requested between fetch pauses.
    pub timeout_interval_days: u32,
    /// Length of each fetch pause, in seconds.
    pub timeout_secs: u64,
    /// Batch uploaded when none is given on the command line.
    pub batch: String,
    /// Prefixed variables with no dedicated field.
    pub extra: BTreeMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            db_url: DEFAULT_DB_URL.to_string(),
            monitor_db_url: DEFAULT_MONITOR_DB_URL.to_string(),
            timeout_interval_days: DEFAULT_TIMEOUT_INTERVAL_DAYS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            batch: DEFAULT_BATCH.to_string(),
            extra: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Builds the config from the process environment.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Builds the config from `vars`, applying every variable whose name
    /// starts with [`DEFAULT_APP_NAME`] on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a numeric override does not
    /// parse.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut config = Self::default();
        let prefix = format!("{}_", config.app_name);

        log::debug!("Filtering for env vars starting with: {prefix:?}");

        for (key, value) in vars {
            let key = key.into();
            let Some(name) = key.strip_prefix(&prefix) else {
                continue;
            };
            let value = value.into();

            match name {
                "DB_URL" => config.db_url = value,
                "MONITOR_DB_URL" => config.monitor_db_url = value,
                "TIMEOUT_INTERVAL" => config.timeout_interval_days = parse_number(&key, &value)?,
                "TIMEOUT_SECS" => config.timeout_secs = parse_number(&key, &value)?,
                "BATCH" => config.batch = value,
                // Start/end dates are read from the command line.
                "STARTDATE" | "ENDDATE" => {}
                _ => {
                    log::debug!("Keeping unrecognized config variable {key}");
                    config.extra.insert(key, value);
                }
            }
        }

        Ok(config)
    }

    /// Fetch pacing derived from the timeout settings.
    #[must_use]
    pub const fn pacing(&self) -> Pacing {
        Pacing {
            batch_size_days: self.timeout_interval_days,
            pause: Duration::from_secs(self.timeout_secs),
        }
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Destination table and write mode.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableTarget {
    pub table: String,
    pub action: WriteAction,
}

/// Item mappings, named batches, and the monitor table.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingConfig {
    pub monitor: TableTarget,
    items: BTreeMap<String, TableTarget>,
    batches: BTreeMap<String, Vec<String>>,
}

impl MappingConfig {
    /// Parses the mapping compiled into the binary.
    ///
    /// # Errors
    ///
    /// See [`MappingConfig::parse`].
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::parse(MAPPING_TOML)
    }

    /// Parses and validates a mapping document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the document is malformed, or
    /// [`ConfigError::UnmappedItem`] if a batch names an item missing from
    /// `[items]`.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(toml_str)?;

        for (batch, items) in &config.batches {
            if let Some(item) = items.iter().find(|i| !config.items.contains_key(*i)) {
                return Err(ConfigError::UnmappedItem {
                    batch: batch.clone(),
                    item: item.clone(),
                });
            }
        }

        Ok(config)
    }

    /// Item mappings of the batch called `name`, in batch order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownBatch`] if no such batch exists.
    pub fn batch(&self, name: &str) -> Result<Vec<ItemMapping>, ConfigError> {
        let items = self
            .batches
            .get(name)
            .ok_or_else(|| ConfigError::UnknownBatch {
                name: name.to_string(),
                available: self.batch_names().collect::<Vec<_>>().join(", "),
            })?;

        Ok(items
            .iter()
            .filter_map(|item| self.item(item))
            .collect())
    }

    /// Mapping for a single item.
    #[must_use]
    pub fn item(&self, item: &str) -> Option<ItemMapping> {
        self.items
            .get(item)
            .map(|t| ItemMapping::new(item, t.table.clone(), t.action))
    }

    /// All item mappings, ordered by item name.
    #[must_use]
    pub fn items(&self) -> Vec<ItemMapping> {
        self.items
            .iter()
            .map(|(item, t)| ItemMapping::new(item.clone(), t.table.clone(), t.action))
            .collect()
    }

    pub fn batch_names(&self) -> impl Iterator<Item = &str> {
        self.batches.keys().map(String::as_str)
    }

    /// Batches with the items they select.
    pub fn batches(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.batches
            .iter()
            .map(|(name, items)| (name.as_str(), items.as_slice()))
    }
}
