//! Service configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tally_core::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use tally_db::DbConfig;

/// Default log filter when neither `RUST_LOG` nor `TALLY_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "info,tally=debug,sqlx=warn";

/// Tally POS configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// How long to wait for a pooled connection
    pub connect_timeout: Duration,

    /// Default GetTransactions page size
    pub page_size: i64,

    /// Larger requested pages are clamped to this
    pub max_page_size: i64,

    /// Fallback tracing filter
    pub log_filter: String,
}

impl Default for PosConfig {
    fn default() -> Self {
        PosConfig {
            database_path: PathBuf::from("./tally.db"),
            max_connections: 5,
            connect_timeout: Duration::from_secs(30),
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl PosConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                        | Default                      |
    /// |---------------------------------|------------------------------|
    /// | `TALLY_DB_PATH`                 | `./tally.db`                 |
    /// | `TALLY_DB_MAX_CONNECTIONS`      | `5`                          |
    /// | `TALLY_DB_CONNECT_TIMEOUT_SECS` | `30`                         |
    /// | `TALLY_PAGE_SIZE`               | `20`                         |
    /// | `TALLY_MAX_PAGE_SIZE`           | `100`                        |
    /// | `TALLY_LOG`                     | `info,tally=debug,sqlx=warn` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = PosConfig::default();

        let config = PosConfig {
            database_path: lookup("TALLY_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            max_connections: parse_or(&lookup, "TALLY_DB_MAX_CONNECTIONS", defaults.max_connections)?,

            connect_timeout: Duration::from_secs(parse_or(
                &lookup,
                "TALLY_DB_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout.as_secs(),
            )?),

            page_size: parse_or(&lookup, "TALLY_PAGE_SIZE", defaults.page_size)?,

            max_page_size: parse_or(&lookup, "TALLY_MAX_PAGE_SIZE", defaults.max_page_size)?,

            log_filter: lookup("TALLY_LOG").unwrap_or(defaults.log_filter),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("TALLY_DB_MAX_CONNECTIONS".to_string()));
        }
        if self.page_size <= 0 {
            return Err(ConfigError::InvalidValue("TALLY_PAGE_SIZE".to_string()));
        }
        if self.max_page_size < self.page_size {
            return Err(ConfigError::InvalidValue("TALLY_MAX_PAGE_SIZE".to_string()));
        }
        Ok(())
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
            .max_connections(self.max_connections)
            .connect_timeout(self.connect_timeout)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
