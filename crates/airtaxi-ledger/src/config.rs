//! Configuration management for the air taxi ledger.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use chrono::format::{Item, StrftimeItems};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::DEFAULT_PAGE_SIZE;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "airtaxi-ledger";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "ledger.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `AIRTAXI_`, sections split on `__`)
/// 2. TOML config file at `~/.config/airtaxi-ledger/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Ledger rule configuration.
    pub ledger: LedgerConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/airtaxi-ledger/ledger.db`
    pub database_path: Option<PathBuf>,
    /// Rows fetched per page by range scans and history replays.
    pub scan_page_size: usize,
}

/// Whether lifecycle operations must follow the state machine order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Only existence is checked before a mutation.
    #[default]
    Permissive,
    /// Out-of-order lifecycle operations are rejected.
    Strict,
}

/// Ledger rule configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// First key (inclusive) covered by `queryAllAirTaxi`.
    pub scan_start_key: String,
    /// Key (exclusive) where `queryAllAirTaxi` stops. Empty means no bound.
    pub scan_end_key: String,
    /// Authority stamped on every registration.
    pub approval_authority: String,
    /// chrono format used for registration and deregistration dates. The date
    /// is always the UTC calendar day.
    pub date_format: String,
    /// Air taxi handed out by `requestTaxi`.
    pub allocated_taxi_id: String,
    /// Regex new air taxi ids must match. Unset accepts any id.
    pub id_pattern: Option<String>,
    /// Lifecycle ordering rules.
    pub transition_policy: TransitionPolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            scan_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            scan_start_key: "AT0001".to_string(),
            scan_end_key: "AT9999".to_string(),
            approval_authority: "CAAS".to_string(),
            date_format: "%d/%m/%Y".to_string(),
            allocated_taxi_id: "AT0001".to_string(),
            id_pattern: None,
            transition_policy: TransitionPolicy::Permissive,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("AIRTAXI_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.storage.scan_page_size == 0 {
            return Err(Error::ConfigValidation {
                message: "scan_page_size must be greater than 0".to_string(),
            });
        }

        let ledger = &self.ledger;
        if !ledger.scan_end_key.is_empty() && ledger.scan_end_key <= ledger.scan_start_key {
            return Err(Error::ConfigValidation {
                message: format!(
                    "scan_end_key ({}) must sort after scan_start_key ({})",
                    ledger.scan_end_key, ledger.scan_start_key
                ),
            });
        }

        if ledger.approval_authority.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "approval_authority must not be empty".to_string(),
            });
        }

        if ledger.allocated_taxi_id.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "allocated_taxi_id must not be empty".to_string(),
            });
        }

        if ledger.date_format.is_empty()
            || StrftimeItems::new(&ledger.date_format).any(|item| matches!(item, Item::Error))
        {
            return Err(Error::ConfigValidation {
                message: format!("invalid date format: {}", ledger.date_format),
            });
        }

        if let Some(pattern) = &ledger.id_pattern {
            if regex::Regex::new(pattern).is_err() {
                return Err(Error::ConfigValidation {
                    message: format!("invalid id pattern: {pattern}"),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }
}
