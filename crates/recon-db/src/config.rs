//! # Ledger Configuration
//!
//! Configuration for the database pool and the ledger service.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     RECON_DB_PATH=/var/lib/recon/recon.db                              │
//! │     RECON_TENANT_ID=...                                                │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/recon-ledger/recon.toml (Linux)                          │
//! │     ~/Library/Application Support/com.recon.ledger/recon.toml (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # recon.toml
//! [database]
//! path = "recon.db"
//! max_connections = 5
//! connect_timeout_secs = 30
//! busy_timeout_ms = 5000
//!
//! [ledger]
//! tenant_id = "00000000-0000-0000-0000-000000000001"
//! placeholder_unit_price_cents = 1
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use recon_core::{Money, PricePolicy, DEFAULT_TENANT_ID};

use crate::pool::DbConfig;

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

/// Where the ledger database lives and how the pool behaves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Path to the SQLite file. Created on first connect.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Pool acquire timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// SQLite lock wait (milliseconds) before a write reports a conflict.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "recon", "ledger")
        .map(|dirs| dirs.data_dir().join("recon.db"))
        .unwrap_or_else(|| PathBuf::from("recon.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_busy_timeout() -> u64 {
    5000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

// =============================================================================
// Ledger Settings
// =============================================================================

/// Ledger behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Tenant used when the caller does not supply one (seed binary,
    /// single-company installs).
    #[serde(default = "default_tenant_id")]
    pub tenant_id: String,

    /// Price used on a movement when no positive price is known.
    #[serde(default = "default_placeholder_price")]
    pub placeholder_unit_price_cents: i64,
}

fn default_tenant_id() -> String {
    DEFAULT_TENANT_ID.to_string()
}

fn default_placeholder_price() -> i64 {
    1
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            tenant_id: default_tenant_id(),
            placeholder_unit_price_cents: default_placeholder_price(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete ledger configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub ledger: LedgerSettings,
}

impl ReconConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (recon.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document. Missing sections fall back to defaults.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Serializes the configuration as TOML.
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.ledger.tenant_id.trim().is_empty() {
            return Err(ConfigError::Invalid("ledger.tenant_id must not be empty".into()));
        }

        self.price_policy()?;

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("RECON_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("RECON_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid RECON_MAX_CONNECTIONS"),
            }
        }

        if let Ok(tenant) = std::env::var("RECON_TENANT_ID") {
            debug!(tenant_id = %tenant, "Overriding tenant from environment");
            self.ledger.tenant_id = tenant;
        }

        if let Ok(price) = std::env::var("RECON_PLACEHOLDER_PRICE_CENTS") {
            match price.parse::<i64>() {
                Ok(cents) => self.ledger.placeholder_unit_price_cents = cents,
                Err(_) => warn!(value = %price, "Ignoring invalid RECON_PLACEHOLDER_PRICE_CENTS"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "recon", "ledger")
            .map(|dirs| dirs.config_dir().join("recon.toml"))
    }

    // =========================================================================
    // Derived Settings
    // =========================================================================

    /// Pool options for [`Database::new`](crate::Database::new).
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone())
            .max_connections(self.database.max_connections)
            .connect_timeout(Duration::from_secs(self.database.connect_timeout_secs))
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }

    /// Unit-price fallback policy for the ledger service.
    pub fn price_policy(&self) -> ConfigResult<PricePolicy> {
        PricePolicy::new(Money::from_cents(self.ledger.placeholder_unit_price_cents))
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ReconConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ledger.tenant_id, DEFAULT_TENANT_ID);
        assert_eq!(config.price_policy().unwrap().placeholder().cents(), 1);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = ReconConfig::from_toml(
            r#"
            [ledger]
            placeholder_unit_price_cents = 25
            "#,
        )
        .unwrap();

        assert_eq!(config.ledger.placeholder_unit_price_cents, 25);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.ledger.tenant_id, DEFAULT_TENANT_ID);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = ReconConfig::default();
        config.ledger.placeholder_unit_price_cents = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ReconConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = ReconConfig::default();
        config.ledger.tenant_id = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_and_db_config() {
        let mut config = ReconConfig::default();
        config.database.path = PathBuf::from("/tmp/recon-test.db");
        config.database.connect_timeout_secs = 7;

        let parsed = ReconConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        let db = parsed.db_config();
        assert_eq!(db.database_path, PathBuf::from("/tmp/recon-test.db"));
        assert_eq!(db.connect_timeout, Duration::from_secs(7));
    }
}
