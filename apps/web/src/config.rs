//! Web server configuration.
//!
//! ## Load Order
//! ```text
//! defaults ──► lacteos.toml (or --config / LACTEOS_CONFIG) ──► LACTEOS_* env ──► validate
//! ```
//!
//! ## Example File
//! ```toml
//! bind_addr = "127.0.0.1"
//! port = 8080
//! database_path = "/var/lib/lacteos/lacteos.db"
//! jwt_secret = "a-long-random-string"
//! token_lifetime_secs = 28800
//! low_stock_threshold = 10
//! db_max_connections = 5
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// File read when no explicit path is given. Missing is fine.
pub const DEFAULT_CONFIG_FILE: &str = "lacteos.toml";

const DEV_JWT_SECRET: &str = "lacteos-dev-secret-change-in-production";

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Interface to listen on
    pub bind_addr: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Secret for signing session tokens
    pub jwt_secret: String,

    /// Session token lifetime in seconds
    pub token_lifetime_secs: i64,

    /// Products below this stock show up on the dashboard
    pub low_stock_threshold: i64,

    /// SQLite pool size
    pub db_max_connections: u32,
}

impl Default for WebConfig {
    fn default() -> Self {
        WebConfig {
            bind_addr: "0.0.0.0".to_string(),
            port: 8000,
            database_path: PathBuf::from("./lacteos.db"),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_lifetime_secs: 8 * 3600,
            low_stock_threshold: lacteos_core::LOW_STOCK_THRESHOLD,
            db_max_connections: 5,
        }
    }
}

impl WebConfig {
    /// Loads configuration from file and environment.
    ///
    /// An explicit `config_path` must exist; the default file is optional.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(&path)?,
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    debug!(?path, "Config file not found, using defaults");
                    Self::default()
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        if config.jwt_secret == DEV_JWT_SECRET {
            warn!("Using the development JWT secret; set LACTEOS_JWT_SECRET in production");
        }

        Ok(config)
    }

    /// Reads a TOML file; keys it leaves out keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!(?path, "Loading config from file");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `LACTEOS_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("LACTEOS_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(port) = lookup("LACTEOS_PORT") {
            self.port = parse_var("LACTEOS_PORT", &port)?;
        }
        if let Some(path) = lookup("LACTEOS_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database_path = PathBuf::from(path);
        }
        if let Some(secret) = lookup("LACTEOS_JWT_SECRET") {
            self.jwt_secret = secret;
        }
        if let Some(secs) = lookup("LACTEOS_TOKEN_LIFETIME_SECS") {
            self.token_lifetime_secs = parse_var("LACTEOS_TOKEN_LIFETIME_SECS", &secs)?;
        }
        if let Some(threshold) = lookup("LACTEOS_LOW_STOCK_THRESHOLD") {
            self.low_stock_threshold = parse_var("LACTEOS_LOW_STOCK_THRESHOLD", &threshold)?;
        }
        if let Some(max) = lookup("LACTEOS_DB_MAX_CONNECTIONS") {
            self.db_max_connections = parse_var("LACTEOS_DB_MAX_CONNECTIONS", &max)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt_secret".to_string()));
        }
        if self.token_lifetime_secs <= 0 {
            return Err(ConfigError::Invalid(
                "token_lifetime_secs must be greater than 0".to_string(),
            ));
        }
        if self.low_stock_threshold < 0 {
            return Err(ConfigError::Invalid(
                "low_stock_threshold cannot be negative".to_string(),
            ));
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::Invalid(
                "db_max_connections must be greater than 0".to_string(),
            ));
        }
        self.socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("bind_addr".to_string()))
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}
