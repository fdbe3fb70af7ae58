//! # Application Configuration
//!
//! One JSON file, every field defaulted. Built once at startup and shared
//! read-only with the request handlers.
//!
//! ```json
//! {
//!   "server": { "host": "0.0.0.0", "port": 8000 },
//!   "database": { "url": "postgresql://postgres:postgres@db:5432/land" },
//!   "catalog": { "default_page_size": 50, "erosion_margin": 5.0 },
//!   "logging": { "level": "info", "format": "json" }
//! }
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::export::DEFAULT_EXPORT_BATCH_SIZE;
use crate::http_server::HttpServerConfig;
use crate::query::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::spatial::DEFAULT_EROSION_MARGIN;

/// Environment variable overriding `database.url`
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection before failing the request
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

fn default_database_url() -> String {
    "postgresql://postgres:postgres@db:5432/land".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

/// Query, export and classification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// Rows fetched per cursor round trip during export
    #[serde(default = "default_export_batch_size")]
    pub export_batch_size: usize,

    /// Inward erosion in projected store units
    #[serde(default = "default_erosion_margin")]
    pub erosion_margin: f64,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_max_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_export_batch_size() -> usize {
    DEFAULT_EXPORT_BATCH_SIZE
}

fn default_erosion_margin() -> f64 {
    DEFAULT_EROSION_MARGIN
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            export_batch_size: default_export_batch_size(),
            erosion_margin: default_erosion_margin(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: HttpServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from a JSON file, apply the environment and validate
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let mut config: AppConfig = serde_json::from_str(&content)?;
        config.apply_env();
        config.validate()?;

        Ok(config)
    }

    /// Load from `path` if given, else start from defaults
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let mut config = AppConfig::default();
                config.apply_env();
                config.validate()?;
                Ok(config)
            }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.database.url = url;
            }
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let catalog = &self.catalog;

        if catalog.max_page_size == 0 {
            return Err(ConfigError::Invalid("catalog.max_page_size must be > 0".into()));
        }
        if catalog.default_page_size == 0 || catalog.default_page_size > catalog.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "catalog.default_page_size must be in [1, {}]",
                catalog.max_page_size
            )));
        }
        if catalog.export_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "catalog.export_batch_size must be > 0".into(),
            ));
        }
        if !catalog.erosion_margin.is_finite() || catalog.erosion_margin <= 0.0 {
            return Err(ConfigError::Invalid(
                "catalog.erosion_margin must be a positive number".into(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be > 0".into(),
            ));
        }

        Ok(())
    }
}
