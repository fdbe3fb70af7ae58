//! Observability for landcat
//!
//! Structured logging through `tracing`. The subscriber is installed once per
//! process; `RUST_LOG` overrides the configured level.
//!
//! # Usage
//!
//! ```ignore
//! use landcat::config::LoggingConfig;
//! use landcat::observability::init_logging;
//!
//! init_logging(&LoggingConfig::default())?;
//! tracing::info!(rows = 42, "export complete");
//! ```

use std::sync::OnceLock;

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// Observability error
#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Invalid log filter: {0}")]
    Filter(#[from] ParseError),

    #[error("Failed to install log subscriber: {0}")]
    Install(String),
}

/// Result type for observability operations
pub type ObservabilityResult<T> = Result<T, ObservabilityError>;

/// Filter from `RUST_LOG`, else from the configured level.
///
/// Pool and HTTP internals are capped at `warn` unless asked for.
pub fn env_filter(level: &str) -> ObservabilityResult<EnvFilter> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)?,
    };

    Ok(filter
        .add_directive("sqlx=warn".parse()?)
        .add_directive("hyper=warn".parse()?))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(config: &LoggingConfig) -> ObservabilityResult<()> {
    if LOGGER_INIT.get().is_some() {
        return Ok(());
    }

    let filter = env_filter(&config.level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    installed.map_err(|e| ObservabilityError::Install(e.to_string()))?;

    let _ = LOGGER_INIT.set(());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_accepts_level() {
        assert!(env_filter("debug").is_ok());
    }

    #[test]
    fn test_init_twice_is_ok() {
        let config = LoggingConfig::default();
        if init_logging(&config).is_ok() {
            assert!(init_logging(&config).is_ok());
        }
    }
}
