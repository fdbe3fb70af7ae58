//! CLI-specific error types
//!
//! Every CLI error is fatal: it is printed to stderr and the process exits
//! non-zero.

use thiserror::Error;

use crate::config::ConfigError;
use crate::export::ExportError;
use crate::observability::ObservabilityError;
use crate::store::StoreError;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] ObservabilityError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(_) => "LANDCAT_CLI_CONFIG_ERROR",
            CliError::Logging(_) => "LANDCAT_CLI_LOGGING_ERROR",
            CliError::Store(_) => "LANDCAT_CLI_STORE_ERROR",
            CliError::Export(_) => "LANDCAT_CLI_EXPORT_ERROR",
            CliError::Io(_) => "LANDCAT_CLI_IO_ERROR",
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let err = CliError::from(ConfigError::Invalid("bad".to_string()));
        assert_eq!(err.code(), "LANDCAT_CLI_CONFIG_ERROR");
        assert_eq!(err.to_string(), "Invalid config: bad");
    }
}
