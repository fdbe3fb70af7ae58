//! # Store Errors

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures of the storage collaborator.
///
/// None of these are retried by the catalog; each is terminal for the
/// request that hit it.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// No connection could be obtained or the connection broke
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected or failed a query
    #[error("Query failed: {0}")]
    Query(String),

    /// A row did not have the expected shape
    #[error("Row decode failed: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. } => StoreError::Decode(err.to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}
