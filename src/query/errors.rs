//! # Catalog Errors
//!
//! Outcomes of catalog, classification and exclusion operations that are not
//! a successful result.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Catalog errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A filter value could not be parsed
    #[error("Invalid query parameter: {0}")]
    InvalidQueryParam(String),

    /// Single-record lookup on an id the snapshot does not hold
    #[error("Parcel not found: {0}")]
    ParcelNotFound(i64),

    /// The store failed; never retried here
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CatalogError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::ParcelNotFound(_))
    }
}
