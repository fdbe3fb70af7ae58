//! # Catalog Queries
//!
//! Filter parsing, predicate construction, sort validation, pagination and
//! the executor that runs them against a store.

pub mod errors;
pub mod executor;
pub mod filter;
pub mod pagination;
pub mod predicate;
pub mod sort;

pub use errors::{CatalogError, CatalogResult};
pub use executor::{CatalogExecutor, CohortCounts, ParcelDetail};
pub use filter::FilterOptions;
pub use pagination::{page_count, Page, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use predicate::{BindValue, Clause, Comparison, Predicate};
pub use sort::{sortable_columns, SortDirection, SortSpec};
