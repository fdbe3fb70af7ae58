//! # HTTP Server Module
//!
//! Axum server exposing the catalog.
//!
//! # Endpoints
//!
//! - `/healthz` - Liveness probe
//! - `/cohort-counts`, `/non-land-reasons` - Statistics
//! - `/parcels`, `/parcels/:id`, `/parcels/:id/uprns`, `/uprns` - Catalogs
//! - `/export/parcels.csv`, `/export/uprns.csv` - Streaming CSV export

pub mod catalog_routes;
pub mod config;
pub mod errors;
pub mod health_routes;
pub mod server;

pub use catalog_routes::{catalog_routes, CatalogBackend, CatalogState};
pub use config::HttpServerConfig;
pub use errors::{ApiError, ApiResult};
pub use health_routes::health_routes;
pub use server::HttpServer;
