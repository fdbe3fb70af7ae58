//! landcat - a read-only spatial catalog of land parcels and address points
//!
//! Serves filtered, paginated views over a snapshot produced by an external
//! batch pipeline, classifies address points as interior or boundary to
//! their parcel, explains why excluded parcels are not land, and streams
//! whole catalogs as CSV.

pub mod cli;
pub mod config;
pub mod exclusion;
pub mod export;
pub mod http_server;
pub mod model;
pub mod observability;
pub mod query;
pub mod spatial;
pub mod store;
