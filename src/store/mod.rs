//! # Storage Collaborator
//!
//! The catalog reads a snapshot produced by an external batch pipeline. These
//! traits are the only way it touches that snapshot:
//!
//! - `CatalogStore` - counts, pages, single lookups and forward-only cursors
//! - `SpatialStore` - erosion, containment and reprojection of address points
//! - `ExclusionStore` - non-land exclusion inputs
//!
//! `PgStore` implements them against PostGIS; `MemoryStore` implements them
//! in-process for tests and local demos.

pub mod errors;
pub mod memory;
pub mod postgis;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::exclusion::{ExclusionCandidate, ExclusionRule};
use crate::model::{Cohort, ParcelRecord, Record};
use crate::query::{Predicate, SortSpec};
use crate::spatial::PointLocation;

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use postgis::PgStore;

/// A lazy, finite, non-restartable sequence of rows.
///
/// Dropping the stream releases whatever cursor and connection back it.
pub type RowStream<T> = BoxStream<'static, StoreResult<T>>;

/// Rows to return from a page query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: u64,
    pub offset: u64,
}

/// Optional relations the batch pipeline may or may not have materialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedRelation {
    /// Address points covered by their parcel eroded by the default margin
    PointInteriorJoin,

    /// Primary exclusion reason per excluded parcel
    ExclusionReasons,
}

impl DerivedRelation {
    pub fn relation(&self) -> &'static str {
        match self {
            DerivedRelation::PointInteriorJoin => "uprn_interior_5m",
            DerivedRelation::ExclusionReasons => "parcel_exclusion_primary",
        }
    }
}

/// Catalog queries
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Number of rows of `R`'s catalog matching `predicate`
    async fn count<R: Record>(&self, predicate: &Predicate) -> StoreResult<u64>;

    /// One window of matching rows, ordered by `sort`
    async fn fetch_page<R: Record>(
        &self,
        predicate: &Predicate,
        sort: &SortSpec,
        window: PageWindow,
    ) -> StoreResult<Vec<R>>;

    /// A single parcel regardless of cohort, or `None`
    async fn fetch_parcel(&self, parcel_id: i64) -> StoreResult<Option<ParcelRecord>>;

    /// Parcel counts per cohort, for cohorts that have any parcels
    async fn cohort_counts(&self) -> StoreResult<Vec<(Cohort, u64)>>;

    /// Every matching row in identifier order, fetched `batch_size` at a time
    fn export<R: Record>(&self, predicate: Predicate, batch_size: usize) -> RowStream<R>;

    /// Primary reason name recorded for one parcel in
    /// `DerivedRelation::ExclusionReasons`, or `None` when it has no row
    async fn precomputed_reason(&self, parcel_id: i64) -> StoreResult<Option<String>>;

    /// Probe for an optional relation. Only reports presence; it never fails
    /// because the relation is absent.
    async fn relation_exists(&self, relation: DerivedRelation) -> StoreResult<bool>;
}

/// Geometry capabilities used by the spatial classifier
#[async_trait]
pub trait SpatialStore: CatalogStore {
    async fn parcel_exists(&self, parcel_id: i64) -> StoreResult<bool>;

    /// Address points associated with the parcel, reprojected to lon/lat
    async fn parcel_points(&self, parcel_id: i64) -> StoreResult<Vec<PointLocation>>;

    /// Ids listed for the parcel in `DerivedRelation::PointInteriorJoin`
    async fn precomputed_interior(&self, parcel_id: i64) -> StoreResult<Vec<i64>>;

    /// Whether eroding the parcel by `margin` leaves nothing
    async fn erodes_to_empty(&self, parcel_id: i64, margin: f64) -> StoreResult<bool>;

    /// Ids of the parcel's points covered by the parcel eroded by `margin`
    async fn covered_by_eroded(&self, parcel_id: i64, margin: f64) -> StoreResult<Vec<i64>>;
}

/// Inputs of the exclusion reason resolver
#[async_trait]
pub trait ExclusionStore: CatalogStore {
    /// Parcels in the excluded cohort
    async fn excluded_total(&self) -> StoreResult<u64>;

    /// Reason name and count from `DerivedRelation::ExclusionReasons`
    async fn precomputed_reason_counts(&self) -> StoreResult<Vec<(String, u64)>>;

    /// Excluded parcels matching each rule, counted independently
    async fn rule_counts(&self) -> StoreResult<Vec<(ExclusionRule, u64)>>;

    /// Every excluded parcel with the attributes the rules look at
    fn exclusion_candidates(&self, batch_size: usize) -> RowStream<ExclusionCandidate>;
}
