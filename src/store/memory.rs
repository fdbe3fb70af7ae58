//! # In-Memory Store
//!
//! A fixture store holding a fixed snapshot in process. It evaluates the same
//! `Predicate` and `SortSpec` the PostGIS store renders to SQL, and answers
//! geometry questions with the `geo` crate.
//!
//! Erosion is modelled by clearance: a point is covered by the parcel eroded
//! by `m` iff it lies inside the parcel at least `m` from every ring. The
//! eroded parcel is empty when no point inside reaches that clearance; the
//! largest clearance is searched on a grid over the bounding box plus the
//! parcel's own address points.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use geo::{BoundingRect, Contains, Distance, Euclidean};
use geo_types::{Coord, Point, Polygon};
use serde_json::Value;

use super::errors::{StoreError, StoreResult};
use super::{
    CatalogStore, DerivedRelation, ExclusionStore, PageWindow, RowStream, SpatialStore,
};
use crate::exclusion::{ExclusionCandidate, ExclusionRule};
use crate::model::{AddressPointRecord, Catalog, Cohort, ParcelRecord, Record};
use crate::query::{Predicate, SortSpec};
use crate::spatial::PointLocation;

/// In-memory snapshot store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    parcels: Vec<ParcelRecord>,
    points: Vec<AddressPointRecord>,
    footprints: HashMap<i64, Polygon<f64>>,
    positions: HashMap<i64, Coord<f64>>,
    interior_join: Option<HashMap<i64, Vec<i64>>>,
    exclusion_reasons: Option<HashMap<i64, String>>,
    fail_export_after: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parcels(mut self, parcels: impl IntoIterator<Item = ParcelRecord>) -> Self {
        self.parcels.extend(parcels);
        self
    }

    pub fn with_address_points(
        mut self,
        points: impl IntoIterator<Item = AddressPointRecord>,
    ) -> Self {
        self.points.extend(points);
        self
    }

    /// Projected polygon of a parcel
    pub fn with_footprint(mut self, parcel_id: i64, footprint: Polygon<f64>) -> Self {
        self.footprints.insert(parcel_id, footprint);
        self
    }

    /// Projected position of an address point
    pub fn with_position(mut self, uprn: i64, position: Coord<f64>) -> Self {
        self.positions.insert(uprn, position);
        self
    }

    /// Materialize the interior join as `(parcel_id, uprn)` pairs
    pub fn with_interior_join(mut self, pairs: impl IntoIterator<Item = (i64, i64)>) -> Self {
        let join = self.interior_join.get_or_insert_with(HashMap::new);
        for (parcel_id, uprn) in pairs {
            join.entry(parcel_id).or_default().push(uprn);
        }
        self
    }

    /// Materialize primary exclusion reasons as `(parcel_id, reason)` pairs
    pub fn with_exclusion_reasons<'a>(
        mut self,
        reasons: impl IntoIterator<Item = (i64, &'a str)>,
    ) -> Self {
        let table = self.exclusion_reasons.get_or_insert_with(HashMap::new);
        for (parcel_id, reason) in reasons {
            table.insert(parcel_id, reason.to_string());
        }
        self
    }

    /// Make exports fail after `rows` rows, as a dropped connection would
    pub fn fail_export_after(mut self, rows: usize) -> Self {
        self.fail_export_after = Some(rows);
        self
    }

    fn rows(&self, catalog: Catalog) -> StoreResult<Vec<Value>> {
        let rows = match catalog {
            Catalog::Parcels => self
                .parcels
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()?,
            Catalog::AddressPoints => self
                .points
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(rows)
    }

    fn matching(&self, catalog: Catalog, predicate: &Predicate) -> StoreResult<Vec<Value>> {
        Ok(self
            .rows(catalog)?
            .into_iter()
            .filter(|row| predicate.matches(row))
            .collect())
    }

    fn parcel(&self, parcel_id: i64) -> Option<&ParcelRecord> {
        self.parcels.iter().find(|p| p.parcel_id == parcel_id)
    }

    fn points_of(&self, parcel_id: i64) -> impl Iterator<Item = &AddressPointRecord> + '_ {
        self.points
            .iter()
            .filter(move |p| p.parcel_id == parcel_id || p.parcel_ids.contains(&parcel_id))
    }

    fn positions_of(&self, parcel_id: i64) -> impl Iterator<Item = Point<f64>> + '_ {
        self.points_of(parcel_id)
            .filter_map(|p| self.positions.get(&p.uprn))
            .map(|pos| Point::from(*pos))
    }

    fn excluded(&self) -> impl Iterator<Item = &ParcelRecord> + '_ {
        self.parcels
            .iter()
            .filter(|p| p.cohort == Cohort::Excluded)
    }
}

/// Grid resolution per axis when searching for the largest clearance
const CLEARANCE_SAMPLES: usize = 64;

fn distance_to_rings(polygon: &Polygon<f64>, point: &Point<f64>) -> f64 {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| Euclidean.distance(point, ring))
        .fold(f64::INFINITY, f64::min)
}

/// Distance from `point` to the nearest ring, if it lies inside the polygon
fn clearance(polygon: &Polygon<f64>, point: &Point<f64>) -> Option<f64> {
    polygon
        .contains(point)
        .then(|| distance_to_rings(polygon, point))
}

fn grid_points(polygon: &Polygon<f64>) -> Vec<Point<f64>> {
    let Some(rect) = polygon.bounding_rect() else {
        return Vec::new();
    };
    let step_x = rect.width() / CLEARANCE_SAMPLES as f64;
    let step_y = rect.height() / CLEARANCE_SAMPLES as f64;

    (0..CLEARANCE_SAMPLES)
        .flat_map(|i| (0..CLEARANCE_SAMPLES).map(move |j| (i, j)))
        .map(|(i, j)| {
            Point::new(
                rect.min().x + (i as f64 + 0.5) * step_x,
                rect.min().y + (j as f64 + 0.5) * step_y,
            )
        })
        .collect()
}

/// Whether eroding by `margin` leaves nothing, judged over the grid and `extra`
fn erodes_to_empty(
    polygon: &Polygon<f64>,
    margin: f64,
    extra: impl IntoIterator<Item = Point<f64>>,
) -> bool {
    !grid_points(polygon)
        .into_iter()
        .chain(extra)
        .filter_map(|p| clearance(polygon, &p))
        .any(|d| d >= margin)
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn count<R: Record>(&self, predicate: &Predicate) -> StoreResult<u64> {
        Ok(self.matching(R::CATALOG, predicate)?.len() as u64)
    }

    async fn fetch_page<R: Record>(
        &self,
        predicate: &Predicate,
        sort: &SortSpec,
        window: PageWindow,
    ) -> StoreResult<Vec<R>> {
        let mut rows = self.matching(R::CATALOG, predicate)?;
        rows.sort_by(|a, b| sort.compare(a, b));

        rows.into_iter()
            .skip(window.offset as usize)
            .take(window.limit as usize)
            .map(|row| serde_json::from_value(row).map_err(StoreError::from))
            .collect()
    }

    async fn fetch_parcel(&self, parcel_id: i64) -> StoreResult<Option<ParcelRecord>> {
        Ok(self.parcel(parcel_id).cloned())
    }

    async fn cohort_counts(&self) -> StoreResult<Vec<(Cohort, u64)>> {
        let mut counts: BTreeMap<Cohort, u64> = BTreeMap::new();
        for parcel in &self.parcels {
            *counts.entry(parcel.cohort).or_insert(0) += 1;
        }
        Ok(counts.into_iter().collect())
    }

    fn export<R: Record>(&self, predicate: Predicate, _batch_size: usize) -> RowStream<R> {
        let order = SortSpec::identifier_ascending(R::CATALOG);
        let rows = match self.matching(R::CATALOG, &predicate) {
            Ok(mut rows) => {
                rows.sort_by(|a, b| order.compare(a, b));
                rows
            }
            Err(e) => return stream::once(async move { Err(e) }).boxed(),
        };

        let fail_after = self.fail_export_after;
        stream::iter(rows.into_iter().enumerate())
            .map(move |(i, row)| {
                if fail_after.is_some_and(|n| i >= n) {
                    return Err(StoreError::Unavailable("connection reset by peer".to_string()));
                }
                serde_json::from_value::<R>(row).map_err(StoreError::from)
            })
            .boxed()
    }

    async fn precomputed_reason(&self, parcel_id: i64) -> StoreResult<Option<String>> {
        let reasons = self.exclusion_reasons.as_ref().ok_or_else(|| {
            StoreError::Query(format!(
                "relation \"{}\" does not exist",
                DerivedRelation::ExclusionReasons.relation()
            ))
        })?;
        Ok(reasons.get(&parcel_id).cloned())
    }

    async fn relation_exists(&self, relation: DerivedRelation) -> StoreResult<bool> {
        Ok(match relation {
            DerivedRelation::PointInteriorJoin => self.interior_join.is_some(),
            DerivedRelation::ExclusionReasons => self.exclusion_reasons.is_some(),
        })
    }
}

#[async_trait]
impl SpatialStore for MemoryStore {
    async fn parcel_exists(&self, parcel_id: i64) -> StoreResult<bool> {
        Ok(self.parcel(parcel_id).is_some())
    }

    async fn parcel_points(&self, parcel_id: i64) -> StoreResult<Vec<PointLocation>> {
        Ok(self
            .points_of(parcel_id)
            .map(|p| PointLocation {
                uprn: p.uprn,
                lon: p.lon,
                lat: p.lat,
            })
            .collect())
    }

    async fn precomputed_interior(&self, parcel_id: i64) -> StoreResult<Vec<i64>> {
        let join = self.interior_join.as_ref().ok_or_else(|| {
            StoreError::Query(format!(
                "relation \"{}\" does not exist",
                DerivedRelation::PointInteriorJoin.relation()
            ))
        })?;
        Ok(join.get(&parcel_id).cloned().unwrap_or_default())
    }

    async fn erodes_to_empty(&self, parcel_id: i64, margin: f64) -> StoreResult<bool> {
        let Some(footprint) = self.footprints.get(&parcel_id) else {
            return Ok(true);
        };
        Ok(erodes_to_empty(footprint, margin, self.positions_of(parcel_id)))
    }

    async fn covered_by_eroded(&self, parcel_id: i64, margin: f64) -> StoreResult<Vec<i64>> {
        let Some(footprint) = self.footprints.get(&parcel_id) else {
            return Ok(Vec::new());
        };

        Ok(self
            .points_of(parcel_id)
            .filter_map(|p| self.positions.get(&p.uprn).map(|pos| (p.uprn, Point::from(*pos))))
            .filter(|(_, pos)| clearance(footprint, pos).is_some_and(|d| d >= margin))
            .map(|(uprn, _)| uprn)
            .collect())
    }
}

#[async_trait]
impl ExclusionStore for MemoryStore {
    async fn excluded_total(&self) -> StoreResult<u64> {
        Ok(self.excluded().count() as u64)
    }

    async fn precomputed_reason_counts(&self) -> StoreResult<Vec<(String, u64)>> {
        let reasons = self.exclusion_reasons.as_ref().ok_or_else(|| {
            StoreError::Query(format!(
                "relation \"{}\" does not exist",
                DerivedRelation::ExclusionReasons.relation()
            ))
        })?;

        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for reason in reasons.values() {
            *counts.entry(reason.clone()).or_insert(0) += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn rule_counts(&self) -> StoreResult<Vec<(ExclusionRule, u64)>> {
        Ok(ExclusionRule::BY_PRIORITY
            .into_iter()
            .map(|rule| {
                let n = self
                    .excluded()
                    .filter(|p| rule.matches(&ExclusionCandidate::from(*p)))
                    .count();
                (rule, n as u64)
            })
            .collect())
    }

    fn exclusion_candidates(&self, _batch_size: usize) -> RowStream<ExclusionCandidate> {
        let candidates: Vec<ExclusionCandidate> =
            self.excluded().map(ExclusionCandidate::from).collect();
        stream::iter(candidates.into_iter().map(Ok)).boxed()
    }
}
