//! # Spatial Classifier
//!
//! An address point is interior when the parcel eroded inward by the margin
//! still covers it, and boundary otherwise. A parcel that erodes to nothing
//! has only boundary points.
//!
//! The pipeline may have materialized the covered points for the default
//! margin. An availability probe decides between reading that join and asking
//! the geometry engine to erode and test containment on demand.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::{debug, info};

use crate::query::{CatalogError, CatalogResult};
use crate::store::{DerivedRelation, SpatialStore};

/// Inward erosion margin, in store units
pub const DEFAULT_EROSION_MARGIN: f64 = 5.0;

/// Margin `DerivedRelation::PointInteriorJoin` was built with
pub const PRECOMPUTED_MARGIN: f64 = DEFAULT_EROSION_MARGIN;

/// An address point reprojected to geographic coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PointLocation {
    pub uprn: i64,
    pub lon: f64,
    pub lat: f64,
}

/// How interior membership was determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMode {
    Precomputed,
    OnDemand,
}

/// One classified address point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedPoint {
    pub uprn: i64,
    pub is_interior: bool,
    pub lon: f64,
    pub lat: f64,
}

/// Classification of every address point of a parcel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParcelClassification {
    pub parcel_id: i64,
    pub mode: ClassificationMode,
    pub margin: f64,
    pub total: usize,
    pub interior: usize,
    pub boundary: usize,
    pub points: Vec<ClassifiedPoint>,
}

/// Mark each point interior iff its id is in `interior`.
///
/// Points come out ordered by id with duplicates collapsed, so each
/// associated point is classified exactly once.
pub fn classify_points(
    mut points: Vec<PointLocation>,
    interior: &HashSet<i64>,
) -> Vec<ClassifiedPoint> {
    points.sort_by_key(|p| p.uprn);
    points.dedup_by_key(|p| p.uprn);

    points
        .into_iter()
        .map(|p| ClassifiedPoint {
            is_interior: interior.contains(&p.uprn),
            uprn: p.uprn,
            lon: p.lon,
            lat: p.lat,
        })
        .collect()
}

/// Classifies address points against eroded parcels
pub struct SpatialClassifier<'a, S: SpatialStore> {
    store: &'a S,
    margin: f64,
}

impl<'a, S: SpatialStore> SpatialClassifier<'a, S> {
    pub fn new(store: &'a S, margin: f64) -> Self {
        Self { store, margin }
    }

    /// Use the precomputed join only when it exists and matches our margin
    pub async fn mode(&self) -> CatalogResult<ClassificationMode> {
        if self.margin != PRECOMPUTED_MARGIN {
            return Ok(ClassificationMode::OnDemand);
        }

        let available = self
            .store
            .relation_exists(DerivedRelation::PointInteriorJoin)
            .await?;

        if available {
            Ok(ClassificationMode::Precomputed)
        } else {
            info!(
                relation = DerivedRelation::PointInteriorJoin.relation(),
                "precomputed interior join absent, eroding on demand"
            );
            Ok(ClassificationMode::OnDemand)
        }
    }

    pub async fn classify(&self, parcel_id: i64) -> CatalogResult<ParcelClassification> {
        if !self.store.parcel_exists(parcel_id).await? {
            return Err(CatalogError::ParcelNotFound(parcel_id));
        }

        let mode = self.mode().await?;
        let points = self.store.parcel_points(parcel_id).await?;

        let interior: HashSet<i64> = match mode {
            ClassificationMode::Precomputed => {
                self.store.precomputed_interior(parcel_id).await?
            }
            ClassificationMode::OnDemand => {
                if self.store.erodes_to_empty(parcel_id, self.margin).await? {
                    debug!(parcel_id, margin = self.margin, "parcel erodes to empty");
                    Vec::new()
                } else {
                    self.store.covered_by_eroded(parcel_id, self.margin).await?
                }
            }
        }
        .into_iter()
        .collect();

        let points = classify_points(points, &interior);
        let interior = points.iter().filter(|p| p.is_interior).count();

        Ok(ParcelClassification {
            parcel_id,
            mode,
            margin: self.margin,
            total: points.len(),
            interior,
            boundary: points.len() - interior,
            points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(uprn: i64) -> PointLocation {
        PointLocation {
            uprn,
            lon: -1.0,
            lat: 52.0,
        }
    }

    #[test]
    fn test_classify_points_marks_interior() {
        let interior: HashSet<i64> = [2].into_iter().collect();
        let classified = classify_points(vec![point(3), point(2), point(1)], &interior);

        assert_eq!(
            classified.iter().map(|p| p.uprn).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(
            classified.iter().map(|p| p.is_interior).collect::<Vec<_>>(),
            vec![false, true, false]
        );
    }

    #[test]
    fn test_duplicate_points_classified_once() {
        let classified = classify_points(vec![point(1), point(1), point(2)], &HashSet::new());
        assert_eq!(classified.len(), 2);
    }

    #[test]
    fn test_interior_ids_without_point_are_ignored() {
        let interior: HashSet<i64> = [9].into_iter().collect();
        let classified = classify_points(vec![point(1)], &interior);

        assert_eq!(classified.len(), 1);
        assert!(!classified[0].is_interior);
    }
}
