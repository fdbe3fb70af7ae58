//! # Catalog Query Executor
//!
//! Runs a count query and a bounded page query for a catalog. The two queries
//! do not share a transaction: under concurrent writes the total and the page
//! may come from different snapshots. The batch pipeline publishes whole
//! snapshots, so in practice they agree.

use serde::Serialize;
use tracing::debug;

use super::errors::{CatalogError, CatalogResult};
use super::filter::FilterOptions;
use super::pagination::{Page, PageRequest};
use super::predicate::Predicate;
use super::sort::SortSpec;
use crate::exclusion::{primary_reason, ExclusionCandidate, ExclusionReason, ExclusionRule};
use crate::model::{Cohort, ParcelRecord, Record};
use crate::store::{CatalogStore, DerivedRelation, PageWindow};

/// A parcel with the exclusion rules it matches
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParcelDetail {
    #[serde(flatten)]
    pub parcel: ParcelRecord,
    pub exclusion_rules: Vec<ExclusionRule>,
    /// Only set for parcels in the excluded cohort
    pub primary_reason: Option<ExclusionReason>,
}

impl From<ParcelRecord> for ParcelDetail {
    fn from(parcel: ParcelRecord) -> Self {
        let exclusion_rules = ExclusionRule::matching(&ExclusionCandidate::from(&parcel));
        let primary_reason = (parcel.cohort == Cohort::Excluded)
            .then(|| primary_reason(exclusion_rules.iter().copied()));

        Self {
            parcel,
            exclusion_rules,
            primary_reason,
        }
    }
}

/// Parcel counts of the three target cohorts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CohortCounts {
    #[serde(rename = "A_bare_land")]
    pub bare_land: u64,
    #[serde(rename = "B_single_holding")]
    pub single_holding: u64,
    #[serde(rename = "C_dispersed_estate")]
    pub dispersed_estate: u64,
    pub total: u64,
}

impl CohortCounts {
    /// Fold per-cohort counts; cohorts outside the targets are not counted
    pub fn from_counts(counts: impl IntoIterator<Item = (Cohort, u64)>) -> Self {
        let mut out = CohortCounts::default();
        for (cohort, n) in counts {
            match cohort {
                Cohort::BareLand => out.bare_land += n,
                Cohort::SingleHolding => out.single_holding += n,
                Cohort::DispersedEstate => out.dispersed_estate += n,
                Cohort::Excluded => continue,
            }
        }
        out.total = out.bare_land + out.single_holding + out.dispersed_estate;
        out
    }
}

/// Executes catalog queries against a store
pub struct CatalogExecutor<'a, S: CatalogStore> {
    store: &'a S,
}

impl<'a, S: CatalogStore> CatalogExecutor<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// One page of `R`'s catalog with the total across all pages
    pub async fn paginate<R: Record>(
        &self,
        filters: &FilterOptions,
        sort: SortSpec,
        request: PageRequest,
    ) -> CatalogResult<Page<R>> {
        let predicate = Predicate::build(filters, R::CATALOG);
        let total = self.store.count::<R>(&predicate).await?;

        let window = PageWindow {
            limit: request.limit(),
            offset: request.offset(),
        };

        // A page past the end is empty; skip the round trip
        let items = if window.offset >= total {
            Vec::new()
        } else {
            self.store.fetch_page::<R>(&predicate, &sort, window).await?
        };

        debug!(
            catalog = R::CATALOG.name(),
            total,
            page = request.page,
            returned = items.len(),
            "catalog page"
        );

        Ok(Page::new(request, total, items))
    }

    /// Full record of one parcel, in any cohort.
    ///
    /// The primary reason of an excluded parcel comes from the reason
    /// materialization when it exists, matching the non-land summary; a
    /// parcel missing from it, or carrying an unknown reason, is `other`.
    pub async fn parcel_detail(&self, parcel_id: i64) -> CatalogResult<ParcelDetail> {
        let mut detail = self
            .store
            .fetch_parcel(parcel_id)
            .await?
            .map(ParcelDetail::from)
            .ok_or(CatalogError::ParcelNotFound(parcel_id))?;

        if detail.primary_reason.is_some()
            && self
                .store
                .relation_exists(DerivedRelation::ExclusionReasons)
                .await?
        {
            let recorded = self.store.precomputed_reason(parcel_id).await?;
            detail.primary_reason = Some(
                recorded
                    .as_deref()
                    .map_or(ExclusionReason::Other, ExclusionReason::from_name),
            );
        }

        Ok(detail)
    }

    pub async fn cohort_counts(&self) -> CatalogResult<CohortCounts> {
        Ok(CohortCounts::from_counts(self.store.cohort_counts().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cohort_counts_total_and_excluded_ignored() {
        let counts = CohortCounts::from_counts(vec![
            (Cohort::BareLand, 3),
            (Cohort::DispersedEstate, 2),
            (Cohort::Excluded, 100),
        ]);

        assert_eq!(counts.bare_land, 3);
        assert_eq!(counts.single_holding, 0);
        assert_eq!(counts.total, 5);

        let json = serde_json::to_value(counts).unwrap();
        assert_eq!(json["A_bare_land"], 3);
        assert_eq!(json["B_single_holding"], 0);
        assert_eq!(json["total"], 5);
    }

    #[test]
    fn test_detail_primary_reason_only_for_excluded() {
        let parcel = ParcelRecord {
            parcel_id: 4,
            cohort: Cohort::Excluded,
            acres: 3.0,
            water_pct: 70.0,
            land_pct: 30.0,
            is_offshore: false,
            is_road_corridor: true,
            is_rail_corridor: false,
            is_long_thin: false,
            uprn_count: 0,
            interior_uprn_count: 0,
            boundary_uprn_count: 0,
        };
        let detail = ParcelDetail::from(parcel.clone());
        assert_eq!(
            detail.primary_reason,
            Some(ExclusionReason::Rule(ExclusionRule::MajorityWater))
        );

        let kept = ParcelDetail::from(ParcelRecord {
            cohort: Cohort::BareLand,
            ..parcel
        });
        assert_eq!(kept.primary_reason, None);
        assert_eq!(kept.exclusion_rules.len(), 2);

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["parcel_id"], 4);
        assert_eq!(json["primary_reason"], "majority_water");
        assert_eq!(
            json["exclusion_rules"],
            serde_json::json!(["majority_water", "road_corridor"])
        );
    }
}
