//! # Exclusion Reason Resolver
//!
//! Summarizes excluded parcels by primary reason. When the pipeline has
//! materialized a reason per parcel it is read directly; otherwise every
//! excluded parcel is streamed once and ranked here.

use std::collections::BTreeMap;

use futures_util::TryStreamExt;
use serde::Serialize;
use tracing::{debug, info};

use super::rules::{primary_reason, ExclusionReason, ExclusionRule};
use crate::query::CatalogResult;
use crate::store::{DerivedRelation, ExclusionStore};

/// Where the primary reasons came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    /// Read from the pipeline's reason-per-parcel materialization
    Precomputed,
    /// Ranked from the matching rules of each parcel
    Ranked,
}

/// Non-land exclusion counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExclusionSummary {
    pub total_excluded: u64,
    /// Primary reason counts, keyed and sorted by reason name
    pub by_reason: BTreeMap<String, u64>,
    /// Independent rule counts; a parcel counts once per matching rule
    pub by_rule: BTreeMap<String, u64>,
    pub mode: ResolutionMode,
}

fn zeroed_reasons() -> BTreeMap<String, u64> {
    ExclusionReason::all_names()
        .into_iter()
        .map(|name| (name.to_string(), 0))
        .collect()
}

fn zeroed_rules() -> BTreeMap<String, u64> {
    ExclusionRule::BY_PRIORITY
        .iter()
        .map(|rule| (rule.name().to_string(), 0))
        .collect()
}

/// Resolves exclusion reasons against a store
pub struct ExclusionResolver<'a, S: ExclusionStore> {
    store: &'a S,
    batch_size: usize,
}

impl<'a, S: ExclusionStore> ExclusionResolver<'a, S> {
    pub fn new(store: &'a S, batch_size: usize) -> Self {
        Self { store, batch_size }
    }

    /// Pick the mode from an explicit availability probe
    pub async fn mode(&self) -> CatalogResult<ResolutionMode> {
        let available = self
            .store
            .relation_exists(DerivedRelation::ExclusionReasons)
            .await?;

        Ok(if available {
            ResolutionMode::Precomputed
        } else {
            ResolutionMode::Ranked
        })
    }

    pub async fn summarize(&self) -> CatalogResult<ExclusionSummary> {
        let mode = self.mode().await?;
        debug!(?mode, "resolving exclusion reasons");

        match mode {
            ResolutionMode::Precomputed => self.summarize_precomputed().await,
            ResolutionMode::Ranked => {
                info!(
                    relation = DerivedRelation::ExclusionReasons.relation(),
                    "reason materialization absent, ranking rules per parcel"
                );
                self.summarize_ranked().await
            }
        }
    }

    async fn summarize_precomputed(&self) -> CatalogResult<ExclusionSummary> {
        let total_excluded = self.store.excluded_total().await?;

        let mut by_reason = zeroed_reasons();
        let mut accounted = 0u64;
        for (name, count) in self.store.precomputed_reason_counts().await? {
            let reason = ExclusionReason::from_name(&name);
            *by_reason.entry(reason.name().to_string()).or_insert(0) += count;
            accounted += count;
        }

        // Excluded parcels the materialization has no row for
        if let Some(other) = by_reason.get_mut(ExclusionReason::OTHER) {
            *other += total_excluded.saturating_sub(accounted);
        }

        let mut by_rule = zeroed_rules();
        for (rule, count) in self.store.rule_counts().await? {
            by_rule.insert(rule.name().to_string(), count);
        }

        Ok(ExclusionSummary {
            total_excluded: total_excluded.max(accounted),
            by_reason,
            by_rule,
            mode: ResolutionMode::Precomputed,
        })
    }

    async fn summarize_ranked(&self) -> CatalogResult<ExclusionSummary> {
        let mut summary = ExclusionSummary {
            total_excluded: 0,
            by_reason: zeroed_reasons(),
            by_rule: zeroed_rules(),
            mode: ResolutionMode::Ranked,
        };

        let mut candidates = self.store.exclusion_candidates(self.batch_size);
        while let Some(candidate) = candidates.try_next().await? {
            let matches = ExclusionRule::matching(&candidate);
            for rule in &matches {
                *summary.by_rule.entry(rule.name().to_string()).or_insert(0) += 1;
            }

            let reason = primary_reason(matches);
            *summary.by_reason.entry(reason.name().to_string()).or_insert(0) += 1;
            summary.total_excluded += 1;
        }

        Ok(summary)
    }
}
