//! Exclusion Reason Tests
//!
//! Non-land summaries in both resolution modes:
//! - One primary reason per excluded parcel, by fixed priority
//! - Unmatched or unrecognised reasons bucket as "other"
//! - Independent per-rule counts alongside

mod common;

use landcat::exclusion::{
    primary_reason, ExclusionReason, ExclusionResolver, ExclusionRule, ResolutionMode,
};

use common::fixture_store;

#[tokio::test]
async fn test_ranked_summary() {
    let store = fixture_store();
    let summary = ExclusionResolver::new(&store, 2).summarize().await.unwrap();

    assert_eq!(summary.mode, ResolutionMode::Ranked);
    assert_eq!(summary.total_excluded, 4);

    // 8: water + road, 9: offshore + water, 10: nothing, 11: rail + long-thin
    assert_eq!(summary.by_reason["majority_water"], 1);
    assert_eq!(summary.by_reason["offshore_low_land"], 1);
    assert_eq!(summary.by_reason["rail_corridor"], 1);
    assert_eq!(summary.by_reason["other"], 1);
    assert_eq!(summary.by_reason["road_corridor"], 0);
    assert_eq!(summary.by_reason["long_thin"], 0);
    assert_eq!(summary.by_reason.values().sum::<u64>(), summary.total_excluded);

    assert_eq!(summary.by_rule["majority_water"], 2);
    assert_eq!(summary.by_rule["road_corridor"], 1);
    assert_eq!(summary.by_rule["long_thin"], 1);
}

#[tokio::test]
async fn test_reasons_sorted_by_name() {
    let store = fixture_store();
    let summary = ExclusionResolver::new(&store, 100).summarize().await.unwrap();

    let names: Vec<&str> = summary.by_reason.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec![
            "long_thin",
            "majority_water",
            "offshore_low_land",
            "other",
            "rail_corridor",
            "road_corridor",
        ]
    );
}

#[tokio::test]
async fn test_precomputed_summary_buckets_unknown_and_missing_as_other() {
    let store = fixture_store().with_exclusion_reasons([
        (8, "majority_water"),
        (9, "offshore_low_land"),
        (11, "abandoned_quarry"),
    ]);
    let summary = ExclusionResolver::new(&store, 100).summarize().await.unwrap();

    assert_eq!(summary.mode, ResolutionMode::Precomputed);
    assert_eq!(summary.total_excluded, 4);
    assert_eq!(summary.by_reason["majority_water"], 1);
    assert_eq!(summary.by_reason["offshore_low_land"], 1);
    // 11 carries an unknown reason, 10 has no row at all
    assert_eq!(summary.by_reason["other"], 2);
    assert_eq!(summary.by_rule["rail_corridor"], 1);
}

#[tokio::test]
async fn test_modes_agree_when_materialization_matches_rules() {
    let ranked = ExclusionResolver::new(&fixture_store(), 100)
        .summarize()
        .await
        .unwrap();

    let store = fixture_store().with_exclusion_reasons([
        (8, "majority_water"),
        (9, "offshore_low_land"),
        (10, "other"),
        (11, "rail_corridor"),
    ]);
    let precomputed = ExclusionResolver::new(&store, 100)
        .summarize()
        .await
        .unwrap();

    assert_eq!(ranked.by_reason, precomputed.by_reason);
    assert_eq!(ranked.by_rule, precomputed.by_rule);
    assert_eq!(ranked.total_excluded, precomputed.total_excluded);
}

/// Majority water outranks road corridor no matter which is seen first.
#[test]
fn test_water_beats_road_in_any_order() {
    let orders = [
        vec![ExclusionRule::RoadCorridor, ExclusionRule::MajorityWater],
        vec![ExclusionRule::MajorityWater, ExclusionRule::RoadCorridor],
    ];
    for order in orders {
        assert_eq!(
            primary_reason(order),
            ExclusionReason::Rule(ExclusionRule::MajorityWater)
        );
    }
}
