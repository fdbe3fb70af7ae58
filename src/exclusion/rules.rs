//! # Exclusion Rules
//!
//! Independent rules that mark a parcel as not land. A parcel may match any
//! number of them; exactly one is reported as its primary reason, chosen by
//! the fixed priority below.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::model::ParcelRecord;

/// Offshore parcels count only when less than this share of them is land
pub const OFFSHORE_LAND_PCT_MAX: f64 = 10.0;

/// Parcels at or above this share of water are majority water
pub const MAJORITY_WATER_PCT_MIN: f64 = 50.0;

/// Non-land rules, declared highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionRule {
    OffshoreLowLand,
    MajorityWater,
    RoadCorridor,
    RailCorridor,
    LongThin,
}

impl ExclusionRule {
    /// Every rule, highest priority first
    pub const BY_PRIORITY: [ExclusionRule; 5] = [
        ExclusionRule::OffshoreLowLand,
        ExclusionRule::MajorityWater,
        ExclusionRule::RoadCorridor,
        ExclusionRule::RailCorridor,
        ExclusionRule::LongThin,
    ];

    /// 0 is the highest priority
    pub fn priority(&self) -> usize {
        match self {
            ExclusionRule::OffshoreLowLand => 0,
            ExclusionRule::MajorityWater => 1,
            ExclusionRule::RoadCorridor => 2,
            ExclusionRule::RailCorridor => 3,
            ExclusionRule::LongThin => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExclusionRule::OffshoreLowLand => "offshore_low_land",
            ExclusionRule::MajorityWater => "majority_water",
            ExclusionRule::RoadCorridor => "road_corridor",
            ExclusionRule::RailCorridor => "rail_corridor",
            ExclusionRule::LongThin => "long_thin",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::BY_PRIORITY.into_iter().find(|r| r.name() == name)
    }

    pub fn matches(&self, candidate: &ExclusionCandidate) -> bool {
        match self {
            ExclusionRule::OffshoreLowLand => {
                candidate.is_offshore && candidate.land_pct < OFFSHORE_LAND_PCT_MAX
            }
            ExclusionRule::MajorityWater => candidate.water_pct >= MAJORITY_WATER_PCT_MIN,
            ExclusionRule::RoadCorridor => candidate.is_road_corridor,
            ExclusionRule::RailCorridor => candidate.is_rail_corridor,
            ExclusionRule::LongThin => candidate.is_long_thin,
        }
    }

    /// The same condition as `matches`, over `parcel_catalog` columns
    pub fn sql_condition(&self) -> String {
        match self {
            ExclusionRule::OffshoreLowLand => {
                format!("is_offshore AND land_pct < {:.1}", OFFSHORE_LAND_PCT_MAX)
            }
            ExclusionRule::MajorityWater => format!("water_pct >= {:.1}", MAJORITY_WATER_PCT_MIN),
            ExclusionRule::RoadCorridor => "is_road_corridor".to_string(),
            ExclusionRule::RailCorridor => "is_rail_corridor".to_string(),
            ExclusionRule::LongThin => "is_long_thin".to_string(),
        }
    }

    /// Every rule the candidate matches, in priority order
    pub fn matching(candidate: &ExclusionCandidate) -> Vec<ExclusionRule> {
        Self::BY_PRIORITY
            .into_iter()
            .filter(|rule| rule.matches(candidate))
            .collect()
    }
}

/// The single reason surfaced for an excluded parcel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExclusionReason {
    Rule(ExclusionRule),
    /// Excluded, but no rule accounts for it
    Other,
}

impl ExclusionReason {
    pub const OTHER: &'static str = "other";

    pub fn name(&self) -> &'static str {
        match self {
            ExclusionReason::Rule(rule) => rule.name(),
            ExclusionReason::Other => Self::OTHER,
        }
    }

    /// Unknown names bucket as `Other`
    pub fn from_name(name: &str) -> Self {
        ExclusionRule::from_name(name.trim())
            .map(ExclusionReason::Rule)
            .unwrap_or(ExclusionReason::Other)
    }

    /// Every reason name, sorted
    pub fn all_names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = ExclusionRule::BY_PRIORITY
            .iter()
            .map(|r| r.name())
            .chain(std::iter::once(Self::OTHER))
            .collect();
        names.sort_unstable();
        names
    }
}

impl Serialize for ExclusionReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Highest-priority rule among `matches`, independent of their order
pub fn primary_reason(matches: impl IntoIterator<Item = ExclusionRule>) -> ExclusionReason {
    matches
        .into_iter()
        .min_by_key(ExclusionRule::priority)
        .map(ExclusionReason::Rule)
        .unwrap_or(ExclusionReason::Other)
}

/// What the rules look at on an excluded parcel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ExclusionCandidate {
    pub parcel_id: i64,
    pub water_pct: f64,
    pub land_pct: f64,
    pub is_offshore: bool,
    pub is_road_corridor: bool,
    pub is_rail_corridor: bool,
    pub is_long_thin: bool,
}

impl From<&ParcelRecord> for ExclusionCandidate {
    fn from(parcel: &ParcelRecord) -> Self {
        Self {
            parcel_id: parcel.parcel_id,
            water_pct: parcel.water_pct,
            land_pct: parcel.land_pct,
            is_offshore: parcel.is_offshore,
            is_road_corridor: parcel.is_road_corridor,
            is_rail_corridor: parcel.is_rail_corridor,
            is_long_thin: parcel.is_long_thin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> ExclusionCandidate {
        ExclusionCandidate {
            parcel_id: 1,
            water_pct: 0.0,
            land_pct: 100.0,
            is_offshore: false,
            is_road_corridor: false,
            is_rail_corridor: false,
            is_long_thin: false,
        }
    }

    #[test]
    fn test_priority_matches_declaration_order() {
        for (i, rule) in ExclusionRule::BY_PRIORITY.iter().enumerate() {
            assert_eq!(rule.priority(), i);
        }
    }

    #[test]
    fn test_majority_water_beats_road_corridor() {
        let c = ExclusionCandidate {
            water_pct: 60.0,
            is_road_corridor: true,
            ..candidate()
        };
        let matches = ExclusionRule::matching(&c);
        assert_eq!(
            matches,
            vec![ExclusionRule::MajorityWater, ExclusionRule::RoadCorridor]
        );

        let forward = primary_reason(matches.clone());
        let reversed = primary_reason(matches.into_iter().rev());
        assert_eq!(forward, ExclusionReason::Rule(ExclusionRule::MajorityWater));
        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_offshore_needs_low_land_fraction() {
        let mostly_land = ExclusionCandidate {
            is_offshore: true,
            land_pct: 80.0,
            ..candidate()
        };
        assert!(!ExclusionRule::OffshoreLowLand.matches(&mostly_land));

        let mostly_sea = ExclusionCandidate {
            is_offshore: true,
            land_pct: 2.0,
            water_pct: 98.0,
            ..candidate()
        };
        assert_eq!(
            primary_reason(ExclusionRule::matching(&mostly_sea)),
            ExclusionReason::Rule(ExclusionRule::OffshoreLowLand)
        );
    }

    #[test]
    fn test_water_threshold_is_inclusive() {
        let c = ExclusionCandidate {
            water_pct: 50.0,
            ..candidate()
        };
        assert!(ExclusionRule::MajorityWater.matches(&c));
    }

    #[test]
    fn test_no_match_is_other() {
        assert_eq!(
            primary_reason(ExclusionRule::matching(&candidate())),
            ExclusionReason::Other
        );
    }

    #[test]
    fn test_reason_names() {
        assert_eq!(
            ExclusionReason::from_name("road_corridor"),
            ExclusionReason::Rule(ExclusionRule::RoadCorridor)
        );
        assert_eq!(ExclusionReason::from_name("volcano"), ExclusionReason::Other);
        assert_eq!(
            ExclusionReason::all_names(),
            vec![
                "long_thin",
                "majority_water",
                "offshore_low_land",
                "other",
                "rail_corridor",
                "road_corridor"
            ]
        );
    }

    #[test]
    fn test_sql_condition_renders_thresholds() {
        assert_eq!(
            ExclusionRule::OffshoreLowLand.sql_condition(),
            "is_offshore AND land_pct < 10.0"
        );
        assert_eq!(
            ExclusionRule::MajorityWater.sql_condition(),
            "water_pct >= 50.0"
        );
    }
}
