//! # Sort Specification
//!
//! Sort keys are validated against a per-catalog allow-list. Anything not on
//! the list falls back to the catalog default without complaint. Every
//! ordering ends with the catalog identifier ascending so that pages are
//! stable across calls.

use std::cmp::Ordering;

use serde_json::Value;

use crate::model::{Catalog, Column};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Case-insensitive parse of `asc` / `desc`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

const PARCEL_SORTABLE: &[Column] = &[
    Column::ParcelId,
    Column::Cohort,
    Column::Acres,
    Column::WaterPct,
    Column::LandPct,
    Column::UprnCount,
    Column::InteriorUprnCount,
    Column::BoundaryUprnCount,
];

const ADDRESS_POINT_SORTABLE: &[Column] = &[
    Column::Uprn,
    Column::ParcelId,
    Column::Acres,
    Column::WaterPct,
    Column::LandPct,
    Column::IsInterior,
];

/// Columns a catalog may be sorted by
pub fn sortable_columns(catalog: Catalog) -> &'static [Column] {
    match catalog {
        Catalog::Parcels => PARCEL_SORTABLE,
        Catalog::AddressPoints => ADDRESS_POINT_SORTABLE,
    }
}

/// A validated sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub catalog: Catalog,
    pub column: Column,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Parcels: largest first. Address points: by UPRN.
    pub fn default_for(catalog: Catalog) -> Self {
        match catalog {
            Catalog::Parcels => Self {
                catalog,
                column: Column::Acres,
                direction: SortDirection::Desc,
            },
            Catalog::AddressPoints => Self {
                catalog,
                column: Column::Uprn,
                direction: SortDirection::Asc,
            },
        }
    }

    /// Export order, independent of any interactive sort
    pub fn identifier_ascending(catalog: Catalog) -> Self {
        Self {
            catalog,
            column: catalog.id_column(),
            direction: SortDirection::Asc,
        }
    }

    /// Resolve caller input, falling back to the defaults on anything invalid
    pub fn resolve(catalog: Catalog, sort_by: Option<&str>, sort_dir: Option<&str>) -> Self {
        let default = Self::default_for(catalog);

        let column = sort_by
            .map(str::trim)
            .and_then(|name| {
                sortable_columns(catalog)
                    .iter()
                    .copied()
                    .find(|c| c.as_str() == name)
            })
            .unwrap_or(default.column);

        let direction = sort_dir
            .and_then(SortDirection::parse)
            .unwrap_or(default.direction);

        Self {
            catalog,
            column,
            direction,
        }
    }

    /// ORDER BY body, with the identifier tiebreaker appended
    pub fn order_by_sql(&self) -> String {
        let id = self.catalog.id_column();
        if self.column == id {
            format!("{} {}", id.as_str(), self.direction.as_sql())
        } else {
            format!(
                "{} {}, {} ASC",
                self.column.as_str(),
                self.direction.as_sql(),
                id.as_str()
            )
        }
    }

    /// Compare two serialized records the way `order_by_sql` orders rows
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let ordering = compare_values(a.get(self.column.as_str()), b.get(self.column.as_str()));
        let ordering = match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };

        let id = self.catalog.id_column().as_str();
        ordering.then_with(|| compare_values(a.get(id), b.get(id)))
    }
}

/// Compares two JSON values for sorting.
///
/// Ordering rules:
/// - missing < null < bool < number < string
/// - For same types, natural ordering
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let type_order = |v: &Value| -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    };

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a_val), Some(b_val)) => {
            let a_type = type_order(a_val);
            let b_type = type_order(b_val);
            if a_type != b_type {
                return a_type.cmp(&b_type);
            }

            match (a_val, b_val) {
                (Value::Bool(a_b), Value::Bool(b_b)) => a_b.cmp(b_b),
                (Value::Number(a_n), Value::Number(b_n)) => {
                    let a_f = a_n.as_f64().unwrap_or(0.0);
                    let b_f = b_n.as_f64().unwrap_or(0.0);
                    a_f.partial_cmp(&b_f).unwrap_or(Ordering::Equal)
                }
                (Value::String(a_s), Value::String(b_s)) => a_s.cmp(b_s),
                _ => Ordering::Equal,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_column_falls_back_silently() {
        let spec = SortSpec::resolve(Catalog::Parcels, Some("not_a_real_column"), None);
        assert_eq!(spec, SortSpec::default_for(Catalog::Parcels));
    }

    #[test]
    fn test_injection_attempt_falls_back() {
        let spec = SortSpec::resolve(
            Catalog::Parcels,
            Some("acres; DROP TABLE parcels"),
            Some("desc; --"),
        );
        assert_eq!(spec.column, Column::Acres);
        assert_eq!(spec.direction, SortDirection::Desc);
        assert_eq!(spec.order_by_sql(), "acres DESC, parcel_id ASC");
    }

    #[test]
    fn test_direction_is_case_insensitive() {
        let spec = SortSpec::resolve(Catalog::Parcels, Some("uprn_count"), Some("AsC"));
        assert_eq!(spec.column, Column::UprnCount);
        assert_eq!(spec.direction, SortDirection::Asc);
    }

    #[test]
    fn test_column_not_sortable_in_other_catalog() {
        let spec = SortSpec::resolve(Catalog::AddressPoints, Some("uprn_count"), None);
        assert_eq!(spec.column, Column::Uprn);
    }

    #[test]
    fn test_identifier_sort_has_no_duplicate_tiebreaker() {
        let spec = SortSpec::identifier_ascending(Catalog::AddressPoints);
        assert_eq!(spec.order_by_sql(), "uprn ASC");
    }

    #[test]
    fn test_compare_uses_id_tiebreaker() {
        let spec = SortSpec::default_for(Catalog::Parcels);
        let a = json!({"parcel_id": 2, "acres": 5.0});
        let b = json!({"parcel_id": 1, "acres": 5.0});
        let c = json!({"parcel_id": 3, "acres": 9.0});

        let mut rows = vec![a.clone(), b.clone(), c.clone()];
        rows.sort_by(|x, y| spec.compare(x, y));

        assert_eq!(rows, vec![c, b, a]);
    }
}
