//! # Predicate Builder
//!
//! Turns `FilterOptions` into a conjunctive predicate plus an ordered list of
//! bound values. Rendered SQL only ever contains column names from `Column`,
//! a fixed operator and `$n` placeholders; values travel separately.

use serde_json::Value;

use super::filter::FilterOptions;
use crate::model::{Catalog, Cohort, Column};

/// A value bound out-of-band to a placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Int(i64),
    Float(f64),
    TextList(Vec<String>),
}

impl BindValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            BindValue::Int(n) => Some(*n as f64),
            BindValue::Float(n) => Some(*n),
            BindValue::TextList(_) => None,
        }
    }
}

/// Range comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    AtLeast,
    AtMost,
}

impl Comparison {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Comparison::AtLeast => ">=",
            Comparison::AtMost => "<=",
        }
    }
}

/// One conjunct of a predicate. `slot` is the 1-based placeholder index.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `column = ANY($slot)`
    AnyOf { column: Column, slot: usize },

    /// `column >= $slot` or `column <= $slot`
    Compare {
        column: Column,
        op: Comparison,
        slot: usize,
    },

    /// `column IS NOT TRUE`
    NotTrue { column: Column },
}

/// A conjunctive predicate with its bound values
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    clauses: Vec<Clause>,
    values: Vec<BindValue>,
}

impl Predicate {
    /// Build the predicate for `catalog` from `filters`.
    ///
    /// Always starts with the cohort restriction. Point-count filters only
    /// exist on the parcel catalog and contribute nothing elsewhere.
    pub fn build(filters: &FilterOptions, catalog: Catalog) -> Self {
        let mut predicate = Predicate {
            clauses: Vec::new(),
            values: Vec::new(),
        };

        let cohorts: &[Cohort] = if filters.include_excluded {
            &Cohort::ALL
        } else {
            &Cohort::TARGETS
        };
        predicate.any_of(
            Column::Cohort,
            cohorts.iter().map(|c| c.as_str().to_string()).collect(),
        );

        predicate.range_real(Column::Acres, filters.min_acres, filters.max_acres);

        if catalog.has_column(Column::UprnCount) {
            predicate.range_count(Column::UprnCount, filters.min_uprns, filters.max_uprns);
        }
        if catalog.has_column(Column::InteriorUprnCount) {
            predicate.range_count(
                Column::InteriorUprnCount,
                filters.min_interior_uprns,
                filters.max_interior_uprns,
            );
        }

        predicate.range_real(Column::WaterPct, filters.min_water_pct, filters.max_water_pct);
        predicate.range_real(Column::LandPct, filters.min_land_pct, filters.max_land_pct);

        predicate.exclude_if_true(Column::IsOffshore, filters.exclude_offshore);
        predicate.exclude_if_true(Column::IsRoadCorridor, filters.exclude_road);
        predicate.exclude_if_true(Column::IsRailCorridor, filters.exclude_rail);
        predicate.exclude_if_true(Column::IsLongThin, filters.exclude_long_thin);

        predicate
    }

    fn bind(&mut self, value: BindValue) -> usize {
        self.values.push(value);
        self.values.len()
    }

    fn any_of(&mut self, column: Column, values: Vec<String>) {
        let slot = self.bind(BindValue::TextList(values));
        self.clauses.push(Clause::AnyOf { column, slot });
    }

    fn compare(&mut self, column: Column, op: Comparison, value: BindValue) {
        let slot = self.bind(value);
        self.clauses.push(Clause::Compare { column, op, slot });
    }

    fn range_real(&mut self, column: Column, min: Option<f64>, max: Option<f64>) {
        if let Some(min) = min {
            self.compare(column, Comparison::AtLeast, BindValue::Float(min));
        }
        if let Some(max) = max {
            self.compare(column, Comparison::AtMost, BindValue::Float(max));
        }
    }

    fn range_count(&mut self, column: Column, min: Option<i64>, max: Option<i64>) {
        if let Some(min) = min {
            self.compare(column, Comparison::AtLeast, BindValue::Int(min));
        }
        if let Some(max) = max {
            self.compare(column, Comparison::AtMost, BindValue::Int(max));
        }
    }

    fn exclude_if_true(&mut self, column: Column, enabled: bool) {
        if enabled {
            self.clauses.push(Clause::NotTrue { column });
        }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Bound values, in placeholder order
    pub fn values(&self) -> &[BindValue] {
        &self.values
    }

    /// Index of the next free placeholder (for LIMIT/OFFSET)
    pub fn next_slot(&self) -> usize {
        self.values.len() + 1
    }

    /// Render the WHERE body
    pub fn to_sql(&self) -> String {
        self.clauses
            .iter()
            .map(|clause| match clause {
                Clause::AnyOf { column, slot } => format!("{} = ANY(${})", column.as_str(), slot),
                Clause::Compare { column, op, slot } => {
                    format!("{} {} ${}", column.as_str(), op.as_sql(), slot)
                }
                Clause::NotTrue { column } => format!("{} IS NOT TRUE", column.as_str()),
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn value(&self, slot: usize) -> Option<&BindValue> {
        slot.checked_sub(1).and_then(|i| self.values.get(i))
    }

    /// Evaluate against a serialized record, with SQL semantics for missing
    /// values (a comparison against a missing field is false).
    pub fn matches(&self, row: &Value) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::AnyOf { column, slot } => {
                match (row.get(column.as_str()), self.value(*slot)) {
                    (Some(Value::String(s)), Some(BindValue::TextList(list))) => {
                        list.iter().any(|v| v == s)
                    }
                    _ => false,
                }
            }
            Clause::Compare { column, op, slot } => {
                let field = row.get(column.as_str()).and_then(Value::as_f64);
                let bound = self.value(*slot).and_then(BindValue::as_f64);
                match (field, bound) {
                    (Some(f), Some(b)) => match op {
                        Comparison::AtLeast => f >= b,
                        Comparison::AtMost => f <= b,
                    },
                    _ => false,
                }
            }
            Clause::NotTrue { column } => row.get(column.as_str()) != Some(&Value::Bool(true)),
        })
    }
}
