//! # Filter Options
//!
//! The immutable set of optional catalog filters, parsed from request
//! parameters. Each field is validated on its own; an absent field means
//! "no constraint".

use std::collections::HashMap;

use super::errors::{CatalogError, CatalogResult};

/// Optional catalog filters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    pub min_acres: Option<f64>,
    pub max_acres: Option<f64>,

    /// Total address points on the parcel
    pub min_uprns: Option<i64>,
    pub max_uprns: Option<i64>,

    /// Interior address points only
    pub min_interior_uprns: Option<i64>,
    pub max_interior_uprns: Option<i64>,

    pub min_water_pct: Option<f64>,
    pub max_water_pct: Option<f64>,
    pub min_land_pct: Option<f64>,
    pub max_land_pct: Option<f64>,

    pub exclude_offshore: bool,
    pub exclude_road: bool,
    pub exclude_rail: bool,
    pub exclude_long_thin: bool,

    /// Widen the view from the three target cohorts to every cohort
    pub include_excluded: bool,
}

impl FilterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse filters from query parameters.
    ///
    /// Unknown keys are ignored (pagination and sort keys share the query
    /// string). A malformed value for a known key is rejected rather than
    /// dropped, since dropping it would widen the result set.
    pub fn parse(params: &HashMap<String, String>) -> CatalogResult<Self> {
        let real = |key: &str| parse_real(params, key);
        let count = |key: &str| parse_count(params, key);
        let flag = |key: &str| parse_flag(params, key);

        Ok(Self {
            min_acres: real("min_acres")?,
            max_acres: real("max_acres")?,
            min_uprns: count("min_uprns")?,
            max_uprns: count("max_uprns")?,
            min_interior_uprns: count("min_interior_uprns")?,
            max_interior_uprns: count("max_interior_uprns")?,
            min_water_pct: real("min_water_pct")?,
            max_water_pct: real("max_water_pct")?,
            min_land_pct: real("min_land_pct")?,
            max_land_pct: real("max_land_pct")?,
            exclude_offshore: flag("exclude_offshore")?,
            exclude_road: flag("exclude_road")?,
            exclude_rail: flag("exclude_rail")?,
            exclude_long_thin: flag("exclude_long_thin")?,
            include_excluded: flag("include_excluded")?,
        })
    }
}

/// Treat empty values as absent, the way HTML forms submit untouched inputs
fn raw<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn parse_real(params: &HashMap<String, String>, key: &str) -> CatalogResult<Option<f64>> {
    let Some(value) = raw(params, key) else {
        return Ok(None);
    };

    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(CatalogError::InvalidQueryParam(format!(
            "{} must be a finite number, got '{}'",
            key, value
        ))),
    }
}

fn parse_count(params: &HashMap<String, String>, key: &str) -> CatalogResult<Option<i64>> {
    let Some(value) = raw(params, key) else {
        return Ok(None);
    };

    value.parse::<i64>().map(Some).map_err(|_| {
        CatalogError::InvalidQueryParam(format!("{} must be an integer, got '{}'", key, value))
    })
}

fn parse_flag(params: &HashMap<String, String>, key: &str) -> CatalogResult<bool> {
    let Some(value) = raw(params, key) else {
        return Ok(false);
    };

    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(CatalogError::InvalidQueryParam(format!(
            "{} must be a boolean, got '{}'",
            key, value
        ))),
    }
}
