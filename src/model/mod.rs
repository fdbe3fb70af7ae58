//! # Catalog Data Model
//!
//! Parcels and address points as read from the batch pipeline's snapshot.
//! Nothing here is ever written back; the types only describe rows.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::FromRow;
use thiserror::Error;

/// Categorical parcel classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Cohort {
    /// Bare land with no address points
    #[serde(rename = "A_bare_land")]
    BareLand,

    /// Land held with a single address point
    #[serde(rename = "B_single_holding")]
    SingleHolding,

    /// Estate whose address points are dispersed across it
    #[serde(rename = "C_dispersed_estate")]
    DispersedEstate,

    /// Not land for catalog purposes (see `exclusion`)
    #[serde(rename = "X_excluded")]
    Excluded,
}

impl Cohort {
    /// The three cohorts every default catalog view is restricted to
    pub const TARGETS: [Cohort; 3] = [
        Cohort::BareLand,
        Cohort::SingleHolding,
        Cohort::DispersedEstate,
    ];

    pub const ALL: [Cohort; 4] = [
        Cohort::BareLand,
        Cohort::SingleHolding,
        Cohort::DispersedEstate,
        Cohort::Excluded,
    ];

    /// Get the stored name of this cohort
    pub fn as_str(&self) -> &'static str {
        match self {
            Cohort::BareLand => "A_bare_land",
            Cohort::SingleHolding => "B_single_holding",
            Cohort::DispersedEstate => "C_dispersed_estate",
            Cohort::Excluded => "X_excluded",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Cohort::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

/// A cohort name the store returned that this build does not know
#[derive(Debug, Clone, Error)]
#[error("unknown cohort: {0}")]
pub struct UnknownCohort(pub String);

impl TryFrom<String> for Cohort {
    type Error = UnknownCohort;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Cohort::parse(&value).ok_or(UnknownCohort(value))
    }
}

/// Every column a catalog query may reference.
///
/// This is the only source of identifiers rendered into SQL: filters and sort
/// keys name a `Column`, never a caller-supplied string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    ParcelId,
    ParcelIds,
    Uprn,
    Cohort,
    Acres,
    WaterPct,
    LandPct,
    IsOffshore,
    IsRoadCorridor,
    IsRailCorridor,
    IsLongThin,
    UprnCount,
    InteriorUprnCount,
    BoundaryUprnCount,
    IsInterior,
    Lon,
    Lat,
}

impl Column {
    pub fn as_str(&self) -> &'static str {
        match self {
            Column::ParcelId => "parcel_id",
            Column::ParcelIds => "parcel_ids",
            Column::Uprn => "uprn",
            Column::Cohort => "cohort",
            Column::Acres => "acres",
            Column::WaterPct => "water_pct",
            Column::LandPct => "land_pct",
            Column::IsOffshore => "is_offshore",
            Column::IsRoadCorridor => "is_road_corridor",
            Column::IsRailCorridor => "is_rail_corridor",
            Column::IsLongThin => "is_long_thin",
            Column::UprnCount => "uprn_count",
            Column::InteriorUprnCount => "interior_uprn_count",
            Column::BoundaryUprnCount => "boundary_uprn_count",
            Column::IsInterior => "is_interior",
            Column::Lon => "lon",
            Column::Lat => "lat",
        }
    }
}

/// A filterable, paginated view over one kind of record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Catalog {
    Parcels,
    AddressPoints,
}

const PARCEL_COLUMNS: &[Column] = &[
    Column::ParcelId,
    Column::Cohort,
    Column::Acres,
    Column::WaterPct,
    Column::LandPct,
    Column::IsOffshore,
    Column::IsRoadCorridor,
    Column::IsRailCorridor,
    Column::IsLongThin,
    Column::UprnCount,
    Column::InteriorUprnCount,
    Column::BoundaryUprnCount,
];

const ADDRESS_POINT_COLUMNS: &[Column] = &[
    Column::Uprn,
    Column::ParcelId,
    Column::ParcelIds,
    Column::Cohort,
    Column::Acres,
    Column::WaterPct,
    Column::LandPct,
    Column::IsOffshore,
    Column::IsRoadCorridor,
    Column::IsRailCorridor,
    Column::IsLongThin,
    Column::IsInterior,
    Column::Lon,
    Column::Lat,
];

impl Catalog {
    /// Short name used in routes and export file names
    pub fn name(&self) -> &'static str {
        match self {
            Catalog::Parcels => "parcels",
            Catalog::AddressPoints => "uprns",
        }
    }

    /// Store relation backing this catalog
    pub fn relation(&self) -> &'static str {
        match self {
            Catalog::Parcels => "parcel_catalog",
            Catalog::AddressPoints => "uprn_catalog",
        }
    }

    /// Unique identifier column, also the paging tiebreaker and export order
    pub fn id_column(&self) -> Column {
        match self {
            Catalog::Parcels => Column::ParcelId,
            Catalog::AddressPoints => Column::Uprn,
        }
    }

    /// Projected columns, in response and CSV header order
    pub fn columns(&self) -> &'static [Column] {
        match self {
            Catalog::Parcels => PARCEL_COLUMNS,
            Catalog::AddressPoints => ADDRESS_POINT_COLUMNS,
        }
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns().contains(&column)
    }
}

/// A row type of a catalog.
///
/// Serde field names match `Column::as_str` so a serialized record can be
/// evaluated against a `Predicate` directly.
pub trait Record:
    Serialize + DeserializeOwned + for<'r> FromRow<'r, PgRow> + Send + Sync + Unpin + 'static
{
    const CATALOG: Catalog;

    /// Value of the catalog's identifier column
    fn id(&self) -> i64;

    /// Field values in `CATALOG.columns()` order, rendered for CSV
    fn csv_fields(&self) -> Vec<String>;
}

/// A land parcel with its derived metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ParcelRecord {
    pub parcel_id: i64,
    #[sqlx(try_from = "String")]
    pub cohort: Cohort,
    pub acres: f64,
    pub water_pct: f64,
    pub land_pct: f64,
    pub is_offshore: bool,
    pub is_road_corridor: bool,
    pub is_rail_corridor: bool,
    pub is_long_thin: bool,
    pub uprn_count: i64,
    pub interior_uprn_count: i64,
    pub boundary_uprn_count: i64,
}

impl ParcelRecord {
    /// Total address points equal interior plus boundary, none negative
    pub fn counts_consistent(&self) -> bool {
        self.interior_uprn_count >= 0
            && self.boundary_uprn_count >= 0
            && self.uprn_count == self.interior_uprn_count + self.boundary_uprn_count
    }
}

impl Record for ParcelRecord {
    const CATALOG: Catalog = Catalog::Parcels;

    fn id(&self) -> i64 {
        self.parcel_id
    }

    fn csv_fields(&self) -> Vec<String> {
        vec![
            self.parcel_id.to_string(),
            self.cohort.as_str().to_string(),
            self.acres.to_string(),
            self.water_pct.to_string(),
            self.land_pct.to_string(),
            self.is_offshore.to_string(),
            self.is_road_corridor.to_string(),
            self.is_rail_corridor.to_string(),
            self.is_long_thin.to_string(),
            self.uprn_count.to_string(),
            self.interior_uprn_count.to_string(),
            self.boundary_uprn_count.to_string(),
        ]
    }
}

/// An address point (UPRN) with the attributes of its owning parcel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AddressPointRecord {
    pub uprn: i64,
    pub parcel_id: i64,
    /// Every parcel the point was matched against
    pub parcel_ids: Vec<i64>,
    #[sqlx(try_from = "String")]
    pub cohort: Cohort,
    pub acres: f64,
    pub water_pct: f64,
    pub land_pct: f64,
    pub is_offshore: bool,
    pub is_road_corridor: bool,
    pub is_rail_corridor: bool,
    pub is_long_thin: bool,
    pub is_interior: bool,
    pub lon: f64,
    pub lat: f64,
}

impl Record for AddressPointRecord {
    const CATALOG: Catalog = Catalog::AddressPoints;

    fn id(&self) -> i64 {
        self.uprn
    }

    fn csv_fields(&self) -> Vec<String> {
        let parcel_ids = self
            .parcel_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(";");

        vec![
            self.uprn.to_string(),
            self.parcel_id.to_string(),
            parcel_ids,
            self.cohort.as_str().to_string(),
            self.acres.to_string(),
            self.water_pct.to_string(),
            self.land_pct.to_string(),
            self.is_offshore.to_string(),
            self.is_road_corridor.to_string(),
            self.is_rail_corridor.to_string(),
            self.is_long_thin.to_string(),
            self.is_interior.to_string(),
            self.lon.to_string(),
            self.lat.to_string(),
        ]
    }
}
