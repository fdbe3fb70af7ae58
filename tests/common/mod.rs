//! Shared fixtures for the integration tests.
//!
//! Eleven parcels and eight address points, laid out so that:
//! - parcels 1-5 are the only ones with `acres >= 1.0` that are neither
//!   offshore nor excluded
//! - parcel 1 is a 100 x 100 square with two interior and two boundary points
//! - parcel 2 is a 100 x 8 strip that erodes to nothing at a 5 unit margin
//! - parcels 8-11 are excluded for assorted overlapping reasons

#![allow(dead_code)]

use geo_types::{coord, polygon, Coord, Polygon};
use landcat::model::{AddressPointRecord, Cohort, ParcelRecord};
use landcat::store::MemoryStore;

pub fn parcel(parcel_id: i64, cohort: Cohort, acres: f64) -> ParcelRecord {
    ParcelRecord {
        parcel_id,
        cohort,
        acres,
        water_pct: 0.0,
        land_pct: 100.0,
        is_offshore: false,
        is_road_corridor: false,
        is_rail_corridor: false,
        is_long_thin: false,
        uprn_count: 0,
        interior_uprn_count: 0,
        boundary_uprn_count: 0,
    }
}

fn with_points(mut p: ParcelRecord, interior: i64, boundary: i64) -> ParcelRecord {
    p.uprn_count = interior + boundary;
    p.interior_uprn_count = interior;
    p.boundary_uprn_count = boundary;
    p
}

pub fn parcels() -> Vec<ParcelRecord> {
    vec![
        with_points(parcel(1, Cohort::DispersedEstate, 2.5), 2, 2),
        with_points(parcel(2, Cohort::DispersedEstate, 1.0), 0, 2),
        ParcelRecord {
            water_pct: 20.0,
            land_pct: 80.0,
            ..parcel(3, Cohort::BareLand, 4.0)
        },
        ParcelRecord {
            is_road_corridor: true,
            ..parcel(4, Cohort::BareLand, 10.0)
        },
        with_points(parcel(5, Cohort::SingleHolding, 1.2), 0, 1),
        ParcelRecord {
            is_offshore: true,
            land_pct: 40.0,
            water_pct: 60.0,
            ..parcel(6, Cohort::BareLand, 3.0)
        },
        parcel(7, Cohort::BareLand, 0.5),
        ParcelRecord {
            water_pct: 70.0,
            land_pct: 30.0,
            is_road_corridor: true,
            ..with_points(parcel(8, Cohort::Excluded, 6.0), 0, 1)
        },
        ParcelRecord {
            is_offshore: true,
            land_pct: 5.0,
            water_pct: 95.0,
            ..parcel(9, Cohort::Excluded, 12.0)
        },
        parcel(10, Cohort::Excluded, 0.8),
        ParcelRecord {
            is_rail_corridor: true,
            is_long_thin: true,
            ..parcel(11, Cohort::Excluded, 1.5)
        },
    ]
}

pub fn find_parcel(parcel_id: i64) -> ParcelRecord {
    parcels()
        .into_iter()
        .find(|p| p.parcel_id == parcel_id)
        .unwrap()
}

/// Projected position to lon/lat, good enough for assertions
pub fn lon_lat(position: Coord<f64>) -> (f64, f64) {
    (-1.0 + position.x / 100_000.0, 52.0 + position.y / 100_000.0)
}

pub fn point_on(
    owner: &ParcelRecord,
    uprn: i64,
    parcel_ids: Vec<i64>,
    is_interior: bool,
    position: Coord<f64>,
) -> AddressPointRecord {
    let (lon, lat) = lon_lat(position);
    AddressPointRecord {
        uprn,
        parcel_id: owner.parcel_id,
        parcel_ids,
        cohort: owner.cohort,
        acres: owner.acres,
        water_pct: owner.water_pct,
        land_pct: owner.land_pct,
        is_offshore: owner.is_offshore,
        is_road_corridor: owner.is_road_corridor,
        is_rail_corridor: owner.is_rail_corridor,
        is_long_thin: owner.is_long_thin,
        is_interior,
        lon,
        lat,
    }
}

/// `(uprn, owning parcel, other parcels, interior, position)`
pub fn point_layout() -> Vec<(i64, i64, Vec<i64>, bool, Coord<f64>)> {
    vec![
        (101, 1, vec![1], true, coord! { x: 50.0, y: 50.0 }),
        (102, 1, vec![1], false, coord! { x: 2.0, y: 50.0 }),
        (103, 1, vec![1], false, coord! { x: 99.0, y: 99.0 }),
        (104, 1, vec![1], true, coord! { x: 90.0, y: 50.0 }),
        (201, 2, vec![2], false, coord! { x: 250.0, y: 4.0 }),
        (202, 2, vec![2], false, coord! { x: 210.0, y: 4.0 }),
        (501, 5, vec![5, 7], false, coord! { x: 500.0, y: 500.0 }),
        (801, 8, vec![8], false, coord! { x: 800.0, y: 800.0 }),
    ]
}

pub fn address_points() -> Vec<AddressPointRecord> {
    point_layout()
        .into_iter()
        .map(|(uprn, owner, parcel_ids, interior, position)| {
            point_on(&find_parcel(owner), uprn, parcel_ids, interior, position)
        })
        .collect()
}

pub fn square_footprint() -> Polygon<f64> {
    polygon![
        (x: 0.0, y: 0.0),
        (x: 100.0, y: 0.0),
        (x: 100.0, y: 100.0),
        (x: 0.0, y: 100.0),
    ]
}

pub fn strip_footprint() -> Polygon<f64> {
    polygon![
        (x: 200.0, y: 0.0),
        (x: 300.0, y: 0.0),
        (x: 300.0, y: 8.0),
        (x: 200.0, y: 8.0),
    ]
}

/// Fixture store without any precomputed relations
pub fn fixture_store() -> MemoryStore {
    let mut store = MemoryStore::new()
        .with_parcels(parcels())
        .with_address_points(address_points())
        .with_footprint(1, square_footprint())
        .with_footprint(2, strip_footprint());

    for (uprn, _, _, _, position) in point_layout() {
        store = store.with_position(uprn, position);
    }
    store
}

/// Interior join the batch pipeline would have built at a 5 unit margin
pub fn interior_join() -> Vec<(i64, i64)> {
    vec![(1, 101), (1, 104)]
}
