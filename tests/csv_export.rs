//! CSV Export Tests
//!
//! Streaming export of whole catalogs:
//! - Row count equals the count query for the same filters
//! - Header matches the catalog columns exactly
//! - Booleans render only as "true" / "false"
//! - A store failure mid-export ends the stream with an error

mod common;

use futures_util::{StreamExt, TryStreamExt};
use landcat::export::{csv_header, export_csv, CsvStream, ExportError};
use landcat::model::{AddressPointRecord, Catalog, Cohort, ParcelRecord};
use landcat::query::{FilterOptions, Predicate};
use landcat::store::{CatalogStore, StoreError};

use common::fixture_store;

async fn collect_csv(stream: CsvStream) -> String {
    let chunks: Vec<Vec<u8>> = stream.try_collect().await.unwrap();
    String::from_utf8(chunks.concat()).unwrap()
}

fn parse(text: &str) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let header = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (header, rows)
}

#[tokio::test]
async fn test_row_count_matches_count_query() {
    let store = fixture_store();
    let combinations = vec![
        FilterOptions::default(),
        FilterOptions {
            min_acres: Some(1.0),
            exclude_offshore: true,
            ..Default::default()
        },
        FilterOptions {
            include_excluded: true,
            ..Default::default()
        },
    ];

    for filters in combinations {
        let text = collect_csv(export_csv::<_, ParcelRecord>(&store, &filters, 3)).await;
        let (_, rows) = parse(&text);

        let count = store
            .count::<ParcelRecord>(&Predicate::build(&filters, Catalog::Parcels))
            .await
            .unwrap();
        assert_eq!(rows.len() as u64, count, "{:?}", filters);
    }
}

#[tokio::test]
async fn test_header_exact() {
    let store = fixture_store();

    let filters = FilterOptions::default();

    let text = collect_csv(export_csv::<_, ParcelRecord>(&store, &filters, 10)).await;
    assert_eq!(
        text.lines().next().unwrap(),
        "parcel_id,cohort,acres,water_pct,land_pct,is_offshore,is_road_corridor,\
         is_rail_corridor,is_long_thin,uprn_count,interior_uprn_count,boundary_uprn_count"
    );

    let text = collect_csv(export_csv::<_, AddressPointRecord>(&store, &filters, 10)).await;
    let (header, _) = parse(&text);
    assert_eq!(header, csv_header(Catalog::AddressPoints));
}

#[tokio::test]
async fn test_booleans_render_literally() {
    let store = fixture_store();
    let filters = FilterOptions {
        include_excluded: true,
        ..Default::default()
    };

    let text = collect_csv(export_csv::<_, AddressPointRecord>(&store, &filters, 10)).await;
    let (header, rows) = parse(&text);

    let flag_columns: Vec<usize> = header
        .iter()
        .enumerate()
        .filter(|(_, name)| name.starts_with("is_"))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(flag_columns.len(), 5);

    for row in &rows {
        for &i in &flag_columns {
            assert!(row[i] == "true" || row[i] == "false", "{:?}", row);
        }
    }
}

#[tokio::test]
async fn test_export_in_identifier_order_with_joined_parcel_ids() {
    let store = fixture_store();

    let filters = FilterOptions::default();
    let text = collect_csv(export_csv::<_, AddressPointRecord>(&store, &filters, 2)).await;
    let (_, rows) = parse(&text);

    let uprns: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(uprns, vec!["101", "102", "103", "104", "201", "202", "501"]);

    let row = rows.iter().find(|r| r[0] == "501").unwrap();
    assert_eq!(row[2], "5;7");
}

/// A large export spans several chunks and still arrives whole.
#[tokio::test]
async fn test_large_export_is_complete() {
    let parcels: Vec<ParcelRecord> = (1..=1_234)
        .map(|id| common::parcel(id, Cohort::BareLand, id as f64))
        .collect();
    let store = landcat::store::MemoryStore::new().with_parcels(parcels);

    let filters = FilterOptions::default();
    let chunks: Vec<Vec<u8>> = export_csv::<_, ParcelRecord>(&store, &filters, 100)
        .try_collect()
        .await
        .unwrap();
    assert!(chunks.len() > 2);

    let (_, rows) = parse(&String::from_utf8(chunks.concat()).unwrap());
    assert_eq!(rows.len(), 1_234);
    assert_eq!(rows.last().unwrap()[0], "1234");
}

/// A failing store never yields a clean, truncated file.
#[tokio::test]
async fn test_mid_export_failure_ends_with_error() {
    let store = fixture_store().fail_export_after(3);

    let items: Vec<Result<Vec<u8>, ExportError>> =
        export_csv::<_, AddressPointRecord>(&store, &FilterOptions::default(), 10)
            .collect()
            .await;

    assert!(items.len() >= 2);
    assert!(items.first().unwrap().is_ok(), "header comes first");
    assert!(matches!(
        items.last().unwrap(),
        Err(ExportError::Store(StoreError::Unavailable(_)))
    ));
}
