//! # CSV Export
//!
//! Streams a whole filtered catalog as CSV. Rows are pulled from a store
//! cursor and encoded a chunk at a time, so memory stays bounded by the
//! cursor batch and the chunk, never by the result size.
//!
//! A store failure mid-export surfaces as an error item on the stream. HTTP
//! transports turn that into an aborted response rather than a clean end of
//! file, so a truncated export is never mistaken for a complete one.

use futures_util::stream::{self, BoxStream};
use futures_util::{StreamExt, TryStreamExt};
use thiserror::Error;
use tracing::info;

use crate::model::{Catalog, Record};
use crate::query::{FilterOptions, Predicate};
use crate::store::{CatalogStore, RowStream, StoreError};

/// Rows fetched per cursor round trip
pub const DEFAULT_EXPORT_BATCH_SIZE: usize = 10_000;

/// Rows encoded per emitted chunk
pub const CHUNK_ROWS: usize = 500;

/// Export failures
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A stream of encoded CSV chunks, header first
pub type CsvStream = BoxStream<'static, Result<Vec<u8>, ExportError>>;

/// Header row of a catalog's export
pub fn csv_header(catalog: Catalog) -> Vec<&'static str> {
    catalog.columns().iter().map(|c| c.as_str()).collect()
}

fn encode<I>(records: I) -> Result<Vec<u8>, ExportError>
where
    I: IntoIterator,
    I::Item: IntoIterator,
    <I::Item as IntoIterator>::Item: AsRef<[u8]>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.write_record(record)?;
    }
    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

struct ExportState<R> {
    rows: RowStream<R>,
    header: Option<Vec<&'static str>>,
    written: u64,
    done: bool,
    catalog: Catalog,
}

/// Export every row of `R`'s catalog matching `filters`, identifier ascending
pub fn export_csv<S, R>(store: &S, filters: &FilterOptions, batch_size: usize) -> CsvStream
where
    S: CatalogStore,
    R: Record,
{
    let predicate = Predicate::build(filters, R::CATALOG);
    let state = ExportState {
        rows: store.export::<R>(predicate, batch_size),
        header: Some(csv_header(R::CATALOG)),
        written: 0,
        done: false,
        catalog: R::CATALOG,
    };

    stream::try_unfold(state, next_chunk).boxed()
}

async fn next_chunk<R: Record>(
    mut state: ExportState<R>,
) -> Result<Option<(Vec<u8>, ExportState<R>)>, ExportError> {
    if let Some(header) = state.header.take() {
        let chunk = encode([header])?;
        return Ok(Some((chunk, state)));
    }

    if state.done {
        return Ok(None);
    }

    let mut batch = Vec::with_capacity(CHUNK_ROWS);
    while batch.len() < CHUNK_ROWS {
        match state.rows.try_next().await? {
            Some(row) => batch.push(row.csv_fields()),
            None => {
                state.done = true;
                break;
            }
        }
    }

    if batch.is_empty() {
        info!(
            catalog = state.catalog.name(),
            rows = state.written,
            "export complete"
        );
        return Ok(None);
    }

    state.written += batch.len() as u64;
    let chunk = encode(batch)?;
    Ok(Some((chunk, state)))
}

/// Drain an export into any writer. Used by the CLI.
pub async fn write_csv<W: std::io::Write>(
    mut chunks: CsvStream,
    writer: &mut W,
) -> Result<u64, ExportError> {
    let mut bytes = 0u64;
    while let Some(chunk) = chunks.try_next().await? {
        writer.write_all(&chunk)?;
        bytes += chunk.len() as u64;
    }
    writer.flush()?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_matches_columns() {
        assert_eq!(
            csv_header(Catalog::Parcels),
            vec![
                "parcel_id",
                "cohort",
                "acres",
                "water_pct",
                "land_pct",
                "is_offshore",
                "is_road_corridor",
                "is_rail_corridor",
                "is_long_thin",
                "uprn_count",
                "interior_uprn_count",
                "boundary_uprn_count",
            ]
        );
        assert_eq!(csv_header(Catalog::AddressPoints)[0], "uprn");
    }

    #[test]
    fn test_encode_quotes_when_needed() {
        let chunk = encode([vec!["a,b".to_string(), "plain".to_string()]]).unwrap();
        assert_eq!(String::from_utf8(chunk).unwrap(), "\"a,b\",plain\n");
    }
}
