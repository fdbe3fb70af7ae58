//! # Bulk Export
//!
//! Memory-bounded CSV export of a whole catalog.

pub mod stream;

pub use stream::{
    csv_header, export_csv, write_csv, CsvStream, ExportError, CHUNK_ROWS,
    DEFAULT_EXPORT_BATCH_SIZE,
};
