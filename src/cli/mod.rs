//! CLI module for landcat
//!
//! Provides command-line interface for:
//! - serve: Run the catalog API
//! - export: Stream a catalog as CSV to stdout

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command, ExportTarget, FilterArgs};
pub use commands::{export, export_to, run, run_command, serve};
pub use errors::{CliError, CliResult};
