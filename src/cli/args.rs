//! CLI argument definitions using clap
//!
//! Commands:
//! - landcat serve [--config <path>] [--port <port>]
//! - landcat export <parcels|uprns> [--config <path>] [filters...]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::model::Catalog;
use crate::query::FilterOptions;

/// landcat - a read-only catalog of land parcels and address points
#[derive(Parser, Debug)]
#[command(name = "landcat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the catalog API
    Serve {
        /// Path to configuration file
        #[arg(long, env = "LANDCAT_CONFIG")]
        config: Option<PathBuf>,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Write a catalog export as CSV to stdout
    Export {
        #[arg(value_enum)]
        catalog: ExportTarget,

        /// Path to configuration file
        #[arg(long, env = "LANDCAT_CONFIG")]
        config: Option<PathBuf>,

        #[command(flatten)]
        filters: FilterArgs,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportTarget {
    Parcels,
    Uprns,
}

impl From<ExportTarget> for Catalog {
    fn from(target: ExportTarget) -> Self {
        match target {
            ExportTarget::Parcels => Catalog::Parcels,
            ExportTarget::Uprns => Catalog::AddressPoints,
        }
    }
}

fn finite(value: &str) -> Result<f64, String> {
    match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(format!("'{}' is not a finite number", value)),
    }
}

/// The same filters the HTTP catalogs accept
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    #[arg(long, value_parser = finite)]
    pub min_acres: Option<f64>,
    #[arg(long, value_parser = finite)]
    pub max_acres: Option<f64>,

    /// Minimum total address points (parcels only)
    #[arg(long)]
    pub min_uprns: Option<i64>,
    #[arg(long)]
    pub max_uprns: Option<i64>,

    /// Minimum interior address points (parcels only)
    #[arg(long)]
    pub min_interior_uprns: Option<i64>,
    #[arg(long)]
    pub max_interior_uprns: Option<i64>,

    #[arg(long, value_parser = finite)]
    pub min_water_pct: Option<f64>,
    #[arg(long, value_parser = finite)]
    pub max_water_pct: Option<f64>,
    #[arg(long, value_parser = finite)]
    pub min_land_pct: Option<f64>,
    #[arg(long, value_parser = finite)]
    pub max_land_pct: Option<f64>,

    #[arg(long)]
    pub exclude_offshore: bool,
    #[arg(long)]
    pub exclude_road: bool,
    #[arg(long)]
    pub exclude_rail: bool,
    #[arg(long)]
    pub exclude_long_thin: bool,

    /// Include the excluded cohort
    #[arg(long)]
    pub include_excluded: bool,
}

impl From<FilterArgs> for FilterOptions {
    fn from(args: FilterArgs) -> Self {
        FilterOptions {
            min_acres: args.min_acres,
            max_acres: args.max_acres,
            min_uprns: args.min_uprns,
            max_uprns: args.max_uprns,
            min_interior_uprns: args.min_interior_uprns,
            max_interior_uprns: args.max_interior_uprns,
            min_water_pct: args.min_water_pct,
            max_water_pct: args.max_water_pct,
            min_land_pct: args.min_land_pct,
            max_land_pct: args.max_land_pct,
            exclude_offshore: args.exclude_offshore,
            exclude_road: args.exclude_road,
            exclude_rail: args.exclude_rail,
            exclude_long_thin: args.exclude_long_thin,
            include_excluded: args.include_excluded,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_export_with_filters() {
        let cli = Cli::try_parse_from([
            "landcat",
            "export",
            "parcels",
            "--min-acres",
            "1.5",
            "--exclude-offshore",
        ])
        .unwrap();

        match cli.command {
            Command::Export {
                catalog, filters, ..
            } => {
                assert_eq!(catalog, ExportTarget::Parcels);
                let options = FilterOptions::from(filters);
                assert_eq!(options.min_acres, Some(1.5));
                assert!(options.exclude_offshore);
                assert!(!options.include_excluded);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_filter_rejected() {
        let result = Cli::try_parse_from(["landcat", "export", "uprns", "--min-acres", "NaN"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_serve_port_override() {
        let cli = Cli::try_parse_from(["landcat", "serve", "--port", "9000"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Serve {
                port: Some(9000),
                ..
            }
        ));
    }
}
