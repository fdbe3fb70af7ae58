//! CLI command implementations

use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::config::AppConfig;
use crate::export::{export_csv, write_csv};
use crate::http_server::HttpServer;
use crate::model::{AddressPointRecord, Catalog, ParcelRecord};
use crate::observability::init_logging;
use crate::query::FilterOptions;
use crate::store::{CatalogStore, PgStore};

use super::args::{Cli, Command};
use super::errors::CliResult;

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    run_command(Cli::parse_args().command)
}

/// Run a command on a fresh runtime
pub fn run_command(command: Command) -> CliResult<()> {
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async move {
        match command {
            Command::Serve { config, port } => serve(config.as_deref(), port).await,
            Command::Export {
                catalog,
                config,
                filters,
            } => {
                let filters = FilterOptions::from(filters);
                export(catalog.into(), config.as_deref(), &filters).await
            }
        }
    })
}

fn load_config(path: Option<&Path>) -> CliResult<AppConfig> {
    let config = AppConfig::load_or_default(path)?;
    init_logging(&config.logging)?;
    info!(
        config = %path.map(|p| p.display().to_string()).unwrap_or_else(|| "defaults".to_string()),
        "configuration loaded"
    );
    Ok(config)
}

/// Serve the API until interrupted
pub async fn serve(config_path: Option<&Path>, port: Option<u16>) -> CliResult<()> {
    let mut config = load_config(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    let store = PgStore::connect_lazy(&config.database)?;
    HttpServer::new(&config, store).start().await?;
    Ok(())
}

/// Export a catalog to stdout
pub async fn export(
    catalog: Catalog,
    config_path: Option<&Path>,
    filters: &FilterOptions,
) -> CliResult<()> {
    let config = load_config(config_path)?;
    let store = PgStore::connect_lazy(&config.database)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let bytes = export_to(
        &store,
        catalog,
        filters,
        config.catalog.export_batch_size,
        &mut out,
    )
    .await?;
    out.flush()?;

    info!(catalog = catalog.name(), bytes, "export written");
    Ok(())
}

/// Write a catalog's CSV export to `writer`, returning the bytes written
pub async fn export_to<S: CatalogStore, W: Write>(
    store: &S,
    catalog: Catalog,
    filters: &FilterOptions,
    batch_size: usize,
    writer: &mut W,
) -> CliResult<u64> {
    let chunks = match catalog {
        Catalog::Parcels => export_csv::<S, ParcelRecord>(store, filters, batch_size),
        Catalog::AddressPoints => export_csv::<S, AddressPointRecord>(store, filters, batch_size),
    };
    Ok(write_csv(chunks, writer).await?)
}
