//! Command-line interface for `GeoWriter`, the vector geodata export engine.
//!
//! This binary exposes the format registry of [`geowriter_core`]: which
//! formats the engine knows, their creation options and defaults, and the
//! file dialog filters of the formats the bundled drivers can write.
//!
//! # Available Commands
//!
//! - `drivers` - List every known format and whether it can be written
//! - `options` - Show the creation options of one format
//! - `filters` - Print file filters for the writable formats

mod display;

use std::collections::BTreeSet;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use tracing::{Level, debug, info};
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use geowriter_core::drivers::DriverRegistry;
use geowriter_core_common::DriverService;
use geowriter_driver_geojson::GeoJsonDriverService;

use crate::display::FilterRow;

#[derive(Parser)]
#[command(
    name = "geowriter",
    version,
    about = "Vector geodata export engine in Rust",
    long_about = "GeoWriter maps layer schemas, harmonizes geometries and exports \
                  feature styles into OGR-style output formats."
)]
/// Command-line arguments and options for the `GeoWriter` CLI.
struct Cli {
    /// Enable verbose (INFO level) logging output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug (DEBUG level) logging output with detailed diagnostics.
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the `GeoWriter` CLI.
#[derive(Subcommand)]
enum Commands {
    /// Lists every format in the registry.
    ///
    /// The `Write` column tells whether a bundled driver can create
    /// datasets of that format.
    Drivers,

    /// Shows the dataset and layer creation options of a format.
    Options {
        /// Format name or prefix (case-sensitive, e.g. "`GeoJ`", "`ESRI`").
        #[arg(value_name = "FORMAT")]
        format: String,
    },

    /// Prints file dialog filters for the writable formats.
    Filters,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // Bridge logs from the `log` crate to the `tracing` ecosystem.
    LogTracer::init()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let registry = DriverRegistry::new();
    let service = GeoJsonDriverService::new();

    match cli.command {
        Commands::Drivers => handle_drivers(&registry, &service),
        Commands::Options { format } => {
            info!("Displaying options for {format}");
            handle_options(&registry, &format)?;
        },
        Commands::Filters => handle_filters(&registry, &service),
    }

    Ok(())
}

/// Long names of the catalog entries that `service` can write.
fn writable_long_names(registry: &DriverRegistry, service: &dyn DriverService) -> BTreeSet<String> {
    registry
        .writable_formats(service)
        .values()
        .filter_map(|name| registry.lookup(name))
        .map(|meta| meta.long_name.clone())
        .collect()
}

fn handle_drivers(registry: &DriverRegistry, service: &dyn DriverService) {
    let writable = writable_long_names(registry, service);
    debug!("Writable formats: {writable:?}");
    display::display_drivers(registry, &writable);
}

/// Handles the `options` subcommand.
///
/// # Errors
///
/// Returns an error when no format matches `format`.
fn handle_options(registry: &DriverRegistry, format: &str) -> Result<()> {
    let meta = registry
        .lookup(format)
        .ok_or_else(|| anyhow!("Format '{format}' not found."))?;

    display::display_options(
        format,
        meta,
        &registry.default_dataset_options(format),
        &registry.default_layer_options(format),
    );
    Ok(())
}

fn handle_filters(registry: &DriverRegistry, service: &dyn DriverService) {
    let rows: Vec<FilterRow> = registry
        .supported_filters_and_formats(service)
        .into_iter()
        .map(|(filter, driver)| FilterRow { filter, driver })
        .collect();
    display::display_filters(rows, &registry.file_filter_string(service));
}
