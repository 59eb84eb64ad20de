//! Sample collocation command-line tool.
//!
//! Collocates a CSV table of dated sample positions with daily NetCDF
//! products organized as `<base>/<YYYY>/*YYYYMMDD*.nc`.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use collocator::{load_service_config, Args, LogFormat, RunSettings, ServiceConfig};
use netcdf_parser::{silence_hdf5_errors, NetCdfOpener};

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    match args.log_format {
        LogFormat::Json => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .json()
            .init(),
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .init(),
    }

    let file_config = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration file");
            load_service_config(path)?
        }
        None => ServiceConfig::default(),
    };
    let settings = RunSettings::resolve(&args, file_config)?;

    info!(
        products = ?settings
            .collocation
            .products
            .iter()
            .map(|p| p.id.as_str())
            .collect::<Vec<_>>(),
        tolerance_deg = settings.collocation.tolerance_deg,
        parallel = settings.collocation.parallel,
        "Starting sample collocation"
    );

    silence_hdf5_errors();
    collocator::run(&settings, NetCdfOpener)?;

    Ok(())
}
