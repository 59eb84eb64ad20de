//! Sample collocation service.
//!
//! Reads a CSV table of dated sample positions, collocates every sample with
//! the configured daily gridded products and writes the table back out with
//! one column per extracted variable.

pub mod cli;
pub mod config;
pub mod table;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use collocation::{DatasetOpener, DayBatchProcessor, RunSummary};
use tracing::{info, warn};

pub use cli::{Args, LogFormat};
pub use config::{load_service_config, ColumnNames, RunSettings, ServiceConfig};
pub use table::SampleTable;

/// Run one collocation job end to end.
///
/// Configuration and input problems are fatal. Per-day problems (missing or
/// unreadable files, absent variables) only produce "no data" cells and are
/// reported in the returned summary.
pub fn run<O: DatasetOpener>(settings: &RunSettings, opener: O) -> Result<RunSummary> {
    let processor = DayBatchProcessor::new(&settings.collocation, opener)
        .context("Invalid collocation configuration")?;

    let mut table = SampleTable::read(&settings.input, &settings.columns)?;
    info!(
        input = %settings.input.display(),
        samples = table.len(),
        "Loaded sample table"
    );

    let summary = processor.process(table.samples_mut());

    let columns = settings.collocation.output_columns();
    table.write(&settings.output_csv, &columns, &settings.no_data_marker)?;
    info!(
        output = %settings.output_csv.display(),
        columns = columns.len(),
        "Wrote collocated table"
    );

    if let Some(path) = &settings.summary_json {
        write_summary(path, &summary)?;
        info!(path = %path.display(), "Wrote run summary");
    }

    log_summary(&summary);
    Ok(summary)
}

/// Write the run summary as pretty-printed JSON.
pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create summary directory {:?}", parent))?;
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create summary file {:?}", path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), summary)
        .with_context(|| format!("Failed to write summary {:?}", path))?;
    Ok(())
}

fn log_summary(summary: &RunSummary) {
    for product in &summary.products {
        info!(
            product = %product.id,
            days_opened = product.days_opened,
            days_without_file = product.days_without_file,
            days_open_failed = product.days_open_failed,
            accepted = product.accepted,
            rejected = product.rejected,
            "Product summary"
        );
        for (variable, days) in &product.absent_variable_days {
            warn!(
                product = %product.id,
                variable = %variable,
                days,
                "Variable absent from product files"
            );
        }
    }
    info!(
        samples = summary.samples,
        day_groups = summary.day_groups,
        processed = summary.groups_processed,
        cancelled = summary.cancelled,
        "Collocation complete"
    );
}
