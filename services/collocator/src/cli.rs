//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use collocation::CandidateOrder;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "collocator")]
#[command(about = "Collocate dated sample positions with daily gridded NetCDF products")]
pub struct Args {
    /// YAML configuration file; command-line flags override its values
    #[arg(short, long, env = "COLLOCATOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Input CSV table with sample dates and positions
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Base directory of the primary product (organized by year)
    #[arg(long, alias = "plankton-base-dir")]
    pub primary_base_dir: Option<PathBuf>,

    /// Identifier of the primary product [default: plankton]
    #[arg(long)]
    pub primary_id: Option<String>,

    /// Variables to extract from the primary product (overrides the preset)
    #[arg(long, alias = "plankton-vars", num_args = 1..)]
    pub primary_vars: Vec<String>,

    /// Base directory of the optional secondary product
    #[arg(long, alias = "optics-base-dir")]
    pub secondary_base_dir: Option<PathBuf>,

    /// Identifier of the secondary product [default: optics]
    #[arg(long)]
    pub secondary_id: Option<String>,

    /// Variables to extract from the secondary product (overrides the preset)
    #[arg(long, alias = "optics-vars", num_args = 1..)]
    pub secondary_vars: Vec<String>,

    /// Output CSV file path
    #[arg(long)]
    pub output_csv: Option<PathBuf>,

    /// Write the run summary as JSON to this path
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Nearest-neighbour tolerance in degrees [default: 0.05]
    #[arg(long)]
    pub tol_deg: Option<f64>,

    /// Name of the year column [default: Year]
    #[arg(long)]
    pub year_col: Option<String>,

    /// Name of the month column [default: Month]
    #[arg(long)]
    pub month_col: Option<String>,

    /// Name of the day column [default: Day]
    #[arg(long)]
    pub day_col: Option<String>,

    /// Name of the latitude column [default: LATITUDE]
    #[arg(long)]
    pub lat_col: Option<String>,

    /// Name of the longitude column [default: LONGITUDE]
    #[arg(long)]
    pub lon_col: Option<String>,

    /// Order in which candidate files of a day are tried (priority, name)
    #[arg(long, value_parser = parse_candidate_order)]
    pub candidate_order: Option<CandidateOrder>,

    /// Process day-groups in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Text written to cells without data [default: NaN]
    #[arg(long)]
    pub no_data_marker: Option<String>,

    /// Log level, used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

fn parse_candidate_order(s: &str) -> Result<CandidateOrder, String> {
    CandidateOrder::from_str(s)
        .ok_or_else(|| format!("unknown candidate order '{}' (expected priority or name)", s))
}
