//! Core types for sample collocation.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Why a requested variable has no value for a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoDataReason {
    /// No file for the sample's day could be found or opened.
    ProductUnavailable,
    /// The opened dataset does not contain the variable.
    VariableAbsent,
    /// The nearest grid cell is farther than the configured tolerance.
    OutOfTolerance,
    /// The cell holds a masked or non-finite value, or could not be read.
    InvalidReadValue,
}

impl NoDataReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductUnavailable => "product_unavailable",
            Self::VariableAbsent => "variable_absent",
            Self::OutOfTolerance => "out_of_tolerance",
            Self::InvalidReadValue => "invalid_read_value",
        }
    }
}

impl fmt::Display for NoDataReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of extracting one variable for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extracted {
    /// A finite value read from the grid.
    Value(f64),
    /// No value, with the reason.
    NoData(NoDataReason),
}

impl Extracted {
    /// The numeric value, if any.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::NoData(_) => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData(_))
    }

    /// The no-data reason, if this is not a value.
    pub fn reason(&self) -> Option<NoDataReason> {
        match self {
            Self::Value(_) => None,
            Self::NoData(reason) => Some(*reason),
        }
    }
}

/// One point observation to be matched against gridded data.
///
/// The engine reads `date`, `lat` and `lon` and only ever writes into
/// `outputs`, under the column names it was asked to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Stable row index in the caller's table.
    pub row: usize,
    /// Calendar day of the observation (no time-of-day).
    pub date: NaiveDate,
    /// Latitude in degrees north.
    pub lat: f64,
    /// Longitude in degrees east, in any domain.
    pub lon: f64,
    /// Output column name to extracted outcome.
    pub outputs: BTreeMap<String, Extracted>,
}

impl SampleRecord {
    pub fn new(row: usize, date: NaiveDate, lat: f64, lon: f64) -> Self {
        Self {
            row,
            date,
            lat,
            lon,
            outputs: BTreeMap::new(),
        }
    }

    /// Look up an output column.
    pub fn output(&self, column: &str) -> Option<&Extracted> {
        self.outputs.get(column)
    }

    /// Numeric value of an output column, if present and not "no data".
    pub fn value(&self, column: &str) -> Option<f64> {
        self.outputs.get(column).and_then(Extracted::value)
    }
}

/// Grid indices addressing one cell of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellIndex {
    pub lat: usize,
    pub lon: usize,
    /// Time slice, or `None` when the dataset has no time axis.
    pub time: Option<usize>,
}

/// Result of matching one sample against one dataset's axes.
///
/// Lives only for the duration of the extraction step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedCell {
    pub lat_index: usize,
    pub lon_index: usize,
    /// Absolute latitude difference to the chosen cell (degrees).
    pub lat_diff: f64,
    /// Circular longitude difference to the chosen cell (degrees).
    pub lon_diff: f64,
    /// Whether both differences are within tolerance.
    pub accepted: bool,
}

impl ResolvedCell {
    /// Attach a time slice to produce an addressable cell.
    pub fn at_time(&self, time: TimeIndex) -> CellIndex {
        CellIndex {
            lat: self.lat_index,
            lon: self.lon_index,
            time: time.index(),
        }
    }
}

/// Time slice selected for a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeIndex {
    /// The dataset has no time axis; indexing skips the time dimension.
    None,
    Index(usize),
}

impl TimeIndex {
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::None => None,
            Self::Index(i) => Some(*i),
        }
    }
}
