//! Error types for NetCDF reading.

use std::path::Path;

use collocation::DatasetError;
use thiserror::Error;

/// Result type for NetCDF reader operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF reading.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// Error reported by libnetcdf
    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),

    /// No coordinate variable for a required axis
    #[error("no {0} axis found")]
    MissingAxis(&'static str),

    /// A coordinate variable that is not 1-D
    #[error("axis variable {0} is not one-dimensional")]
    NotOneDimensional(String),

    /// Time axis with several steps whose units cannot be decoded
    #[error("cannot decode time axis {variable} (units: {units:?})")]
    UndecodableTime {
        variable: String,
        units: Option<String>,
    },
}

impl NetCdfError {
    /// Convert into the engine's error type for a file at `path`.
    pub fn into_dataset_error(self, path: &Path) -> DatasetError {
        match self {
            Self::MissingAxis(axis) => DatasetError::MissingAxis(axis),
            other => DatasetError::open_failed(path, other.to_string()),
        }
    }
}
