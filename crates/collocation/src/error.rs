//! Error types for the collocation engine.
//!
//! None of these escape [`DayBatchProcessor::process`](crate::DayBatchProcessor::process):
//! dataset failures are turned into [`NoDataReason`](crate::NoDataReason) outcomes there.
//! They surface only from configuration validation and from direct use of the
//! dataset traits.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a [`GridDataset`](crate::GridDataset) or a
/// [`DatasetOpener`](crate::DatasetOpener).
#[derive(Error, Debug)]
pub enum DatasetError {
    /// The file could not be opened or parsed.
    #[error("failed to open dataset {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    /// A required coordinate axis is not present.
    #[error("dataset has no {0} axis")]
    MissingAxis(&'static str),

    /// The requested variable does not exist in the dataset.
    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    /// A cell index falls outside the variable's shape.
    #[error("index {index} out of range for axis {axis} of length {len}")]
    IndexOutOfRange {
        axis: &'static str,
        index: usize,
        len: usize,
    },

    /// Failed to read a value from the underlying storage.
    #[error("failed to read {variable}: {reason}")]
    ReadFailed { variable: String, reason: String },
}

impl DatasetError {
    /// Create an OpenFailed error.
    pub fn open_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::OpenFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a ReadFailed error.
    pub fn read_failed(variable: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ReadFailed {
            variable: variable.into(),
            reason: reason.into(),
        }
    }
}

/// Invalid engine configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("tolerance must be a finite, non-negative number of degrees (got {0})")]
    InvalidTolerance(f64),

    #[error("at least one product must be configured")]
    NoProducts,

    #[error("at most two products can be merged (got {0})")]
    TooManyProducts(usize),

    #[error("product id must not be empty")]
    EmptyProductId,

    #[error("product id {0:?} is configured twice")]
    DuplicateProduct(String),

    #[error("product {0:?} requests no variables")]
    NoVariables(String),

    #[error("output column {column:?} is written by more than one source ({products:?})")]
    ColumnCollision {
        column: String,
        products: Vec<String>,
    },

    #[error("file extension must not be empty")]
    EmptyExtension,
}

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;
