//! The gridded dataset abstraction.
//!
//! A [`GridDataset`] exposes 1-D latitude and longitude axes, an optional
//! time axis and named variables addressable by [`CellIndex`]. File formats
//! plug in through [`DatasetOpener`]; the engine itself never touches a file
//! library.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::CellIndex;

/// Longitude convention used by a dataset's longitude axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LonDomain {
    /// -180..180
    Signed,
    /// 0..360
    Unsigned,
}

impl LonDomain {
    /// Infer the domain from a longitude axis.
    ///
    /// The axis is unsigned when all its values are >= 0 and at least one
    /// exceeds 180. NaN entries are ignored; an axis with no finite values
    /// is treated as signed.
    pub fn infer(axis: &[f64]) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in axis.iter().filter(|v| !v.is_nan()) {
            min = min.min(v);
            max = max.max(v);
        }
        if min >= 0.0 && max > 180.0 {
            Self::Unsigned
        } else {
            Self::Signed
        }
    }

    /// Map a longitude into this domain.
    pub fn normalize(&self, lon: f64) -> f64 {
        match self {
            Self::Signed => (lon + 180.0).rem_euclid(360.0) - 180.0,
            Self::Unsigned => lon.rem_euclid(360.0),
        }
    }
}

/// An opened raster product.
///
/// Implementations own whatever file handle backs them; dropping the value
/// closes it.
pub trait GridDataset {
    /// Latitude axis values (degrees).
    fn latitudes(&self) -> &[f64];

    /// Longitude axis values (degrees), in either domain.
    fn longitudes(&self) -> &[f64];

    /// Time axis values. Empty when the dataset has no time axis.
    fn times(&self) -> &[DateTime<Utc>];

    /// Whether a data variable with this name exists.
    fn has_variable(&self, name: &str) -> bool;

    /// Read a variable at a cell.
    ///
    /// Returns `Ok(None)` for a masked (fill/missing) value. Values are
    /// returned exactly as stored after the dataset's own scale/offset.
    fn read(&self, variable: &str, cell: &CellIndex) -> Result<Option<f64>>;

    /// Longitude domain inferred from the longitude axis.
    fn lon_domain(&self) -> LonDomain {
        LonDomain::infer(self.longitudes())
    }
}

/// Opens files into datasets.
///
/// Any error is treated by the engine the same way as a missing file.
pub trait DatasetOpener: Sync {
    type Dataset: GridDataset;

    fn open(&self, path: &Path) -> Result<Self::Dataset>;
}

impl<O: DatasetOpener> DatasetOpener for &O {
    type Dataset = O::Dataset;

    fn open(&self, path: &Path) -> Result<Self::Dataset> {
        (**self).open(path)
    }
}
