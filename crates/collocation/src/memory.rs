//! In-memory grid datasets.
//!
//! Useful for callers that assemble grids themselves and for exercising the
//! engine without a file library.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::dataset::{DatasetOpener, GridDataset};
use crate::error::{DatasetError, Result};
use crate::types::CellIndex;

/// A variable held in memory, row-major as `[time][lat][lon]` or `[lat][lon]`.
#[derive(Debug, Clone)]
pub struct MemoryVariable {
    data: Vec<f64>,
    /// Time steps the data was built for; `None` for `[lat][lon]` variables.
    steps: Option<usize>,
    fill_value: Option<f64>,
}

/// A [`GridDataset`] backed by vectors.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    lat: Vec<f64>,
    lon: Vec<f64>,
    time: Vec<DateTime<Utc>>,
    variables: HashMap<String, MemoryVariable>,
}

impl MemoryDataset {
    /// Create a dataset with the given axes and no time axis.
    pub fn new(lat: Vec<f64>, lon: Vec<f64>) -> Self {
        Self {
            lat,
            lon,
            time: Vec::new(),
            variables: HashMap::new(),
        }
    }

    /// Set the time axis.
    pub fn with_times(mut self, time: Vec<DateTime<Utc>>) -> Self {
        self.time = time;
        self
    }

    /// Add a 2-D `[lat][lon]` variable.
    ///
    /// # Panics
    /// If `data.len()` does not equal `lat.len() * lon.len()`.
    pub fn with_variable(mut self, name: impl Into<String>, data: Vec<f64>) -> Self {
        assert_eq!(
            data.len(),
            self.lat.len() * self.lon.len(),
            "2-D variable must have lat * lon values"
        );
        self.variables.insert(
            name.into(),
            MemoryVariable {
                data,
                steps: None,
                fill_value: None,
            },
        );
        self
    }

    /// Add a 3-D `[time][lat][lon]` variable.
    ///
    /// # Panics
    /// If `data.len()` does not equal `time.len() * lat.len() * lon.len()`.
    pub fn with_time_variable(mut self, name: impl Into<String>, data: Vec<f64>) -> Self {
        let steps = self.time.len();
        assert_eq!(
            data.len(),
            steps * self.lat.len() * self.lon.len(),
            "3-D variable must have time * lat * lon values"
        );
        self.variables.insert(
            name.into(),
            MemoryVariable {
                data,
                steps: Some(steps),
                fill_value: None,
            },
        );
        self
    }

    /// Add a 2-D variable filled with one constant.
    pub fn with_constant(self, name: impl Into<String>, value: f64) -> Self {
        let len = self.lat.len() * self.lon.len();
        self.with_variable(name, vec![value; len])
    }

    /// Mark a sentinel value of an existing variable as masked.
    pub fn with_fill_value(mut self, name: &str, fill: f64) -> Self {
        if let Some(var) = self.variables.get_mut(name) {
            var.fill_value = Some(fill);
        }
        self
    }

    fn check(axis: &'static str, index: usize, len: usize) -> Result<()> {
        if index >= len {
            return Err(DatasetError::IndexOutOfRange { axis, index, len });
        }
        Ok(())
    }
}

impl GridDataset for MemoryDataset {
    fn latitudes(&self) -> &[f64] {
        &self.lat
    }

    fn longitudes(&self) -> &[f64] {
        &self.lon
    }

    fn times(&self) -> &[DateTime<Utc>] {
        &self.time
    }

    fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    fn read(&self, variable: &str, cell: &CellIndex) -> Result<Option<f64>> {
        let var = self
            .variables
            .get(variable)
            .ok_or_else(|| DatasetError::UnknownVariable(variable.to_string()))?;

        let (nlat, nlon) = (self.lat.len(), self.lon.len());
        Self::check("lat", cell.lat, nlat)?;
        Self::check("lon", cell.lon, nlon)?;

        let mut offset = cell.lat * nlon + cell.lon;
        if let Some(steps) = var.steps {
            let t = match (cell.time, steps) {
                (Some(t), _) => t,
                (None, 1) => 0,
                // A time-dependent variable with no selected slice is ambiguous.
                (None, _) => return Ok(None),
            };
            Self::check("time", t, steps)?;
            offset += t * nlat * nlon;
        }

        let value = match var.data.get(offset) {
            Some(&value) => value,
            None => {
                return Err(DatasetError::read_failed(variable, "offset past end of data"));
            }
        };
        if var.fill_value.is_some_and(|fill| fill == value) {
            return Ok(None);
        }
        Ok(Some(value))
    }
}

/// Opens [`MemoryDataset`]s registered under file paths.
///
/// Paths without a registered dataset fail to open, as do paths registered
/// with [`MemoryOpener::fail`].
#[derive(Debug, Clone, Default)]
pub struct MemoryOpener {
    datasets: HashMap<PathBuf, Option<MemoryDataset>>,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dataset to be returned when `path` is opened.
    pub fn insert(&mut self, path: impl Into<PathBuf>, dataset: MemoryDataset) {
        self.datasets.insert(path.into(), Some(dataset));
    }

    /// Register a path whose open always fails (e.g. a corrupt file).
    pub fn fail(&mut self, path: impl Into<PathBuf>) {
        self.datasets.insert(path.into(), None);
    }
}

impl DatasetOpener for MemoryOpener {
    type Dataset = MemoryDataset;

    fn open(&self, path: &Path) -> Result<MemoryDataset> {
        match self.datasets.get(path) {
            Some(Some(ds)) => Ok(ds.clone()),
            Some(None) => Err(DatasetError::open_failed(path, "corrupt file")),
            None => Err(DatasetError::open_failed(path, "no such dataset")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn grid() -> MemoryDataset {
        MemoryDataset::new(vec![0.0, 1.0], vec![10.0, 11.0, 12.0])
            .with_variable("A", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
    }

    #[test]
    fn test_read_2d_row_major() {
        let ds = grid();
        let cell = CellIndex { lat: 1, lon: 2, time: None };
        assert_eq!(ds.read("A", &cell).unwrap(), Some(6.0));
        // A time index is ignored by 2-D variables
        let cell = CellIndex { lat: 0, lon: 1, time: Some(5) };
        assert_eq!(ds.read("A", &cell).unwrap(), Some(2.0));
    }

    #[test]
    fn test_read_3d_uses_time_slice() {
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
        let data: Vec<f64> = (0..12).map(|v| v as f64).collect();
        let ds = MemoryDataset::new(vec![0.0, 1.0], vec![10.0, 11.0, 12.0])
            .with_times(vec![t0, t1])
            .with_time_variable("B", data);

        let cell = CellIndex { lat: 0, lon: 0, time: Some(1) };
        assert_eq!(ds.read("B", &cell).unwrap(), Some(6.0));

        let cell = CellIndex { lat: 0, lon: 0, time: None };
        assert_eq!(ds.read("B", &cell).unwrap(), None);
    }

    #[test]
    fn test_time_axis_replaced_after_variable() {
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
        let ds = MemoryDataset::new(vec![0.0], vec![10.0])
            .with_times(vec![t0])
            .with_time_variable("B", vec![7.0])
            .with_times(vec![t0, t1]);

        let cell = CellIndex { lat: 0, lon: 0, time: Some(0) };
        assert_eq!(ds.read("B", &cell).unwrap(), Some(7.0));

        let cell = CellIndex { lat: 0, lon: 0, time: Some(1) };
        assert!(matches!(
            ds.read("B", &cell),
            Err(DatasetError::IndexOutOfRange { axis: "time", index: 1, len: 1 })
        ));
    }

    #[test]
    fn test_fill_value_is_masked() {
        let ds = grid().with_fill_value("A", 4.0);
        let cell = CellIndex { lat: 1, lon: 0, time: None };
        assert_eq!(ds.read("A", &cell).unwrap(), None);
    }

    #[test]
    fn test_out_of_range_and_unknown() {
        let ds = grid();
        let cell = CellIndex { lat: 2, lon: 0, time: None };
        assert!(matches!(
            ds.read("A", &cell),
            Err(DatasetError::IndexOutOfRange { axis: "lat", .. })
        ));
        let cell = CellIndex { lat: 0, lon: 0, time: None };
        assert!(matches!(
            ds.read("Z", &cell),
            Err(DatasetError::UnknownVariable(_))
        ));
    }

    #[test]
    fn test_opener() {
        let mut opener = MemoryOpener::new();
        opener.insert("/data/2020/20200315.nc", grid());
        opener.fail("/data/2020/20200316.nc");

        assert!(opener.open(Path::new("/data/2020/20200315.nc")).is_ok());
        assert!(opener.open(Path::new("/data/2020/20200316.nc")).is_err());
        assert!(opener.open(Path::new("/data/2020/20200317.nc")).is_err());
    }
}
