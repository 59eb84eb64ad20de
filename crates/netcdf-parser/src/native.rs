//! Native NetCDF reading using the netcdf library.
//!
//! [`NetCdfDataset`] keeps the file open for its lifetime and reads single
//! values on request; only the coordinate axes are loaded up front. The
//! file is closed when the dataset is dropped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Once;

use chrono::{DateTime, Utc};
use collocation::{CellIndex, DatasetError, DatasetOpener, GridDataset};
use netcdf::AttributeValue;
use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};
use crate::time::decode_times;

/// Latitude coordinate names, in lookup order.
pub const LAT_NAMES: &[&str] = &["lat", "latitude", "LAT", "LATITUDE", "nav_lat"];

/// Longitude coordinate names, in lookup order.
pub const LON_NAMES: &[&str] = &["lon", "longitude", "LON", "LONGITUDE", "nav_lon"];

/// Time coordinate names, in lookup order.
pub const TIME_NAMES: &[&str] = &["time", "TIME", "t"];

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist, or when a candidate file turns out to be
/// corrupt). This creates confusing log spam like:
///
/// ```text
/// HDF5-DIAG: Error detected in HDF5 (1.10.8) thread 3:
///   #003: ../../../src/H5Adense.c line 397 in H5A__dense_open(): can't locate attribute in name index
/// ```
///
/// Only needs to be called once per process, but is safe to call multiple
/// times. Call it early in `main()`, before any NetCDF operation.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DimRole {
    Lat,
    Lon,
    Time,
    Other,
}

/// CF mask-and-scale attributes of a variable.
#[derive(Debug, Clone, Default, PartialEq)]
struct Packing {
    /// `_FillValue` and `missing_value` entries.
    masked: Vec<f64>,
    scale_factor: Option<f64>,
    add_offset: Option<f64>,
}

impl Packing {
    fn from_variable(var: &netcdf::Variable) -> Self {
        let mut masked = get_f64_list_attr(var, "_FillValue");
        masked.extend(get_f64_list_attr(var, "missing_value"));
        Self {
            masked,
            scale_factor: get_f64_attr(var, "scale_factor"),
            add_offset: get_f64_attr(var, "add_offset"),
        }
    }

    fn unpack(&self, raw: f64) -> Option<f64> {
        if self.masked.iter().any(|&m| m == raw) {
            return None;
        }
        Some(raw * self.scale_factor.unwrap_or(1.0) + self.add_offset.unwrap_or(0.0))
    }
}

#[derive(Debug, Clone)]
struct VariableLayout {
    /// Role and length of each dimension, in storage order.
    dims: Vec<(DimRole, usize)>,
    packing: Packing,
}

/// A NetCDF file exposed as a [`GridDataset`].
pub struct NetCdfDataset {
    path: PathBuf,
    file: netcdf::File,
    lat: Vec<f64>,
    lon: Vec<f64>,
    times: Vec<DateTime<Utc>>,
    variables: HashMap<String, VariableLayout>,
}

impl std::fmt::Debug for NetCdfDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetCdfDataset")
            .field("path", &self.path)
            .field("lat", &self.lat.len())
            .field("lon", &self.lon.len())
            .field("times", &self.times.len())
            .field("variables", &self.variables.len())
            .finish()
    }
}

impl NetCdfDataset {
    /// Open a file and load its coordinate axes.
    pub fn open(path: impl AsRef<Path>) -> NetCdfResult<Self> {
        // Silence HDF5's verbose stderr output for missing attributes
        silence_hdf5_errors();

        let path = path.as_ref();
        let file = netcdf::open(path)?;

        let (lat_var, lat) = read_axis(&file, LAT_NAMES, "latitude")?;
        let (lon_var, lon) = read_axis(&file, LON_NAMES, "longitude")?;
        let lat_dim = first_dim_name(&file, &lat_var);
        let lon_dim = first_dim_name(&file, &lon_var);

        let (time_var, time_dim, times) = read_time_axis(&file)?;

        let coordinate_vars = [Some(lat_var.as_str()), Some(lon_var.as_str()), time_var.as_deref()];
        let mut variables = HashMap::new();
        for var in file.variables() {
            let name = var.name();
            if coordinate_vars.contains(&Some(name.as_str())) {
                continue;
            }
            let dims = var
                .dimensions()
                .iter()
                .map(|d| {
                    let dim_name = d.name();
                    let role = if Some(&dim_name) == lat_dim.as_ref() {
                        DimRole::Lat
                    } else if Some(&dim_name) == lon_dim.as_ref() {
                        DimRole::Lon
                    } else if Some(&dim_name) == time_dim.as_ref() {
                        DimRole::Time
                    } else {
                        DimRole::Other
                    };
                    (role, d.len())
                })
                .collect();
            let packing = Packing::from_variable(&var);
            variables.insert(name, VariableLayout { dims, packing });
        }

        debug!(
            path = %path.display(),
            lat = lat.len(),
            lon = lon.len(),
            times = times.len(),
            variables = variables.len(),
            "Opened NetCDF file"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            lat,
            lon,
            times,
            variables,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of the data variables, sorted.
    pub fn variable_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.variables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl GridDataset for NetCdfDataset {
    fn latitudes(&self) -> &[f64] {
        &self.lat
    }

    fn longitudes(&self) -> &[f64] {
        &self.lon
    }

    fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    fn read(&self, variable: &str, cell: &CellIndex) -> collocation::Result<Option<f64>> {
        let layout = self
            .variables
            .get(variable)
            .ok_or_else(|| DatasetError::UnknownVariable(variable.to_string()))?;

        let mut indices = Vec::with_capacity(layout.dims.len());
        for &(role, len) in &layout.dims {
            let (axis, index) = match role {
                DimRole::Lat => ("lat", cell.lat),
                DimRole::Lon => ("lon", cell.lon),
                DimRole::Time => match (cell.time, len) {
                    (Some(t), _) => ("time", t),
                    (None, 1) => ("time", 0),
                    (None, _) => return Ok(None),
                },
                // e.g. a single depth level
                DimRole::Other if len == 1 => ("other", 0),
                DimRole::Other => return Ok(None),
            };
            if index >= len {
                return Err(DatasetError::IndexOutOfRange { axis, index, len });
            }
            indices.push(index);
        }

        let var = self
            .file
            .variable(variable)
            .ok_or_else(|| DatasetError::UnknownVariable(variable.to_string()))?;
        let raw: f64 = var
            .get_value::<f64, _>(indices.as_slice())
            .map_err(|e| DatasetError::read_failed(variable, e.to_string()))?;

        Ok(layout.packing.unpack(raw))
    }
}

/// Opens NetCDF files as [`NetCdfDataset`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetCdfOpener;

impl DatasetOpener for NetCdfOpener {
    type Dataset = NetCdfDataset;

    fn open(&self, path: &Path) -> collocation::Result<NetCdfDataset> {
        NetCdfDataset::open(path).map_err(|e| e.into_dataset_error(path))
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Find the first coordinate variable named in `names` and read it as a
/// 1-D axis. Returns the variable name and its values.
fn read_axis(
    file: &netcdf::File,
    names: &[&str],
    axis: &'static str,
) -> NetCdfResult<(String, Vec<f64>)> {
    let var = names
        .iter()
        .find_map(|name| file.variable(name))
        .ok_or(NetCdfError::MissingAxis(axis))?;

    if var.dimensions().len() != 1 {
        return Err(NetCdfError::NotOneDimensional(var.name()));
    }
    let values: Vec<f64> = var.get_values::<f64, _>(..)?;
    Ok((var.name(), values))
}

fn first_dim_name(file: &netcdf::File, var_name: &str) -> Option<String> {
    file.variable(var_name)
        .and_then(|var| var.dimensions().first().map(|d| d.name()))
}

/// Locate and decode the time axis.
///
/// Returns the coordinate variable name (if any), the time dimension name
/// (if any) and the decoded instants. A time axis that cannot be decoded is
/// tolerated only when it has at most one step.
fn read_time_axis(
    file: &netcdf::File,
) -> NetCdfResult<(Option<String>, Option<String>, Vec<DateTime<Utc>>)> {
    let var = TIME_NAMES.iter().find_map(|name| file.variable(name));

    let Some(var) = var else {
        // A bare time dimension with no coordinate variable
        let dim = TIME_NAMES.iter().find_map(|name| file.dimension(name));
        return match dim {
            Some(dim) if dim.len() > 1 => Err(NetCdfError::UndecodableTime {
                variable: dim.name(),
                units: None,
            }),
            Some(dim) => Ok((None, Some(dim.name()), Vec::new())),
            None => Ok((None, None, Vec::new())),
        };
    };

    let name = var.name();
    if var.dimensions().len() != 1 {
        return Err(NetCdfError::NotOneDimensional(name));
    }
    let dim_name = var.dimensions().first().map(|d| d.name());
    let len = var.dimensions()[0].len();

    let units = get_string_attr(&var, "units");
    let raw: Vec<f64> = var.get_values::<f64, _>(..)?;
    let decoded = units.as_deref().and_then(|u| decode_times(&raw, u));

    match decoded {
        Some(times) => Ok((Some(name), dim_name, times)),
        None if len <= 1 => {
            debug!(variable = %name, units = ?units, "Ignoring undecodable single-step time axis");
            Ok((Some(name), dim_name, Vec::new()))
        }
        None => Err(NetCdfError::UndecodableTime {
            variable: name,
            units,
        }),
    }
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Helper to get f64 attribute.
fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

/// Helper to get a numeric attribute that may be a scalar or a list.
fn get_f64_list_attr(var: &netcdf::Variable, name: &str) -> Vec<f64> {
    if !has_attr(var, name) {
        return Vec::new();
    }
    match var.attribute_value(name) {
        Some(Ok(value)) => attr_to_f64s(value),
        _ => Vec::new(),
    }
}

/// Helper to get string attribute.
fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        AttributeValue::Str(s) => Some(s),
        AttributeValue::Strs(mut v) if !v.is_empty() => Some(v.swap_remove(0)),
        _ => None,
    }
}

fn attr_to_f64s(value: AttributeValue) -> Vec<f64> {
    match value {
        AttributeValue::Uchars(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Schars(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Ushorts(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Shorts(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Uints(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Ints(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Ulonglongs(v) => v.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Longlongs(v) => v.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Floats(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Doubles(v) => v,
        scalar => f64::try_from(scalar).ok().into_iter().collect(),
    }
}
