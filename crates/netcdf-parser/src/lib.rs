//! NetCDF reader for daily gridded products.
//!
//! Implements the collocation engine's [`GridDataset`](collocation::GridDataset)
//! and [`DatasetOpener`](collocation::DatasetOpener) on top of the `netcdf`
//! crate (libnetcdf/HDF5).
//!
//! # Conventions
//!
//! - Axes are found by name: `lat`/`latitude`/`LAT`/`LATITUDE`/`nav_lat`,
//!   `lon`/`longitude`/`LON`/`LONGITUDE`/`nav_lon` and `time`/`TIME`/`t`.
//!   Latitude and longitude must be 1-D coordinate variables.
//! - The time axis is decoded from its CF `units` attribute
//!   (`"days since 1970-01-01"` and friends).
//! - Values are read one at a time, indexing each dimension by name, with
//!   `_FillValue`/`missing_value` masked and `scale_factor`/`add_offset`
//!   applied.
//!
//! System requirements: libhdf5-dev libnetcdf-dev

pub mod error;
pub mod native;
pub mod time;

pub use error::{NetCdfError, NetCdfResult};
pub use native::{
    silence_hdf5_errors, NetCdfDataset, NetCdfOpener, LAT_NAMES, LON_NAMES, TIME_NAMES,
};
pub use time::{decode_times, CfTimeUnits};
