//! Spatiotemporal collocation of point samples with daily gridded products.
//!
//! Given samples with a calendar date and a position, this crate finds the
//! raster file for each sample's day, locates the nearest grid cell within a
//! tolerance, picks the time slice for the day and reads the requested
//! variables back onto the sample. Up to two independent products can be
//! merged onto the same samples.
//!
//! Nothing that goes wrong for a single day or sample is an error here:
//! missing files, missing variables, out-of-tolerance matches and masked
//! values all become an explicit [`Extracted::NoData`] with a
//! [`NoDataReason`].
//!
//! # Architecture
//!
//! ```text
//! DayBatchProcessor::process(samples)
//!      │
//!      ├─► partition_by_day            (one group per calendar date)
//!      │
//!      └─► per group, per product
//!               │
//!               ├─► FileResolver       <base>/<YYYY>/*YYYYMMDD*.nc, first that opens
//!               ├─► select_time_index  none / 0 / nearest to the day
//!               ├─► GridLocator        nearest cell, longitude domain, tolerance
//!               └─► VariableExtractor  value or "no data", namespaced column
//! ```
//!
//! File formats are plugged in through [`DatasetOpener`]; see the
//! `netcdf-parser` crate for NetCDF. [`MemoryDataset`] serves grids held in
//! memory.
//!
//! # Example
//!
//! ```ignore
//! use collocation::{CollocationConfig, DayBatchProcessor, SampleRecord};
//! use netcdf_parser::NetCdfOpener;
//!
//! let config = CollocationConfig::plankton_optics("/data/plankton", Some("/data/optics"));
//! let processor = DayBatchProcessor::new(&config, NetCdfOpener::default())?;
//! let summary = processor.process(&mut samples);
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod locator;
pub mod memory;
pub mod namespace;
pub mod processor;
pub mod resolver;
pub mod time_select;
pub mod types;

// Re-export commonly used types at crate root
pub use config::{
    CandidateOrder, CollocationConfig, ProductConfig, DEFAULT_OPTICS_VARS, DEFAULT_PLANKTON_VARS,
};
pub use dataset::{DatasetOpener, GridDataset, LonDomain};
pub use error::{ConfigError, DatasetError, Result};
pub use extract::{extract_value, OutputField, VariableExtractor};
pub use locator::{circular_lon_diff, nearest_index, GridLocator, DEFAULT_TOLERANCE_DEG};
pub use memory::{MemoryDataset, MemoryOpener};
pub use namespace::{NamespaceRule, VariableNamespace};
pub use processor::{
    partition_by_day, DayBatchProcessor, DayGroup, DayStatus, GroupOutput, ProductDay,
    ProductSummary, RunSummary,
};
pub use resolver::{FileResolver, NameMatch, Resolution};
pub use time_select::{day_start, select_nearest_time, select_time_index};
pub use types::{CellIndex, Extracted, NoDataReason, ResolvedCell, SampleRecord, TimeIndex};
