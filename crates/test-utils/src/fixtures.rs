//! Common test fixtures.
//!
//! [`DatedTree`] lays out raster files the way products are stored on disk:
//! `<base>/<YYYY>/<name>`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use tempfile::TempDir;

/// Common sample positions.
pub mod positions {
    /// Off the Portuguese coast, on a 0.1 degree grid cell boundary.
    pub const PORTO: (f64, f64) = (41.05, -8.70);

    /// Just west of the antimeridian.
    pub const DATELINE_WEST: (f64, f64) = (-16.0, 179.97);

    /// Mid-Pacific, expressed in the signed domain.
    pub const PACIFIC_SIGNED: (f64, f64) = (0.0, -170.0);
}

/// A temporary product directory organised by year.
///
/// Removed when dropped.
pub struct DatedTree {
    root: TempDir,
}

impl DatedTree {
    /// Create an empty tree.
    ///
    /// # Panics
    /// If the temporary directory cannot be created.
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("create temp dir"),
        }
    }

    /// Base directory to configure a product with.
    pub fn base(&self) -> &Path {
        self.root.path()
    }

    /// Path a file would have under the year directory of `date`.
    pub fn path_for(&self, date: NaiveDate, name: &str) -> PathBuf {
        self.root
            .path()
            .join(format!("{:04}", date.year()))
            .join(name)
    }

    /// Create an empty file under the year directory of `date`.
    ///
    /// # Panics
    /// If the file cannot be written.
    pub fn touch(&self, date: NaiveDate, name: &str) -> PathBuf {
        self.write(date, name, b"")
    }

    /// Write a file under the year directory of `date`.
    ///
    /// # Panics
    /// If the file cannot be written.
    pub fn write(&self, date: NaiveDate, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.path_for(date, name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create year dir");
        }
        fs::write(&path, contents).expect("write fixture file");
        path
    }

    /// Create a subdirectory under the year directory of `date`.
    pub fn mkdir(&self, date: NaiveDate, name: &str) -> PathBuf {
        let path = self.path_for(date, name);
        fs::create_dir_all(&path).expect("create fixture dir");
        path
    }
}

impl Default for DatedTree {
    fn default() -> Self {
        Self::new()
    }
}
