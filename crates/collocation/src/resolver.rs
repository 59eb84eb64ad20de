//! Mapping calendar days to raster files.
//!
//! Files live under `<base_dir>/<YYYY>/` and carry the 8-digit day
//! `YYYYMMDD` in their name. The resolver lists the candidates for a day and
//! opens the first one that loads.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::config::{CandidateOrder, DEFAULT_EXTENSION};
use crate::dataset::DatasetOpener;

/// How a file name matched the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NameMatch {
    /// `YYYYMMDD.<ext>`
    Exact,
    /// `YYYYMMDD_*.<ext>`
    Prefix,
    /// `*YYYYMMDD*.<ext>`
    Substring,
}

/// Outcome of resolving one product for one day.
#[derive(Debug)]
pub enum Resolution<D> {
    /// A candidate opened successfully.
    Opened { dataset: D, path: PathBuf },
    /// No file for the day exists.
    NoCandidates,
    /// Candidates exist but none could be opened.
    AllFailed { attempts: usize },
}

impl<D> Resolution<D> {
    pub fn is_opened(&self) -> bool {
        matches!(self, Self::Opened { .. })
    }

    /// The dataset, if one was opened.
    pub fn into_dataset(self) -> Option<D> {
        match self {
            Self::Opened { dataset, .. } => Some(dataset),
            _ => None,
        }
    }
}

/// Finds and opens the raster file for a day.
#[derive(Debug, Clone)]
pub struct FileResolver {
    extension: String,
    order: CandidateOrder,
}

impl Default for FileResolver {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSION, CandidateOrder::default())
    }
}

impl FileResolver {
    pub fn new(extension: impl Into<String>, order: CandidateOrder) -> Self {
        Self {
            extension: extension.into(),
            order,
        }
    }

    /// The 8-digit day stamp used in file names.
    pub fn day_stamp(date: NaiveDate) -> String {
        format!("{:04}{:02}{:02}", date.year(), date.month(), date.day())
    }

    /// Directory searched for a day's files.
    pub fn year_dir(base_dir: &Path, date: NaiveDate) -> PathBuf {
        base_dir.join(format!("{:04}", date.year()))
    }

    /// Classify a file name against a day stamp.
    pub fn match_name(&self, file_name: &str, stamp: &str) -> Option<NameMatch> {
        let stem = file_name
            .strip_suffix(self.extension.as_str())?
            .strip_suffix('.')?;

        if stem == stamp {
            Some(NameMatch::Exact)
        } else if stem
            .strip_prefix(stamp)
            .is_some_and(|rest| rest.starts_with('_'))
        {
            Some(NameMatch::Prefix)
        } else if stem.contains(stamp) {
            Some(NameMatch::Substring)
        } else {
            None
        }
    }

    /// Existing candidate files for `date`, in the order they should be tried.
    ///
    /// A missing year directory yields no candidates.
    pub fn candidates(&self, base_dir: &Path, date: NaiveDate) -> Vec<PathBuf> {
        let stamp = Self::day_stamp(date);
        let dir = Self::year_dir(base_dir, date);

        let mut found: Vec<(NameMatch, String, PathBuf)> = walkdir::WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                let kind = self.match_name(&name, &stamp)?;
                Some((kind, name, entry.into_path()))
            })
            .collect();

        match self.order {
            CandidateOrder::Priority => found.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1))),
            CandidateOrder::Name => found.sort_by(|a, b| a.1.cmp(&b.1)),
        }

        found.into_iter().map(|(_, _, path)| path).collect()
    }

    /// Open the first candidate for `date` that loads.
    ///
    /// Open failures are not retried and are not distinguished from absence
    /// beyond the [`Resolution`] variant.
    pub fn resolve<O: DatasetOpener>(
        &self,
        opener: &O,
        base_dir: &Path,
        date: NaiveDate,
    ) -> Resolution<O::Dataset> {
        let candidates = self.candidates(base_dir, date);
        if candidates.is_empty() {
            return Resolution::NoCandidates;
        }

        let attempts = candidates.len();
        for path in candidates {
            match opener.open(&path) {
                Ok(dataset) => return Resolution::Opened { dataset, path },
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Candidate failed to open");
                }
            }
        }

        Resolution::AllFailed { attempts }
    }
}
