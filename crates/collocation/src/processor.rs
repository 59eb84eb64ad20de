//! Day-group orchestration.
//!
//! ```text
//! samples ──► partition_by_day ──► DayGroup (ascending date)
//!                                      │
//!                  for each product ───┤
//!                                      ├─► FileResolver::resolve ──► none: "no data"
//!                                      ├─► select_time_index (once per group)
//!                                      ├─► VariableExtractor::new (presence checked once)
//!                                      └─► per sample: GridLocator ──► extract_into
//!                                      │
//!                          dataset dropped (closed) here
//! ```
//!
//! Groups are disjoint, so they can be processed on the rayon pool. Each
//! worker opens its own datasets and returns its writes; the writes are
//! applied to the caller's records after the map completes.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::CollocationConfig;
use crate::dataset::{DatasetOpener, GridDataset};
use crate::error::ConfigError;
use crate::extract::{fill_no_data, OutputField, VariableExtractor};
use crate::locator::GridLocator;
use crate::resolver::{FileResolver, Resolution};
use crate::time_select::select_time_index;
use crate::types::{Extracted, NoDataReason, SampleRecord};

/// Samples sharing one calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGroup {
    pub date: NaiveDate,
    /// Positions of the member samples in the input slice.
    pub members: Vec<usize>,
}

/// Partition samples into day-groups, in ascending date order.
///
/// Every sample lands in exactly one group.
pub fn partition_by_day(samples: &[SampleRecord]) -> Vec<DayGroup> {
    let mut by_day: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for (i, sample) in samples.iter().enumerate() {
        by_day.entry(sample.date).or_default().push(i);
    }
    by_day
        .into_iter()
        .map(|(date, members)| DayGroup { date, members })
        .collect()
}

/// How a product fared for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Opened,
    NoFile,
    OpenFailed,
}

/// Per-product result of one day-group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDay {
    pub status: DayStatus,
    pub accepted: usize,
    pub rejected: usize,
    pub missing_variables: Vec<String>,
}

/// Writes and statistics produced by one day-group.
#[derive(Debug, Clone)]
pub struct GroupOutput {
    pub date: NaiveDate,
    /// `(sample position, columns to write)`
    pub writes: Vec<(usize, BTreeMap<String, Extracted>)>,
    /// One entry per configured product, in configuration order.
    pub products: Vec<ProductDay>,
}

/// Per-product totals over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: String,
    pub days_opened: usize,
    pub days_without_file: usize,
    pub days_open_failed: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Variable name to number of days it was missing from an opened file.
    pub absent_variable_days: BTreeMap<String, usize>,
}

impl ProductSummary {
    pub fn days_unavailable(&self) -> usize {
        self.days_without_file + self.days_open_failed
    }
}

/// Totals over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub samples: usize,
    pub day_groups: usize,
    pub groups_processed: usize,
    pub cancelled: bool,
    pub products: Vec<ProductSummary>,
}

impl RunSummary {
    /// Summary for a product id.
    pub fn product(&self, id: &str) -> Option<&ProductSummary> {
        self.products.iter().find(|p| p.id == id)
    }

    fn record(&mut self, output: &GroupOutput) {
        self.groups_processed += 1;
        for (summary, day) in self.products.iter_mut().zip(&output.products) {
            match day.status {
                DayStatus::Opened => summary.days_opened += 1,
                DayStatus::NoFile => summary.days_without_file += 1,
                DayStatus::OpenFailed => summary.days_open_failed += 1,
            }
            summary.accepted += day.accepted;
            summary.rejected += day.rejected;
            for var in &day.missing_variables {
                *summary.absent_variable_days.entry(var.clone()).or_default() += 1;
            }
        }
    }
}

#[derive(Debug, Clone)]
struct ProductPlan {
    id: String,
    base_dir: PathBuf,
    fields: Vec<OutputField>,
}

/// Drives the collocation of samples against one or two products.
pub struct DayBatchProcessor<O> {
    opener: O,
    plans: Vec<ProductPlan>,
    resolver: FileResolver,
    locator: GridLocator,
    parallel: bool,
    stop: Option<Arc<AtomicBool>>,
}

impl<O: DatasetOpener> DayBatchProcessor<O> {
    /// Create a processor. Fails if the configuration is invalid.
    pub fn new(config: &CollocationConfig, opener: O) -> Result<Self, ConfigError> {
        config.validate()?;

        let plans = config
            .products
            .iter()
            .map(|product| {
                // A variable requested twice is extracted once
                let mut seen = HashSet::new();
                let fields = product
                    .variables
                    .iter()
                    .filter(|v| seen.insert(v.as_str()))
                    .map(|v| OutputField {
                        variable: v.clone(),
                        column: config.namespace.column(&product.id, v).to_string(),
                    })
                    .collect();
                ProductPlan {
                    id: product.id.clone(),
                    base_dir: product.base_dir.clone(),
                    fields,
                }
            })
            .collect();

        Ok(Self {
            opener,
            plans,
            resolver: FileResolver::new(config.file_extension.clone(), config.candidate_order),
            locator: GridLocator::new(config.tolerance_deg),
            parallel: config.parallel,
            stop: None,
        })
    }

    /// Stop before the next day-group once `flag` is set.
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    fn stopped(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Collocate every sample, writing results into `samples[..].outputs`.
    ///
    /// Never fails: every requested column of every processed sample ends
    /// up with a value or an explicit "no data".
    pub fn process(&self, samples: &mut [SampleRecord]) -> RunSummary {
        let groups = partition_by_day(samples);
        let total = groups.len();

        let mut summary = RunSummary {
            samples: samples.len(),
            day_groups: total,
            products: self
                .plans
                .iter()
                .map(|p| ProductSummary {
                    id: p.id.clone(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        info!(
            samples = samples.len(),
            day_groups = total,
            parallel = self.parallel,
            "Processing distinct dates"
        );

        let shared: &[SampleRecord] = samples;
        let run = |(gi, group): (usize, &DayGroup)| -> Option<GroupOutput> {
            if self.stopped() {
                return None;
            }
            let output = self.process_group(group, shared);
            info!(
                group = gi + 1,
                groups = total,
                date = %group.date,
                rows = group.members.len(),
                "Day-group done"
            );
            Some(output)
        };

        let outputs: Vec<Option<GroupOutput>> = if self.parallel {
            groups.par_iter().enumerate().map(run).collect()
        } else {
            // Sequential runs stop at the first skipped group
            groups.iter().enumerate().map(run).take_while(Option::is_some).collect()
        };

        for output in outputs.into_iter().flatten() {
            summary.record(&output);
            for (pos, writes) in output.writes {
                samples[pos].outputs.extend(writes);
            }
        }

        summary.cancelled = summary.groups_processed < total;
        if summary.cancelled {
            warn!(
                processed = summary.groups_processed,
                day_groups = total,
                "Run stopped early"
            );
        }

        summary
    }

    /// Process one day-group against every configured product.
    ///
    /// Products are handled independently: one product's outcome never
    /// affects another's columns.
    pub fn process_group(&self, group: &DayGroup, samples: &[SampleRecord]) -> GroupOutput {
        let mut writes: Vec<(usize, BTreeMap<String, Extracted>)> = group
            .members
            .iter()
            .map(|&pos| (pos, BTreeMap::new()))
            .collect();

        let products = self
            .plans
            .iter()
            .map(|plan| self.process_product(plan, group, samples, &mut writes))
            .collect();

        GroupOutput {
            date: group.date,
            writes,
            products,
        }
    }

    fn process_product(
        &self,
        plan: &ProductPlan,
        group: &DayGroup,
        samples: &[SampleRecord],
        writes: &mut [(usize, BTreeMap<String, Extracted>)],
    ) -> ProductDay {
        let status = match self.resolver.resolve(&self.opener, &plan.base_dir, group.date) {
            Resolution::Opened { dataset, path } => {
                if dataset.latitudes().is_empty() || dataset.longitudes().is_empty() {
                    warn!(
                        product = %plan.id,
                        date = %group.date,
                        path = %path.display(),
                        "Dataset has an empty latitude or longitude axis"
                    );
                    DayStatus::OpenFailed
                } else {
                    debug!(
                        product = %plan.id,
                        date = %group.date,
                        path = %path.display(),
                        "Opened dataset"
                    );
                    // `dataset` is dropped, and its file closed, on return
                    return self.extract_day(plan, group, samples, &dataset, writes);
                }
            }
            Resolution::AllFailed { attempts } => {
                warn!(
                    product = %plan.id,
                    date = %group.date,
                    attempts,
                    "Could not open any candidate file"
                );
                DayStatus::OpenFailed
            }
            Resolution::NoCandidates => {
                warn!(product = %plan.id, date = %group.date, "No file found");
                DayStatus::NoFile
            }
        };

        for (_, out) in writes.iter_mut() {
            fill_no_data(&plan.fields, NoDataReason::ProductUnavailable, out);
        }
        ProductDay {
            status,
            accepted: 0,
            rejected: 0,
            missing_variables: Vec::new(),
        }
    }

    fn extract_day<D: GridDataset>(
        &self,
        plan: &ProductPlan,
        group: &DayGroup,
        samples: &[SampleRecord],
        dataset: &D,
        writes: &mut [(usize, BTreeMap<String, Extracted>)],
    ) -> ProductDay {
        let extractor = VariableExtractor::new(&plan.fields, dataset);
        let missing_variables: Vec<String> = extractor.missing().map(str::to_string).collect();
        for variable in &missing_variables {
            warn!(
                product = %plan.id,
                date = %group.date,
                variable = %variable,
                "Variable missing from dataset"
            );
        }

        // Every member shares the group's date, so one slice serves them all.
        let time = select_time_index(dataset, group.date);

        let mut accepted = 0;
        let mut rejected = 0;
        for (pos, out) in writes.iter_mut() {
            let sample = &samples[*pos];
            let cell = self
                .locator
                .locate(dataset, sample.lat, sample.lon)
                .filter(|cell| cell.accepted)
                .map(|cell| cell.at_time(time));

            if cell.is_some() {
                accepted += 1;
            } else {
                rejected += 1;
            }
            extractor.extract_into(dataset, cell.as_ref(), out);
        }

        ProductDay {
            status: DayStatus::Opened,
            accepted,
            rejected,
            missing_variables,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProductConfig;
    use crate::memory::{MemoryDataset, MemoryOpener};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_partition_is_total_disjoint_and_sorted() {
        let samples = vec![
            SampleRecord::new(0, date(2020, 3, 16), 0.0, 0.0),
            SampleRecord::new(1, date(2020, 3, 15), 0.0, 0.0),
            SampleRecord::new(2, date(2020, 3, 16), 0.0, 0.0),
            SampleRecord::new(3, date(2019, 12, 31), 0.0, 0.0),
        ];
        let groups = partition_by_day(&samples);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].date, date(2019, 12, 31));
        assert_eq!(groups[1].members, vec![1]);
        assert_eq!(groups[2].members, vec![0, 2]);

        let mut all: Vec<usize> = groups.iter().flat_map(|g| g.members.clone()).collect();
        all.sort();
        assert_eq!(all, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_single_product_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2020").join("20200315.nc");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"").unwrap();

        let mut opener = MemoryOpener::new();
        opener.insert(
            &path,
            MemoryDataset::new(vec![40.9, 41.0, 41.1], vec![-8.8, -8.7, -8.6])
                .with_variable("CHL", vec![0.0, 0.0, 0.0, 0.0, 0.42, 0.0, 0.0, 0.0, 0.0]),
        );

        let config = CollocationConfig::new(ProductConfig::new("p", dir.path(), ["CHL"]));
        let processor = DayBatchProcessor::new(&config, opener).unwrap();

        let mut samples = vec![SampleRecord::new(0, date(2020, 3, 15), 41.05, -8.70)];
        let summary = processor.process(&mut samples);

        assert_eq!(samples[0].value("CHL"), Some(0.42));
        assert_eq!(summary.groups_processed, 1);
        assert!(!summary.cancelled);
        assert_eq!(summary.product("p").unwrap().accepted, 1);
    }

    #[test]
    fn test_empty_axes_degrade_like_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2020").join("20200315.nc");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"").unwrap();

        let mut opener = MemoryOpener::new();
        opener.insert(&path, MemoryDataset::new(vec![], vec![]));

        let config = CollocationConfig::new(ProductConfig::new("p", dir.path(), ["CHL"]));
        let processor = DayBatchProcessor::new(&config, opener).unwrap();

        let mut samples = vec![SampleRecord::new(0, date(2020, 3, 15), 41.05, -8.70)];
        let summary = processor.process(&mut samples);

        assert_eq!(
            samples[0].output("CHL"),
            Some(&Extracted::NoData(NoDataReason::ProductUnavailable))
        );
        let product = summary.product("p").unwrap();
        assert_eq!(product.days_open_failed, 1);
        assert_eq!(product.days_opened, 0);
        assert_eq!(product.rejected, 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = CollocationConfig::default();
        assert!(DayBatchProcessor::new(&config, MemoryOpener::new()).is_err());
    }

    #[test]
    fn test_stop_flag_set_before_run() {
        let config = CollocationConfig::new(ProductConfig::new("p", "/p", ["CHL"]));
        let flag = Arc::new(AtomicBool::new(true));
        let processor = DayBatchProcessor::new(&config, MemoryOpener::new())
            .unwrap()
            .with_stop_flag(flag);

        let mut samples = vec![SampleRecord::new(0, date(2020, 3, 15), 0.0, 0.0)];
        let summary = processor.process(&mut samples);

        assert!(summary.cancelled);
        assert_eq!(summary.groups_processed, 0);
        assert!(samples[0].outputs.is_empty());
    }
}
