//! Time slice selection for a calendar day.

use chrono::{DateTime, NaiveDate, Utc};

use crate::dataset::GridDataset;
use crate::types::TimeIndex;

/// Midnight UTC of a calendar day.
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Select the time slice of `dataset` to use for `date`.
///
/// | time-axis length | result |
/// |---|---|
/// | 0 | [`TimeIndex::None`] |
/// | 1 | index 0 |
/// | >1 | nearest to midnight of `date`, lowest index on ties |
pub fn select_time_index<D: GridDataset + ?Sized>(dataset: &D, date: NaiveDate) -> TimeIndex {
    select_nearest_time(dataset.times(), day_start(date))
}

/// Select the slice of `axis` nearest to `target`.
pub fn select_nearest_time(axis: &[DateTime<Utc>], target: DateTime<Utc>) -> TimeIndex {
    match axis.len() {
        0 => TimeIndex::None,
        1 => TimeIndex::Index(0),
        _ => {
            let mut best = 0;
            let mut best_diff = i64::MAX;
            for (i, t) in axis.iter().enumerate() {
                let diff = (*t - target)
                    .num_microseconds()
                    .map_or(i64::MAX, i64::abs);
                if diff < best_diff {
                    best = i;
                    best_diff = diff;
                }
            }
            TimeIndex::Index(best)
        }
    }
}
