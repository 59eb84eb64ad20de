//! Generators for synthetic coordinate axes and grids.
//!
//! These generators create predictable, verifiable patterns that can be used
//! across the test suite.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// A regularly spaced axis: `start, start + step, ...` with `len` values.
///
/// # Example
///
/// ```
/// use test_utils::regular_axis;
///
/// let lon = regular_axis(0.0, 0.25, 1440);
/// assert_eq!(lon.len(), 1440);
/// assert_eq!(lon[1439], 359.75);
/// ```
pub fn regular_axis(start: f64, step: f64, len: usize) -> Vec<f64> {
    (0..len).map(|i| start + i as f64 * step).collect()
}

/// Global cell-centre longitudes in the signed domain (-180..180).
pub fn signed_lon_axis(step: f64) -> Vec<f64> {
    let len = (360.0 / step).round() as usize;
    regular_axis(-180.0 + step / 2.0, step, len)
}

/// Global longitudes in the unsigned domain, starting at 0.
pub fn unsigned_lon_axis(step: f64) -> Vec<f64> {
    let len = (360.0 / step).round() as usize;
    regular_axis(0.0, step, len)
}

/// Creates a `[lat][lon]` grid with predictable values.
///
/// Each cell value is calculated as: `lat_index * 1000 + lon_index`, so a
/// read at `(i, j)` can be checked against `i * 1000 + j`.
///
/// # Example
///
/// ```
/// use test_utils::create_index_grid;
///
/// let grid = create_index_grid(3, 4);
/// assert_eq!(grid.len(), 12);
/// assert_eq!(grid[5], 1001.0); // lat=1, lon=1
/// ```
pub fn create_index_grid(nlat: usize, nlon: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(nlat * nlon);
    for i in 0..nlat {
        for j in 0..nlon {
            data.push((i * 1000 + j) as f64);
        }
    }
    data
}

/// Creates a `[time][lat][lon]` grid where every value of slice `t` is
/// `t * 100000 + lat_index * 1000 + lon_index`.
pub fn create_time_index_grid(ntime: usize, nlat: usize, nlon: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(ntime * nlat * nlon);
    for t in 0..ntime {
        data.extend(
            create_index_grid(nlat, nlon)
                .into_iter()
                .map(|v| v + (t * 100_000) as f64),
        );
    }
    data
}

/// Midnight UTC on a date.
pub fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc()
}

/// Time axis at fractional day offsets from midnight of `base`.
pub fn day_offsets(base: NaiveDate, offsets: &[f64]) -> Vec<DateTime<Utc>> {
    offsets
        .iter()
        .map(|d| midnight(base) + Duration::seconds((d * 86_400.0).round() as i64))
        .collect()
}

/// Shorthand for a valid calendar date.
///
/// # Panics
/// If the date does not exist.
pub fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_axis_is_centred() {
        let axis = signed_lon_axis(0.25);
        assert_eq!(axis.len(), 1440);
        assert_eq!(axis[0], -179.875);
        assert_eq!(axis[1439], 179.875);
    }

    #[test]
    fn test_unsigned_axis() {
        let axis = unsigned_lon_axis(0.25);
        assert_eq!(axis[0], 0.0);
        assert_eq!(axis[1439], 359.75);
    }

    #[test]
    fn test_time_index_grid() {
        let grid = create_time_index_grid(2, 2, 3);
        assert_eq!(grid.len(), 12);
        assert_eq!(grid[6 + 4], 100_000.0 + 1001.0);
    }

    #[test]
    fn test_day_offsets() {
        let base = ymd(2020, 3, 14);
        let axis = day_offsets(base, &[0.0, 1.5]);
        assert_eq!(axis[0], midnight(base));
        assert_eq!(axis[1], midnight(ymd(2020, 3, 15)) + Duration::hours(12));
    }
}
