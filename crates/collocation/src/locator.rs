//! Nearest grid cell lookup with a tolerance gate.

use crate::dataset::{GridDataset, LonDomain};
use crate::types::ResolvedCell;

/// Default nearest-neighbour tolerance in degrees.
pub const DEFAULT_TOLERANCE_DEG: f64 = 0.05;

/// Index of the value in `axis` closest to `value`.
///
/// Monotonically non-decreasing axes take a binary search; anything else is
/// scanned linearly. Both paths agree on monotonic input, ties going to the
/// lower index. Returns `None` for an empty axis.
pub fn nearest_index(axis: &[f64], value: f64) -> Option<usize> {
    if axis.is_empty() {
        return None;
    }
    if is_non_decreasing(axis) {
        Some(nearest_sorted(axis, value))
    } else {
        Some(nearest_linear(axis, value))
    }
}

fn is_non_decreasing(axis: &[f64]) -> bool {
    axis.windows(2).all(|w| w[1] >= w[0])
}

fn nearest_sorted(axis: &[f64], value: f64) -> usize {
    // First index with axis[i] >= value
    let i = axis.partition_point(|&v| v < value);
    let mut best = if i == 0 {
        0
    } else if i >= axis.len() {
        axis.len() - 1
    } else if (axis[i] - value).abs() < (axis[i - 1] - value).abs() {
        i
    } else {
        i - 1
    };
    // Walk back over equal distances (duplicate axis values) so the lowest
    // index wins, as in the linear scan.
    let best_diff = (axis[best] - value).abs();
    while best > 0 && (axis[best - 1] - value).abs() == best_diff {
        best -= 1;
    }
    best
}

pub(crate) fn nearest_linear(axis: &[f64], value: f64) -> usize {
    let mut best = 0;
    let mut best_diff = f64::INFINITY;
    for (i, &v) in axis.iter().enumerate() {
        let diff = (v - value).abs();
        // Strict comparison keeps the lowest index on ties and skips NaN.
        if diff < best_diff {
            best = i;
            best_diff = diff;
        }
    }
    best
}

/// Longitude difference wrapped into [-180, 180], as an absolute value.
pub fn circular_lon_diff(a: f64, b: f64) -> f64 {
    ((a - b + 180.0).rem_euclid(360.0) - 180.0).abs()
}

/// Finds the nearest grid cell to a query point and gates it by tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLocator {
    tolerance_deg: f64,
}

impl Default for GridLocator {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE_DEG)
    }
}

impl GridLocator {
    pub fn new(tolerance_deg: f64) -> Self {
        Self { tolerance_deg }
    }

    pub fn tolerance_deg(&self) -> f64 {
        self.tolerance_deg
    }

    /// Locate `(lat, lon)` on a dataset's axes.
    ///
    /// Returns `None` when either axis is empty.
    pub fn locate<D: GridDataset + ?Sized>(
        &self,
        dataset: &D,
        lat: f64,
        lon: f64,
    ) -> Option<ResolvedCell> {
        self.locate_on_axes(
            dataset.latitudes(),
            dataset.longitudes(),
            dataset.lon_domain(),
            lat,
            lon,
        )
    }

    /// Locate `(lat, lon)` on explicit axes.
    ///
    /// The query longitude is mapped into `domain` before any distance is
    /// computed.
    pub fn locate_on_axes(
        &self,
        lat_axis: &[f64],
        lon_axis: &[f64],
        domain: LonDomain,
        lat: f64,
        lon: f64,
    ) -> Option<ResolvedCell> {
        let qlon = domain.normalize(lon);

        let lat_index = nearest_index(lat_axis, lat)?;
        let lon_index = nearest_index(lon_axis, qlon)?;

        let lat_diff = (lat_axis[lat_index] - lat).abs();
        let lon_diff = circular_lon_diff(lon_axis[lon_index], qlon);

        Some(ResolvedCell {
            lat_index,
            lon_index,
            lat_diff,
            lon_diff,
            accepted: self.within(lat_diff) && self.within(lon_diff),
        })
    }

    fn within(&self, diff: f64) -> bool {
        // NaN never passes
        diff <= self.tolerance_deg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_nearest_sorted_edges() {
        let axis = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(nearest_index(&axis, -5.0), Some(0));
        assert_eq!(nearest_index(&axis, 10.0), Some(3));
        assert_eq!(nearest_index(&axis, 1.2), Some(1));
        assert_eq!(nearest_index(&axis, 1.8), Some(2));
        assert_eq!(nearest_index(&axis, 2.0), Some(2));
    }

    #[test]
    fn test_nearest_tie_prefers_lower_index() {
        let axis = [0.0, 1.0, 2.0];
        assert_eq!(nearest_index(&axis, 0.5), Some(0));
        assert_eq!(nearest_linear(&axis, 0.5), 0);
    }

    #[test]
    fn test_nearest_duplicates() {
        let axis = [0.0, 1.0, 1.0, 2.0];
        assert_eq!(nearest_index(&axis, 1.0), Some(1));
        assert_eq!(nearest_linear(&axis, 1.0), 1);
    }

    #[test]
    fn test_nearest_descending_axis_uses_scan() {
        // Latitude axes are often stored north to south
        let axis = [41.1, 41.0, 40.9];
        assert_eq!(nearest_index(&axis, 41.04), Some(1));
        assert_eq!(nearest_index(&axis, 50.0), Some(0));
    }

    #[test]
    fn test_nearest_empty_axis() {
        assert_eq!(nearest_index(&[], 1.0), None);
    }

    #[test]
    fn test_circular_difference_across_antimeridian() {
        let diff = circular_lon_diff(-179.98, 179.97);
        assert!((diff - 0.05).abs() < 1e-9, "diff = {}", diff);
        let diff = circular_lon_diff(179.97, -179.98);
        assert!((diff - 0.05).abs() < 1e-9, "diff = {}", diff);
        assert!((circular_lon_diff(10.0, 350.0) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_tolerance_boundary_is_inclusive() {
        let locator = GridLocator::new(0.5);
        let cell = locator
            .locate_on_axes(&[0.0, 1.0], &[0.0, 1.0], LonDomain::Signed, 0.5, 0.0)
            .unwrap();
        assert_eq!(cell.lat_diff, 0.5);
        assert!(cell.accepted);

        let cell = locator
            .locate_on_axes(&[0.0, 2.0], &[0.0, 1.0], LonDomain::Signed, 0.5 + 1e-9, 0.0)
            .unwrap();
        assert!(!cell.accepted);
    }

    #[test]
    fn test_rejected_when_lon_exceeds() {
        let locator = GridLocator::default();
        let cell = locator
            .locate_on_axes(&[0.0], &[0.0, 1.0], LonDomain::Signed, 0.0, 0.3)
            .unwrap();
        assert_eq!(cell.lon_index, 0);
        assert!(!cell.accepted);
    }

    #[test]
    fn test_query_mapped_into_unsigned_domain() {
        let lon_axis: Vec<f64> = (0..1440).map(|i| i as f64 * 0.25).collect();
        let locator = GridLocator::default();
        let cell = locator
            .locate_on_axes(&[0.0], &lon_axis, LonDomain::infer(&lon_axis), 0.0, -170.0)
            .unwrap();
        assert_eq!(lon_axis[cell.lon_index], 190.0);
        assert!(cell.accepted);
    }

    #[test]
    fn test_wrap_match_across_antimeridian() {
        let lon_axis = [-179.98, -179.9, 0.0, 179.9];
        let locator = GridLocator::new(0.06);
        let cell = locator
            .locate_on_axes(&[0.0], &lon_axis, LonDomain::Signed, 0.0, 179.97)
            .unwrap();
        // Linear nearest on the axis is 179.9 (0.07 away); the wrapped
        // distance to it is what is gated.
        assert_eq!(cell.lon_index, 3);
        assert!((cell.lon_diff - 0.07).abs() < 1e-9);
        assert!(!cell.accepted);
    }

    proptest! {
        #[test]
        fn prop_sorted_matches_linear(
            mut axis in proptest::collection::vec(-500.0f64..500.0, 1..64),
            value in -600.0f64..600.0,
        ) {
            axis.sort_by(|a, b| a.partial_cmp(b).unwrap());
            prop_assert_eq!(nearest_sorted(&axis, value), nearest_linear(&axis, value));
        }

        #[test]
        fn prop_regular_axis_matches_linear(
            start in -180.0f64..0.0,
            step in 0.01f64..1.0,
            len in 1usize..400,
            value in -200.0f64..200.0,
        ) {
            let axis: Vec<f64> = (0..len).map(|i| start + i as f64 * step).collect();
            prop_assert_eq!(nearest_index(&axis, value), Some(nearest_linear(&axis, value)));
        }
    }
}
