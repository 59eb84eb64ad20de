//! Shared test utilities for the sample-collocation workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Approximate float assertions
//! - Coordinate axis and grid generators
//! - A builder for `<base>/<YYYY>/` raster directory trees
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{assert_approx_eq, regular_axis, DatedTree};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if !(diff <= epsilon) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Assert that an optional value is present and approximately equal.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_some_approx_eq;
///
/// assert_some_approx_eq!(Some(0.4200001), 0.42, 1e-6);
/// ```
#[macro_export]
macro_rules! assert_some_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        match $left {
            Some(value) => $crate::assert_approx_eq!(value, $right, $epsilon),
            None => panic!("assertion failed: expected a value ≈ {:?}, got None", $right),
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(0.0, 0.0, 0.0001);
        assert_approx_eq!(-5.5, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_rejects_nan() {
        assert_approx_eq!(f64::NAN, 1.0, 0.001);
    }

    #[test]
    fn test_assert_some_approx_eq() {
        assert_some_approx_eq!(Some(0.4200001_f64), 0.42, 1e-6);
    }

    #[test]
    #[should_panic(expected = "got None")]
    fn test_assert_some_approx_eq_none() {
        assert_some_approx_eq!(None::<f64>, 0.42, 1e-6);
    }
}
