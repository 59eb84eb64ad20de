//! CF time axis decoding.
//!
//! Supports the `"<unit> since <reference>"` form of the `units` attribute
//! with the standard (proleptic Gregorian) calendar:
//!
//! ```text
//! days since 1970-01-01
//! seconds since 1981-01-01 00:00:00
//! hours since 1950-01-01T00:00:00Z
//! ```

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

/// Parsed `units` attribute of a time coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CfTimeUnits {
    /// Length of one unit in seconds.
    pub seconds_per_unit: f64,
    /// Reference instant the offsets count from.
    pub epoch: DateTime<Utc>,
}

impl CfTimeUnits {
    /// Parse a CF units string. Returns `None` for anything but a
    /// `<unit> since <reference>` time unit.
    pub fn parse(units: &str) -> Option<Self> {
        let units = units.trim();
        let lower = units.to_ascii_lowercase();
        let split = lower.find(" since ")?;

        let seconds_per_unit = match lower[..split].trim() {
            "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
            "minutes" | "minute" | "mins" | "min" => 60.0,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3_600.0,
            "days" | "day" | "d" => 86_400.0,
            _ => return None,
        };

        let epoch = parse_reference(&units[split + " since ".len()..])?;
        Some(Self {
            seconds_per_unit,
            epoch,
        })
    }

    /// Instant of an offset on this axis. Non-finite offsets have none.
    pub fn to_datetime(&self, value: f64) -> Option<DateTime<Utc>> {
        if !value.is_finite() {
            return None;
        }
        let millis = (value * self.seconds_per_unit * 1_000.0).round();
        if millis.abs() >= i64::MAX as f64 {
            return None;
        }
        self.epoch
            .checked_add_signed(Duration::milliseconds(millis as i64))
    }
}

/// Decode raw time offsets. `None` if the units or any value cannot be
/// decoded.
pub fn decode_times(values: &[f64], units: &str) -> Option<Vec<DateTime<Utc>>> {
    let units = CfTimeUnits::parse(units)?;
    values.iter().map(|&v| units.to_datetime(v)).collect()
}

fn parse_reference(reference: &str) -> Option<DateTime<Utc>> {
    let reference = reference.trim();
    let reference = reference
        .strip_suffix("UTC")
        .or_else(|| reference.strip_suffix('Z'))
        .unwrap_or(reference)
        .trim();

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(reference, format) {
            return Some(dt.and_utc());
        }
    }

    NaiveDate::parse_from_str(reference, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc())
}
