//! Time arithmetic for schedule compilation.
//!
//! Instants are caller-supplied wall-clock values ([`NaiveDateTime`]) and are
//! used verbatim: no time-zone conversion happens anywhere in this crate.
//!
//! # Tick Model
//!
//! Durations arrive as real hours but every loop in the compiler runs on
//! integer microsecond **ticks**, so elapsed-vs-budget comparisons are exact.
//! One tick is ~2.8e-10 h, below the 1e-9 h contiguity tolerance.
//!
//! # Wire Format
//!
//! The controller firmware expects `DD-MM-YYYY_HH-MM`: zero-padded,
//! 24-hour clock, no seconds.

use chrono::{NaiveDateTime, TimeDelta};

use crate::error::CompileError;

/// Ticks (microseconds) per hour.
pub const TICKS_PER_HOUR: i64 = 3_600_000_000;

/// Timestamp format understood by the remote controller.
pub const WIRE_FORMAT: &str = "%d-%m-%Y_%H-%M";

/// Largest duration accepted by [`hours_to_ticks`] (about 100 years).
pub const MAX_HOURS: f64 = 876_000.0;

/// Converts real hours to ticks, rounding to the nearest microsecond.
///
/// Returns `None` for non-finite values or magnitudes beyond ~100 years.
pub fn hours_to_ticks(hours: f64) -> Option<i64> {
    if !hours.is_finite() || hours.abs() > MAX_HOURS {
        return None;
    }
    Some((hours * TICKS_PER_HOUR as f64).round() as i64)
}

/// Converts ticks back to real hours.
#[inline]
pub fn ticks_to_hours(ticks: i64) -> f64 {
    ticks as f64 / TICKS_PER_HOUR as f64
}

/// Shifts an instant by a number of ticks.
pub fn add_ticks(instant: NaiveDateTime, ticks: i64) -> Result<NaiveDateTime, CompileError> {
    instant
        .checked_add_signed(TimeDelta::microseconds(ticks))
        .ok_or(CompileError::TimeOutOfRange {
            hours: ticks_to_hours(ticks),
        })
}

/// Shifts an instant by real hours (may be fractional or negative).
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use u_control_schedule::time::{add_hours, format_wire};
///
/// let t = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap().and_hms_opt(22, 0, 0).unwrap();
/// let later = add_hours(t, 2.5).unwrap();
/// assert_eq!(format_wire(later), "02-03-2025_00-30");
/// ```
pub fn add_hours(instant: NaiveDateTime, hours: f64) -> Result<NaiveDateTime, CompileError> {
    let ticks = hours_to_ticks(hours).ok_or(CompileError::TimeOutOfRange { hours })?;
    add_ticks(instant, ticks)
}

/// Ticks elapsed from `from` to `to` (negative if `to` precedes `from`).
pub fn ticks_between(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    // Any span between two NaiveDateTimes fits in i64 microseconds (~292k years).
    (to - from).num_microseconds().unwrap_or(i64::MAX)
}

/// Real hours elapsed from `from` to `to`.
pub fn hours_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    ticks_between(from, to) as f64 / TICKS_PER_HOUR as f64
}

/// Formats an instant in the controller's wire format.
pub fn format_wire(instant: NaiveDateTime) -> String {
    instant.format(WIRE_FORMAT).to_string()
}

/// Parses an instant from the controller's wire format.
pub fn parse_wire(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, WIRE_FORMAT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn test_format_wire_zero_padded() {
        assert_eq!(format_wire(at(2024, 1, 5, 7, 3)), "05-01-2024_07-03");
        assert_eq!(format_wire(at(2024, 12, 31, 23, 59)), "31-12-2024_23-59");
    }

    #[test]
    fn test_format_wire_drops_seconds() {
        let t = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(10, 15, 59)
            .unwrap();
        assert_eq!(format_wire(t), "01-06-2024_10-15");
    }

    #[test]
    fn test_parse_wire() {
        assert_eq!(parse_wire("05-01-2024_07-03").unwrap(), at(2024, 1, 5, 7, 3));
        assert!(parse_wire("2024-01-05 07:03").is_err());
    }

    #[test]
    fn test_add_hours_crosses_midnight() {
        let t = add_hours(at(2024, 2, 28, 20, 0), 30.0).unwrap();
        assert_eq!(t, at(2024, 3, 1, 2, 0)); // 2024 is a leap year
    }

    #[test]
    fn test_add_fractional_hours() {
        let t = add_hours(at(2024, 1, 1, 0, 0), 0.25).unwrap();
        assert_eq!(t, at(2024, 1, 1, 0, 15));
    }

    #[test]
    fn test_add_hours_rejects_non_finite() {
        let err = add_hours(at(2024, 1, 1, 0, 0), f64::NAN).unwrap_err();
        assert!(matches!(err, CompileError::TimeOutOfRange { .. }));
    }

    #[test]
    fn test_ticks_round_trip_precision() {
        let ticks = hours_to_ticks(1.0 / 3.0).unwrap();
        assert!((ticks_to_hours(ticks) - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(hours_to_ticks(2.0), Some(2 * TICKS_PER_HOUR));
        assert_eq!(hours_to_ticks(f64::INFINITY), None);
    }

    #[test]
    fn test_hours_between() {
        let a = at(2024, 1, 1, 8, 0);
        let b = at(2024, 1, 1, 9, 30);
        assert!((hours_between(a, b) - 1.5).abs() < 1e-12);
        assert!((hours_between(b, a) + 1.5).abs() < 1e-12);
    }
}
