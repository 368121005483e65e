//! Module `rates::day_count`.
//!
//! Implements the day-count conventions used to turn cash-flow dates into year fractions for
//! discounting, with `year_fraction` as the single entry point.
//!
//! Key types and purpose: `DayCountConvention` selects the accrual rule.
//!
//! Numerical considerations: storage cash flows settle on a daily grid, so the fractions here are
//! evaluated millions of times per valuation; they are kept branch-light and allocation-free.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Supported day-count conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DayCountConvention {
    /// Actual day count over a 360-day year.
    Act360,
    /// Actual day count over a 365-day year.
    #[default]
    Act365Fixed,
}

/// Computes year fraction between two dates under a day-count convention.
///
/// Edge cases:
/// - If `start == end`, returns `0.0`.
/// - If `start > end`, the result is negative and antisymmetric.
///
/// # Examples
/// ```rust
/// use chrono::NaiveDate;
/// use ferric_storage::rates::{DayCountConvention, year_fraction};
///
/// let s = NaiveDate::from_ymd_opt(2019, 8, 29).unwrap();
/// let e = NaiveDate::from_ymd_opt(2020, 8, 28).unwrap();
/// let yf = year_fraction(s, e, DayCountConvention::Act365Fixed);
/// assert!((yf - 365.0 / 365.0).abs() < 1.0e-12);
/// ```
pub fn year_fraction(start: NaiveDate, end: NaiveDate, convention: DayCountConvention) -> f64 {
    if start == end {
        return 0.0;
    }
    if start > end {
        return -year_fraction(end, start, convention);
    }

    match convention {
        DayCountConvention::Act360 => (end - start).num_days() as f64 / 360.0,
        DayCountConvention::Act365Fixed => (end - start).num_days() as f64 / 365.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn act365_counts_calendar_days() {
        assert_relative_eq!(
            year_fraction(d(2019, 8, 29), d(2019, 9, 20), DayCountConvention::Act365Fixed),
            22.0 / 365.0,
            epsilon = 1e-15
        );
    }

    #[test]
    fn act360_is_antisymmetric() {
        let a = year_fraction(d(2020, 1, 1), d(2020, 7, 1), DayCountConvention::Act360);
        let b = year_fraction(d(2020, 7, 1), d(2020, 1, 1), DayCountConvention::Act360);
        assert_relative_eq!(a, -b, epsilon = 1e-15);
        assert_relative_eq!(a, 182.0 / 360.0, epsilon = 1e-15);
    }
}
