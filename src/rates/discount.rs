//! Module `rates::discount`.
//!
//! Discount functions `(from, to) -> factor` used to present-value storage cash flows, and the
//! per-valuation memo that avoids recomputing factors for repeated settlement dates.
//!
//! Key types and purpose: `Discounter` is the seam the engine depends on;
//! `ContinuousCompoundingDiscounter` is the default Act/365 continuously compounded curve with
//! linearly interpolated zero rates; `DiscountCache` memoises factors to a fixed valuation date.
//!
//! Numerical considerations: the cache is bounded by the number of distinct settlement dates, so
//! it needs no eviction. Factors are positive by construction for finite rates.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;

use crate::core::{StorageError, StorageResult};
use crate::math::{Interpolator, LinearInterpolator};
use crate::rates::day_count::{DayCountConvention, year_fraction};

/// Discount factor provider between two dates.
pub trait Discounter: Send + Sync {
    /// Discount factor from `to` back to `from`.
    fn discount_factor(&self, from: NaiveDate, to: NaiveDate) -> f64;
}

impl<F> Discounter for F
where
    F: Fn(NaiveDate, NaiveDate) -> f64 + Send + Sync,
{
    fn discount_factor(&self, from: NaiveDate, to: NaiveDate) -> f64 {
        self(from, to)
    }
}

/// Continuously compounded zero-rate curve.
///
/// The zero rate for a cash flow is looked up at its payment date (pillar dates are linearly
/// interpolated, flat beyond the ends) and applied over the year fraction between the dates.
#[derive(Debug, Clone)]
pub struct ContinuousCompoundingDiscounter {
    pillars: Vec<NaiveDate>,
    rates: LinearInterpolator,
    day_count: DayCountConvention,
}

impl ContinuousCompoundingDiscounter {
    /// Flat continuously compounded rate under Act/365.
    pub fn flat(rate: f64) -> StorageResult<Self> {
        if !rate.is_finite() {
            return Err(StorageError::InvalidInput(
                "discount rate must be finite".to_string(),
            ));
        }
        Ok(Self {
            pillars: vec![NaiveDate::MIN],
            rates: LinearInterpolator::new(vec![0.0], vec![rate])?,
            day_count: DayCountConvention::Act365Fixed,
        })
    }

    /// Zero-rate pillars `(date, rate)`, strictly increasing in date.
    pub fn from_zero_rates(pillars: &[(NaiveDate, f64)]) -> StorageResult<Self> {
        let Some(&(anchor, _)) = pillars.first() else {
            return Err(StorageError::InvalidInput(
                "zero-rate pillars cannot be empty".to_string(),
            ));
        };
        let x = pillars
            .iter()
            .map(|(d, _)| (*d - anchor).num_days() as f64)
            .collect();
        let y = pillars.iter().map(|(_, r)| *r).collect();
        Ok(Self {
            pillars: pillars.iter().map(|(d, _)| *d).collect(),
            rates: LinearInterpolator::new(x, y)?,
            day_count: DayCountConvention::Act365Fixed,
        })
    }

    /// Uses a different day count for the accrual fraction.
    pub fn with_day_count(mut self, day_count: DayCountConvention) -> Self {
        self.day_count = day_count;
        self
    }

    /// Interpolated zero rate at `date`, flat before the first and after the last pillar.
    pub fn zero_rate(&self, date: NaiveDate) -> f64 {
        let x = (date - self.pillars[0]).num_days() as f64;
        self.rates.value(x)
    }
}

impl Discounter for ContinuousCompoundingDiscounter {
    fn discount_factor(&self, from: NaiveDate, to: NaiveDate) -> f64 {
        let t = year_fraction(from, to, self.day_count);
        (-self.zero_rate(to) * t).exp()
    }
}

/// Memoised discount factors from cash-flow dates back to one valuation date.
pub struct DiscountCache {
    discounter: Arc<dyn Discounter>,
    to_date: NaiveDate,
    cache: Mutex<HashMap<NaiveDate, f64>>,
}

impl DiscountCache {
    pub fn new(discounter: Arc<dyn Discounter>, to_date: NaiveDate) -> Self {
        Self {
            discounter,
            to_date,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Factor discounting a cash flow on `date` to the valuation date.
    pub fn factor(&self, date: NaiveDate) -> f64 {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        *cache
            .entry(date)
            .or_insert_with(|| self.discounter.discount_factor(self.to_date, date))
    }

    /// Number of distinct dates seen so far.
    pub fn len(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for DiscountCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscountCache")
            .field("to_date", &self.to_date)
            .field("cached", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn flat_rate_matches_act365_continuous_compounding() {
        let disc = ContinuousCompoundingDiscounter::flat(0.055).unwrap();
        let df = disc.discount_factor(d(2019, 8, 29), d(2019, 9, 20));
        assert_relative_eq!(df, (-0.055_f64 * 22.0 / 365.0).exp(), epsilon = 1e-15);
        assert_relative_eq!(disc.discount_factor(d(2020, 1, 1), d(2020, 1, 1)), 1.0);
    }

    #[test]
    fn zero_rates_interpolate_between_pillars() {
        let disc = ContinuousCompoundingDiscounter::from_zero_rates(&[
            (d(2020, 1, 1), 0.02),
            (d(2020, 1, 11), 0.04),
        ])
        .unwrap();
        assert_relative_eq!(disc.zero_rate(d(2020, 1, 6)), 0.03, epsilon = 1e-14);
        assert_relative_eq!(disc.zero_rate(d(2019, 6, 1)), 0.02, epsilon = 1e-14);
        assert_relative_eq!(disc.zero_rate(d(2021, 6, 1)), 0.04, epsilon = 1e-14);
    }

    #[test]
    fn invalid_pillars_fail_at_construction() {
        assert!(ContinuousCompoundingDiscounter::from_zero_rates(&[]).is_err());
        assert!(
            ContinuousCompoundingDiscounter::from_zero_rates(&[
                (d(2020, 1, 11), 0.02),
                (d(2020, 1, 1), 0.04),
            ])
            .is_err()
        );
        assert!(
            ContinuousCompoundingDiscounter::from_zero_rates(&[(d(2020, 1, 1), f64::NAN)]).is_err()
        );
        let single = ContinuousCompoundingDiscounter::from_zero_rates(&[(d(2020, 1, 1), 0.03)]).unwrap();
        assert_eq!(single.zero_rate(d(1990, 1, 1)), 0.03);
        assert_eq!(single.zero_rate(d(2090, 1, 1)), 0.03);
    }

    #[test]
    fn act360_day_count_changes_accrual() {
        let disc = ContinuousCompoundingDiscounter::flat(0.05)
            .unwrap()
            .with_day_count(DayCountConvention::Act360);
        let df = disc.discount_factor(d(2020, 1, 1), d(2020, 3, 1));
        assert_relative_eq!(df, (-0.05_f64 * 60.0 / 360.0).exp(), epsilon = 1e-15);
    }

    #[test]
    fn cache_calls_discounter_once_per_date() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let disc = move |from: NaiveDate, to: NaiveDate| {
            counter.fetch_add(1, Ordering::SeqCst);
            (-(to - from).num_days() as f64 * 0.0001).exp()
        };
        let cache = DiscountCache::new(Arc::new(disc), d(2020, 1, 1));
        let a = cache.factor(d(2020, 2, 20));
        let b = cache.factor(d(2020, 2, 20));
        let _ = cache.factor(d(2020, 3, 20));
        assert_eq!(a, b);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }
}
