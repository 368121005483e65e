//! Daily time series keyed by `chrono::NaiveDate`.
//!
//! Storage valuation runs on a daily period grid, so every curve (forward prices, spot vols,
//! inventory space, deltas) is a contiguous run of days starting at a fixed date.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::core::{StorageError, StorageResult};

/// Returns `date` shifted by `days` calendar days.
#[inline]
pub fn offset_days(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

/// Number of calendar days from `from` to `to` (negative when `to` precedes `from`).
#[inline]
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Inclusive iterator over the days in `[start, end]`.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

/// Contiguous daily series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySeries<V> {
    start: NaiveDate,
    values: Vec<V>,
}

impl<V> DailySeries<V> {
    /// Creates a series whose first value falls on `start`.
    pub fn new(start: NaiveDate, values: Vec<V>) -> Self {
        Self { start, values }
    }

    /// Series without any values.
    pub fn empty() -> Self {
        Self {
            start: NaiveDate::MIN,
            values: Vec::new(),
        }
    }

    /// Builds a series over `[start, end]` by evaluating `f` on every day.
    pub fn from_fn<F>(start: NaiveDate, end: NaiveDate, f: F) -> Self
    where
        F: FnMut(NaiveDate) -> V,
    {
        Self {
            start,
            values: days_inclusive(start, end).map(f).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First date, `None` for an empty series.
    pub fn start(&self) -> Option<NaiveDate> {
        (!self.values.is_empty()).then_some(self.start)
    }

    /// Last date, `None` for an empty series.
    pub fn end(&self) -> Option<NaiveDate> {
        (!self.values.is_empty()).then(|| offset_days(self.start, self.values.len() as i64 - 1))
    }

    #[inline]
    fn index_of(&self, date: NaiveDate) -> Option<usize> {
        let idx = days_between(self.start, date);
        (idx >= 0 && (idx as usize) < self.values.len()).then_some(idx as usize)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.index_of(date).is_some()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&V> {
        self.index_of(date).map(|i| &self.values[i])
    }

    pub fn get_mut(&mut self, date: NaiveDate) -> Option<&mut V> {
        self.index_of(date).map(|i| &mut self.values[i])
    }

    /// Like [`DailySeries::get`] but reports the missing date as an error.
    pub fn value(&self, date: NaiveDate) -> StorageResult<&V> {
        self.get(date).ok_or_else(|| {
            StorageError::InvalidInput(format!("time series has no value for {date}"))
        })
    }

    pub fn values(&self) -> &[V] {
        &self.values
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.values.len()).map(move |i| offset_days(self.start, i as i64))
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &V)> + '_ {
        self.dates().zip(self.values.iter())
    }

    /// Maps values while keeping the dates.
    pub fn map<U, F>(&self, f: F) -> DailySeries<U>
    where
        F: FnMut(&V) -> U,
    {
        DailySeries {
            start: self.start,
            values: self.values.iter().map(f).collect(),
        }
    }
}

impl<V> Default for DailySeries<V> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn from_fn_covers_inclusive_range() {
        let s = DailySeries::from_fn(d(2020, 2, 27), d(2020, 3, 2), |date| days_between(d(2020, 2, 27), date));
        assert_eq!(s.len(), 5);
        assert_eq!(s.start(), Some(d(2020, 2, 27)));
        assert_eq!(s.end(), Some(d(2020, 3, 2)));
        assert_eq!(s.get(d(2020, 2, 29)), Some(&2));
        assert_eq!(s.get(d(2020, 3, 3)), None);
        assert_eq!(s.get(d(2020, 2, 26)), None);
    }

    #[test]
    fn empty_series_has_no_bounds() {
        let s: DailySeries<f64> = DailySeries::empty();
        assert!(s.is_empty());
        assert_eq!(s.start(), None);
        assert_eq!(s.end(), None);
        assert!(s.value(d(2020, 1, 1)).is_err());
    }

    #[test]
    fn iter_pairs_dates_with_values() {
        let s = DailySeries::new(d(2019, 12, 31), vec![1.0, 2.0]);
        let pairs: Vec<_> = s.iter().map(|(date, v)| (date, *v)).collect();
        assert_eq!(pairs, vec![(d(2019, 12, 31), 1.0), (d(2020, 1, 1), 2.0)]);
    }
}
