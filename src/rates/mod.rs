//! Day counts and discounting for storage cash flows.

pub mod day_count;
pub mod discount;

pub use day_count::{DayCountConvention, year_fraction};
pub use discount::{ContinuousCompoundingDiscounter, DiscountCache, Discounter};
