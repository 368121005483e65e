//! Core error type, dated series, and shared value types.

pub mod error;
pub mod time_series;
pub mod types;

pub use error::{StorageError, StorageResult};
pub use time_series::{DailySeries, days_between, days_inclusive, offset_days};
pub use types::{CashFlow, InventoryRange};
