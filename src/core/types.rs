//! Small value types shared by the storage model and the valuation engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Dated cash amount. Positive amounts are costs when returned by cost functions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CashFlow {
    /// Payment date.
    pub date: NaiveDate,
    /// Amount in the valuation currency.
    pub amount: f64,
}

impl CashFlow {
    pub fn new(date: NaiveDate, amount: f64) -> Self {
        Self { date, amount }
    }
}

/// Reachable inventory interval for one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InventoryRange {
    pub min_inventory: f64,
    pub max_inventory: f64,
}

impl InventoryRange {
    pub fn new(min_inventory: f64, max_inventory: f64) -> Self {
        Self {
            min_inventory,
            max_inventory,
        }
    }

    /// Degenerate range holding a single inventory level.
    pub fn point(inventory: f64) -> Self {
        Self::new(inventory, inventory)
    }

    /// `true` when `min <= max` up to `tolerance`.
    #[inline]
    pub fn is_feasible(&self, tolerance: f64) -> bool {
        self.min_inventory <= self.max_inventory + tolerance
    }

    /// Intersection with another range; may be infeasible.
    pub fn intersect(&self, other: &InventoryRange) -> InventoryRange {
        InventoryRange::new(
            self.min_inventory.max(other.min_inventory),
            self.max_inventory.min(other.max_inventory),
        )
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max_inventory - self.min_inventory
    }
}
