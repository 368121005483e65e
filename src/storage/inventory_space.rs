//! Reachable inventory space.
//!
//! A forward pass propagates the interval reachable from the starting inventory. For contracts that
//! must be empty at the end, a backward pass from the terminal `[0, 0]` interval removes
//! inventories from which emptying in time is impossible.

use chrono::NaiveDate;
use log::debug;

use crate::core::{DailySeries, InventoryRange, StorageError, StorageResult, offset_days};
use crate::storage::contract::CmdtyStorage;

/// Reachable inventory interval for every period after `max(current, storage start)` up to and
/// including the storage end.
///
/// Returns an empty series when there is no such period.
pub fn calculate_inventory_space(
    storage: &CmdtyStorage,
    inventory: f64,
    current: NaiveDate,
    tolerance: f64,
) -> StorageResult<DailySeries<InventoryRange>> {
    let first_active = current.max(storage.start());
    if first_active >= storage.end() {
        return Ok(DailySeries::empty());
    }

    let mut forward = Vec::new();
    let mut lo = inventory;
    let mut hi = inventory;
    let mut date = first_active;
    while date < storage.end() {
        let loss = storage.inventory_percent_loss(date);
        let constraint = storage.constraint(date)?;
        let next = offset_days(date, 1);
        let range_at_lo = constraint.range_within(lo, tolerance)?;
        let range_at_hi = constraint.range_within(hi, tolerance)?;
        let next_lo = (lo * (1.0 - loss) + range_at_lo.min_rate).max(storage.min_inventory(next)?);
        let next_hi = (hi * (1.0 - loss) + range_at_hi.max_rate).min(storage.max_inventory(next)?);
        if next_lo > next_hi + tolerance {
            return Err(StorageError::InfeasibleConstraints(format!(
                "inventory space on {next} is empty: [{next_lo}, {next_hi}]"
            )));
        }
        forward.push(InventoryRange::new(next_lo, next_hi));
        lo = next_lo;
        hi = next_hi;
        date = next;
    }

    if storage.must_be_empty_at_end() {
        apply_backward_pass(storage, first_active, &mut forward, tolerance)?;
    }

    debug!(
        "inventory space from {} covers {} periods",
        offset_days(first_active, 1),
        forward.len()
    );
    Ok(DailySeries::new(offset_days(first_active, 1), forward))
}

/// Intersects `space` (indexed from `first_active + 1`) with the backward-reachable intervals.
fn apply_backward_pass(
    storage: &CmdtyStorage,
    first_active: NaiveDate,
    space: &mut [InventoryRange],
    tolerance: f64,
) -> StorageResult<()> {
    let Some(last) = space.len().checked_sub(1) else {
        return Ok(());
    };
    let end = storage.end();
    space[last] = space[last].intersect(&InventoryRange::new(
        storage.min_inventory(end)?,
        storage.max_inventory(end)?,
    ));
    if !space[last].is_feasible(tolerance) {
        return Err(StorageError::InfeasibleConstraints(format!(
            "inventory cannot be brought to [{}, {}] by {end}",
            storage.min_inventory(end)?,
            storage.max_inventory(end)?
        )));
    }

    // space[i] is the range on first_active + 1 + i
    for i in (0..last).rev() {
        let date = offset_days(first_active, i as i64 + 1);
        let next = space[i + 1];
        let current = space[i];
        let loss = storage.inventory_percent_loss(date);
        let constraint = storage.constraint(date)?;

        let upper = constraint.inventory_space_upper_bound(
            next.min_inventory,
            next.max_inventory,
            current.min_inventory,
            current.max_inventory,
            loss,
        )?;
        let lower = constraint.inventory_space_lower_bound(
            next.min_inventory,
            next.max_inventory,
            current.min_inventory,
            current.max_inventory,
            loss,
        )?;
        let backward = InventoryRange::new(
            lower.max(storage.min_inventory(date)?),
            upper.min(storage.max_inventory(date)?),
        );
        let combined = current.intersect(&backward);
        if !combined.is_feasible(tolerance) {
            return Err(StorageError::InfeasibleConstraints(format!(
                "inventory space on {date} is empty: [{}, {}]",
                combined.min_inventory, combined.max_inventory
            )));
        }
        space[i] = combined;
    }
    Ok(())
}
