//! Module `storage::decisions`.
//!
//! Discrete decision sets and next-period grid lookups used inside backward induction.
//!
//! Key functions: `bang_bang_decision_set` builds the candidate injection/withdrawal volumes for
//! one `(period, inventory)` state; `bisect_inventory_space` and `GridWeights` locate a
//! post-decision inventory on the next period's grid.
//!
//! Numerical considerations: all comparisons use the caller's numerical tolerance. Decisions that
//! differ by less than it are merged, and inventories within it of a grid node are treated as
//! lying on the node.
use crate::core::{StorageError, StorageResult};
use crate::math::interpolation::linear_weights;
use crate::storage::constraints::InjectWithdrawRange;

/// Candidate decision volumes, ascending and without duplicates.
///
/// The extremes of `range` are clipped so that `inventory + decision - loss` stays inside
/// `[next_min, next_max]`; zero is kept when it is feasible; `num_extra` evenly spaced decisions
/// are inserted between every consecutive pair of those.
pub fn bang_bang_decision_set(
    range: InjectWithdrawRange,
    inventory: f64,
    loss: f64,
    next_min: f64,
    next_max: f64,
    tolerance: f64,
    num_extra: usize,
) -> StorageResult<Vec<f64>> {
    let kept = inventory - loss;
    let lowest = next_min - kept;
    let highest = next_max - kept;
    let min_decision = range.min_rate.max(lowest);
    let max_decision = range.max_rate.min(highest);
    if max_decision < min_decision - tolerance {
        return Err(StorageError::InfeasibleConstraints(format!(
            "no decision at inventory {inventory} reaches [{next_min}, {next_max}]"
        )));
    }
    let max_decision = max_decision.max(min_decision);

    let mut core = Vec::with_capacity(3);
    core.push(min_decision);
    if min_decision < -tolerance && max_decision > tolerance {
        core.push(0.0);
    }
    if max_decision - min_decision > tolerance {
        core.push(max_decision);
    }

    let mut decisions = Vec::with_capacity(core.len() + (core.len() - 1) * num_extra);
    for (i, &d) in core.iter().enumerate() {
        decisions.push(d);
        if let Some(&next) = core.get(i + 1) {
            let step = (next - d) / (num_extra + 1) as f64;
            decisions.extend((1..=num_extra).map(|k| d + step * k as f64));
        }
    }
    decisions.dedup_by(|b, a| (*b - *a).abs() <= tolerance);
    Ok(decisions)
}

/// Indices `(lower, upper)` of the grid nodes bracketing `inventory`.
///
/// Returns equal indices when the inventory sits on a node (within `tolerance` below the bottom or
/// above the top, or exactly on an interior node). An inventory on the top node is reported as the
/// last bracket.
pub fn bisect_inventory_space(grid: &[f64], inventory: f64, tolerance: f64) -> StorageResult<(usize, usize)> {
    let Some((&first, &last)) = grid.first().zip(grid.last()) else {
        return Err(StorageError::InvalidInput(
            "inventory grid cannot be empty".to_string(),
        ));
    };
    if inventory < first - tolerance || inventory > last + tolerance {
        return Err(StorageError::OutOfRange {
            value: inventory,
            min: first,
            max: last,
        });
    }
    let n = grid.len();
    if n == 1 || inventory <= first {
        return Ok((0, 0));
    }
    if inventory > last {
        return Ok((n - 1, n - 1));
    }

    let (mut lo, mut hi) = (0, n - 1);
    while hi - lo > 1 {
        let mid = (lo + hi) / 2;
        let node = grid[mid];
        if (node - inventory).abs() <= tolerance {
            return Ok((mid, mid));
        }
        if inventory < node {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Ok((lo, hi))
}

/// Linear interpolation weights of an inventory on a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridWeights {
    pub lower: usize,
    pub upper: usize,
    pub lower_weight: f64,
    pub upper_weight: f64,
}

impl GridWeights {
    pub fn locate(grid: &[f64], inventory: f64, tolerance: f64) -> StorageResult<Self> {
        let (lower, upper) = bisect_inventory_space(grid, inventory, tolerance)?;
        if lower == upper {
            return Ok(Self {
                lower,
                upper,
                lower_weight: 1.0,
                upper_weight: 0.0,
            });
        }
        let (lower_weight, upper_weight) = linear_weights(grid[lower], grid[upper], inventory);
        Ok(Self {
            lower,
            upper,
            lower_weight,
            upper_weight,
        })
    }

    /// Blends `values[lower]` and `values[upper]`.
    #[inline]
    pub fn blend(&self, lower_value: f64, upper_value: f64) -> f64 {
        if self.lower == self.upper {
            lower_value
        } else {
            self.lower_weight * lower_value + self.upper_weight * upper_value
        }
    }
}
