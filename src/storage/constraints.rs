//! Module `storage::constraints`.
//!
//! Inventory-dependent injection/withdrawal rate constraints ("ratchets") and the inventory-space
//! boundary solvers built on them.
//!
//! Key types and purpose: `InjectWithdrawRange` is the `(min_rate, max_rate)` pair for one
//! period and inventory (withdrawal rates are negative); `InjectWithdrawRangeByInventory` is one
//! pillar; `InjectWithdrawConstraint` is the closed family of pillar interpolation schemes.
//!
//! Numerical considerations: the post-decision inventory `x * (1 - loss) + rate(x)` is affine in
//! `x` inside every pillar bracket for all three schemes, so the boundary solvers invert it exactly
//! with one linear solve per bracket instead of a root finder.
use serde::{Deserialize, Serialize};

use crate::core::{StorageError, StorageResult};
use crate::math::interpolate_linear_and_solve;
use crate::math::interpolation::linear_weights;

const STEP_RATE_TOLERANCE: f64 = 1e-12;

/// Feasible injection/withdrawal rates. `min_rate <= 0` is the maximum withdrawal,
/// `max_rate >= 0` the maximum injection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InjectWithdrawRange {
    pub min_rate: f64,
    pub max_rate: f64,
}

impl InjectWithdrawRange {
    pub fn new(min_rate: f64, max_rate: f64) -> Self {
        Self { min_rate, max_rate }
    }
}

impl From<(f64, f64)> for InjectWithdrawRange {
    fn from((min_rate, max_rate): (f64, f64)) -> Self {
        Self::new(min_rate, max_rate)
    }
}

/// One ratchet pillar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InjectWithdrawRangeByInventory {
    pub inventory: f64,
    pub range: InjectWithdrawRange,
}

impl InjectWithdrawRangeByInventory {
    pub fn new(inventory: f64, range: InjectWithdrawRange) -> Self {
        Self { inventory, range }
    }
}

impl From<(f64, (f64, f64))> for InjectWithdrawRangeByInventory {
    fn from((inventory, range): (f64, (f64, f64))) -> Self {
        Self::new(inventory, range.into())
    }
}

/// Interpolation scheme requested for a ratchet table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RatchetInterpolation {
    /// Rates of the pillar at or below the inventory.
    #[default]
    PiecewiseFlat,
    /// Piecewise flat where the top two pillars must agree (storage "full" above the last step).
    Step,
    /// Rates linearly interpolated between pillars.
    PiecewiseLinear,
    /// Accepted for compatibility; treated as `PiecewiseLinear`.
    Polynomial,
}

/// Ratchet pillars sorted by inventory, at least two of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatchetPillars {
    pillars: Vec<InjectWithdrawRangeByInventory>,
}

impl RatchetPillars {
    pub fn new<I, P>(pillars: I) -> StorageResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<InjectWithdrawRangeByInventory>,
    {
        let mut pillars: Vec<InjectWithdrawRangeByInventory> =
            pillars.into_iter().map(Into::into).collect();
        if pillars.len() < 2 {
            return Err(StorageError::InvalidInput(
                "Inject/withdraw ranges collection must contain at least two elements.".to_string(),
            ));
        }
        for p in &pillars {
            if !p.inventory.is_finite() || !p.range.min_rate.is_finite() || !p.range.max_rate.is_finite()
            {
                return Err(StorageError::InvalidInput(
                    "ratchet pillars must be finite".to_string(),
                ));
            }
            if p.range.min_rate > p.range.max_rate {
                return Err(StorageError::InvalidInput(format!(
                    "ratchet at inventory {} has min rate {} above max rate {}",
                    p.inventory, p.range.min_rate, p.range.max_rate
                )));
            }
        }
        pillars.sort_by(|a, b| a.inventory.total_cmp(&b.inventory));
        if pillars.windows(2).any(|w| w[0].inventory == w[1].inventory) {
            return Err(StorageError::InvalidInput(
                "ratchet pillar inventories must be distinct".to_string(),
            ));
        }
        Ok(Self { pillars })
    }

    pub fn as_slice(&self) -> &[InjectWithdrawRangeByInventory] {
        &self.pillars
    }

    #[inline]
    fn min_inventory(&self) -> f64 {
        self.pillars[0].inventory
    }

    #[inline]
    fn max_inventory(&self) -> f64 {
        self.pillars[self.pillars.len() - 1].inventory
    }

    /// Index of the pillar at or below `inventory`, which must already be inside the table.
    #[inline]
    fn floor_index(&self, inventory: f64) -> usize {
        self.pillars
            .partition_point(|p| p.inventory <= inventory)
            .saturating_sub(1)
    }
}

/// Inventory-dependent rate constraint for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InjectWithdrawConstraint {
    PiecewiseFlat(RatchetPillars),
    Step(RatchetPillars),
    PiecewiseLinear(RatchetPillars),
}

impl InjectWithdrawConstraint {
    /// Builds the constraint for `kind`, validating the pillars.
    pub fn new<I, P>(kind: RatchetInterpolation, pillars: I) -> StorageResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<InjectWithdrawRangeByInventory>,
    {
        let pillars = RatchetPillars::new(pillars)?;
        match kind {
            RatchetInterpolation::PiecewiseFlat => Ok(Self::PiecewiseFlat(pillars)),
            RatchetInterpolation::PiecewiseLinear | RatchetInterpolation::Polynomial => {
                Ok(Self::PiecewiseLinear(pillars))
            }
            RatchetInterpolation::Step => {
                let n = pillars.pillars.len();
                let second = pillars.pillars[n - 2].range;
                let top = pillars.pillars[n - 1].range;
                if (second.max_rate - top.max_rate).abs() > STEP_RATE_TOLERANCE {
                    return Err(StorageError::InvalidInput(
                        "Top two ratchets do not have the same max injection rate.".to_string(),
                    ));
                }
                if (second.min_rate - top.min_rate).abs() > STEP_RATE_TOLERANCE {
                    return Err(StorageError::InvalidInput(
                        "Top two ratchets do not have the same max withdrawal rate.".to_string(),
                    ));
                }
                Ok(Self::Step(pillars))
            }
        }
    }

    pub fn piecewise_flat<I, P>(pillars: I) -> StorageResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<InjectWithdrawRangeByInventory>,
    {
        Self::new(RatchetInterpolation::PiecewiseFlat, pillars)
    }

    pub fn step<I, P>(pillars: I) -> StorageResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<InjectWithdrawRangeByInventory>,
    {
        Self::new(RatchetInterpolation::Step, pillars)
    }

    pub fn piecewise_linear<I, P>(pillars: I) -> StorageResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<InjectWithdrawRangeByInventory>,
    {
        Self::new(RatchetInterpolation::PiecewiseLinear, pillars)
    }

    /// Same rates at every inventory in `[min_inventory, max_inventory]`.
    pub fn constant(
        range: InjectWithdrawRange,
        min_inventory: f64,
        max_inventory: f64,
    ) -> StorageResult<Self> {
        if !min_inventory.is_finite() || !max_inventory.is_finite() || min_inventory >= max_inventory
        {
            return Err(StorageError::InvalidInput(format!(
                "min inventory {min_inventory} must be below max inventory {max_inventory}"
            )));
        }
        Self::piecewise_flat([
            InjectWithdrawRangeByInventory::new(min_inventory, range),
            InjectWithdrawRangeByInventory::new(max_inventory, range),
        ])
    }

    pub fn pillars(&self) -> &RatchetPillars {
        match self {
            Self::PiecewiseFlat(p) | Self::Step(p) | Self::PiecewiseLinear(p) => p,
        }
    }

    /// Lowest pillar inventory.
    pub fn min_inventory(&self) -> f64 {
        self.pillars().min_inventory()
    }

    /// Highest pillar inventory.
    pub fn max_inventory(&self) -> f64 {
        self.pillars().max_inventory()
    }

    /// Rates at `inventory`, which must lie inside the pillar interval.
    pub fn range_at(&self, inventory: f64) -> StorageResult<InjectWithdrawRange> {
        let table = self.pillars();
        let (lo, hi) = (table.min_inventory(), table.max_inventory());
        if !(lo..=hi).contains(&inventory) {
            return Err(StorageError::OutOfRange {
                value: inventory,
                min: lo,
                max: hi,
            });
        }
        let i = table.floor_index(inventory);
        let p = &table.pillars;
        match self {
            Self::PiecewiseFlat(_) | Self::Step(_) => Ok(p[i].range),
            Self::PiecewiseLinear(_) => {
                if i + 1 >= p.len() || p[i].inventory == inventory {
                    return Ok(p[i].range);
                }
                let (w0, w1) = linear_weights(p[i].inventory, p[i + 1].inventory, inventory);
                Ok(InjectWithdrawRange::new(
                    w0 * p[i].range.min_rate + w1 * p[i + 1].range.min_rate,
                    w0 * p[i].range.max_rate + w1 * p[i + 1].range.max_rate,
                ))
            }
        }
    }

    /// Like [`range_at`](Self::range_at) but snaps inventories within `tolerance` of the pillar
    /// interval onto it first.
    pub fn range_within(&self, inventory: f64, tolerance: f64) -> StorageResult<InjectWithdrawRange> {
        let (lo, hi) = (self.min_inventory(), self.max_inventory());
        let snapped = if inventory < lo && inventory >= lo - tolerance {
            lo
        } else if inventory > hi && inventory <= hi + tolerance {
            hi
        } else {
            inventory
        };
        self.range_at(snapped)
    }

    /// Rates used at the two ends of bracket `i` (pillars `i` and `i + 1`).
    #[inline]
    fn bracket_rates(&self, i: usize) -> (InjectWithdrawRange, InjectWithdrawRange) {
        let p = &self.pillars().pillars;
        match self {
            Self::PiecewiseFlat(_) | Self::Step(_) => (p[i].range, p[i].range),
            Self::PiecewiseLinear(_) => (p[i].range, p[i + 1].range),
        }
    }

    /// Largest current inventory from which the next period's interval
    /// `[next_lower, next_upper]` can still be reached.
    pub fn inventory_space_upper_bound(
        &self,
        next_lower: f64,
        next_upper: f64,
        _current_min: f64,
        current_max: f64,
        loss: f64,
    ) -> StorageResult<f64> {
        let at_max = self.range_at(current_max)?;
        let kept = current_max * (1.0 - loss);
        if kept + at_max.min_rate <= next_upper && next_lower <= kept + at_max.max_rate {
            return Ok(current_max);
        }

        let p = &self.pillars().pillars;
        let mut solution = None;
        for i in 0..p.len() - 1 {
            let (lower_rates, upper_rates) = self.bracket_rates(i);
            let x0 = p[i].inventory;
            let x1 = p[i + 1].inventory;
            let y0 = x0 * (1.0 - loss) + lower_rates.min_rate;
            let y1 = x1 * (1.0 - loss) + upper_rates.min_rate;
            if y0 <= next_upper && next_upper <= y1 {
                solution = Some(interpolate_linear_and_solve(x0, y0, x1, y1, next_upper));
            }
        }
        solution.ok_or_else(|| {
            StorageError::InfeasibleConstraints(format!(
                "no inventory can be withdrawn down to next period upper bound {next_upper}"
            ))
        })
    }

    /// Smallest current inventory from which the next period's interval
    /// `[next_lower, next_upper]` can still be reached.
    pub fn inventory_space_lower_bound(
        &self,
        next_lower: f64,
        next_upper: f64,
        current_min: f64,
        _current_max: f64,
        loss: f64,
    ) -> StorageResult<f64> {
        let at_min = self.range_at(current_min)?;
        let kept = current_min * (1.0 - loss);
        if kept + at_min.min_rate <= next_upper && next_lower <= kept + at_min.max_rate {
            return Ok(current_min);
        }

        let p = &self.pillars().pillars;
        let mut solution = None;
        for i in (0..p.len() - 1).rev() {
            let (lower_rates, upper_rates) = self.bracket_rates(i);
            let x0 = p[i].inventory;
            let x1 = p[i + 1].inventory;
            let y0 = x0 * (1.0 - loss) + lower_rates.max_rate;
            let y1 = x1 * (1.0 - loss) + upper_rates.max_rate;
            if y0 <= next_lower && next_lower <= y1 {
                solution = Some(interpolate_linear_and_solve(x0, y0, x1, y1, next_lower));
            }
        }
        solution.ok_or_else(|| {
            StorageError::InfeasibleConstraints(format!(
                "no inventory can be injected up to next period lower bound {next_lower}"
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ratchets() -> Vec<(f64, (f64, f64))> {
        vec![
            (0.0, (-44.85, 56.8)),
            (100.0, (-45.01, 54.5)),
            (300.0, (-45.78, 52.01)),
            (600.0, (-46.17, 51.9)),
            (800.0, (-46.99, 50.8)),
            (1000.0, (-46.99, 50.8)),
        ]
    }

    fn constant_pillars() -> Vec<(f64, (f64, f64))> {
        [0.0, 100.0, 300.0, 600.0, 800.0, 1000.0]
            .into_iter()
            .map(|inv| (inv, (-47.12, 56.8)))
            .collect()
    }

    #[test]
    fn flat_lookup_uses_pillar_at_or_below() {
        let c = InjectWithdrawConstraint::piecewise_flat(ratchets()).unwrap();
        for (inv, min, max) in [(99.0, -44.85, 56.8), (610.85, -46.17, 51.9), (999.99, -46.99, 50.8)]
        {
            assert_eq!(c.range_at(inv).unwrap(), InjectWithdrawRange::new(min, max));
        }
        for (inv, (min, max)) in ratchets() {
            assert_eq!(c.range_at(inv).unwrap(), InjectWithdrawRange::new(min, max));
        }
    }

    #[test]
    fn lookup_outside_pillars_reports_interval() {
        let c = InjectWithdrawConstraint::step(ratchets()).unwrap();
        assert_eq!(
            c.range_at(-0.01),
            Err(StorageError::OutOfRange {
                value: -0.01,
                min: 0.0,
                max: 1000.0
            })
        );
        assert!(c.range_at(1000.001).is_err());
        assert!(c.range_within(1000.0 + 1e-11, 1e-10).is_ok());
    }

    #[test]
    fn linear_lookup_interpolates_rates() {
        let c = InjectWithdrawConstraint::piecewise_linear(ratchets()).unwrap();
        let r = c.range_at(50.0).unwrap();
        assert_abs_diff_eq!(r.min_rate, -44.93, epsilon = 1e-12);
        assert_abs_diff_eq!(r.max_rate, 55.65, epsilon = 1e-12);
        assert_eq!(c.range_at(300.0).unwrap(), InjectWithdrawRange::new(-45.78, 52.01));
    }

    #[test]
    fn fewer_than_two_pillars_rejected() {
        let err = InjectWithdrawConstraint::piecewise_flat(vec![(0.0, (-1.0, 1.0))]).unwrap_err();
        assert_eq!(
            err,
            StorageError::InvalidInput(
                "Inject/withdraw ranges collection must contain at least two elements.".to_string()
            )
        );
    }

    #[test]
    fn step_requires_equal_top_two_pillars() {
        let mut pillars = ratchets();
        pillars[5].1.1 = 50.9;
        assert!(InjectWithdrawConstraint::step(pillars.clone()).is_err());
        assert!(InjectWithdrawConstraint::piecewise_flat(pillars).is_ok());

        let mut pillars = ratchets();
        pillars[5].1.0 = -47.0;
        assert!(InjectWithdrawConstraint::step(pillars).is_err());
    }

    #[test]
    fn upper_bound_constant_rate_is_next_upper_plus_withdrawal_over_retention() {
        let c = InjectWithdrawConstraint::step(constant_pillars()).unwrap();
        let upper = c
            .inventory_space_upper_bound(320.0, 620.0, 0.0, 1000.0, 0.03)
            .unwrap();
        assert_abs_diff_eq!(upper, (620.0 + 47.12) / 0.97, epsilon = 1e-10);
    }

    #[test]
    fn lower_bound_constant_rate_is_next_lower_minus_injection_over_retention() {
        let c = InjectWithdrawConstraint::step(constant_pillars()).unwrap();
        let lower = c
            .inventory_space_lower_bound(620.0, 870.0, 0.0, 1000.0, 0.03)
            .unwrap();
        assert_abs_diff_eq!(lower, (620.0 - 56.8) / 0.97, epsilon = 1e-10);
    }

    #[test]
    fn upper_bound_consistent_with_lookup() {
        let c = InjectWithdrawConstraint::step(ratchets()).unwrap();
        let upper = c
            .inventory_space_upper_bound(320.0, 590.5, 0.0, 1000.0, 0.03)
            .unwrap();
        let withdraw = c.range_at(upper).unwrap().min_rate;
        assert_abs_diff_eq!(upper * 0.97 + withdraw, 590.5, epsilon = 1e-10);
    }

    #[test]
    fn lower_bound_consistent_with_lookup() {
        let c = InjectWithdrawConstraint::step(ratchets()).unwrap();
        let lower = c
            .inventory_space_lower_bound(552.0, 734.0, 0.0, 1000.0, 0.03)
            .unwrap();
        let inject = c.range_at(lower).unwrap().max_rate;
        assert_abs_diff_eq!(lower * 0.97 + inject, 552.0, epsilon = 1e-10);
    }

    #[test]
    fn reachable_extremes_short_circuit() {
        let c = InjectWithdrawConstraint::constant(InjectWithdrawRange::new(-50.0, 50.0), 0.0, 100.0)
            .unwrap();
        assert_eq!(c.inventory_space_upper_bound(0.0, 60.0, 0.0, 100.0, 0.0).unwrap(), 100.0);
        assert_eq!(c.inventory_space_lower_bound(40.0, 100.0, 0.0, 100.0, 0.0).unwrap(), 0.0);
    }

    #[test]
    fn linear_upper_bound_solves_inside_bracket() {
        let c = InjectWithdrawConstraint::piecewise_linear(vec![
            (0.0, (-10.0, 20.0)),
            (100.0, (-30.0, 10.0)),
        ])
        .unwrap();
        // x + rate(x) with rate(x) = -10 - 0.2x reaches 30 at x = 50.
        let upper = c.inventory_space_upper_bound(0.0, 30.0, 0.0, 100.0, 0.0).unwrap();
        assert_abs_diff_eq!(upper, 50.0, epsilon = 1e-12);
    }

    #[test]
    fn unreachable_target_is_infeasible() {
        let c = InjectWithdrawConstraint::constant(InjectWithdrawRange::new(-1.0, 1.0), 0.0, 100.0)
            .unwrap();
        let err = c
            .inventory_space_upper_bound(0.0, -5.0, 0.0, 100.0, 0.0)
            .unwrap_err();
        assert!(err.is_infeasible());
    }
}
