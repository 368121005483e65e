//! Property tests for the storage constraint machinery.
//!
//! Uses proptest to verify:
//! 1. Decision sets are sorted, inside the rate range and land inside the next period's space
//! 2. Grid points are sorted, keep both ends and put interior points on the lattice
//! 3. Grid weights reproduce the inventory they locate
//! 4. Reachable inventory space stays inside the contract limits and ends empty when required
//! 5. Linear ratchet rates lie between the neighbouring pillars

use chrono::NaiveDate;
use proptest::prelude::*;

use ferric_storage::storage::{
    CmdtyStorage, FixedSpacingGrid, GridWeights, InjectWithdrawConstraint, InjectWithdrawRange,
    bang_bang_decision_set, calculate_inventory_space,
};

const TOL: f64 = 1e-10;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// ── Strategies ───────────────────────────────────────────────────────

fn arb_range() -> impl Strategy<Value = InjectWithdrawRange> {
    (-100.0..0.0_f64, 0.0..100.0_f64).prop_map(|(min, max)| InjectWithdrawRange::new(min, max))
}

/// Next-period window around `inventory` that the range can always reach.
fn arb_window() -> impl Strategy<Value = (f64, f64, f64)> {
    (0.0..1000.0_f64, -90.0..90.0_f64, 10.0..300.0_f64).prop_map(|(inventory, shift, width)| {
        let next_min = (inventory + shift - width / 2.0).max(0.0);
        (inventory, next_min, next_min + width)
    })
}

// ── 1. Decision sets ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn decisions_are_sorted_and_feasible(
        range in arb_range(),
        (inventory, next_min, next_max) in arb_window(),
        num_extra in 0usize..4,
    ) {
        match bang_bang_decision_set(range, inventory, 0.0, next_min, next_max, TOL, num_extra) {
            Ok(decisions) => {
                prop_assert!(!decisions.is_empty());
                prop_assert!(decisions.windows(2).all(|w| w[0] < w[1]));
                for &decision in &decisions {
                    prop_assert!(decision >= range.min_rate - TOL);
                    prop_assert!(decision <= range.max_rate + TOL);
                    prop_assert!(inventory + decision >= next_min - 1e-9);
                    prop_assert!(inventory + decision <= next_max + 1e-9);
                }
            }
            Err(e) => {
                prop_assert!(e.is_infeasible());
                let reachable_lo = inventory + range.min_rate;
                let reachable_hi = inventory + range.max_rate;
                prop_assert!(reachable_hi < next_min || reachable_lo > next_max);
            }
        }
    }

    #[test]
    fn zero_is_kept_when_holding_is_feasible(
        range in arb_range(),
        inventory in 0.0..1000.0_f64,
    ) {
        prop_assume!(range.min_rate < -1e-6 && range.max_rate > 1e-6);
        let decisions =
            bang_bang_decision_set(range, inventory, 0.0, inventory - 500.0, inventory + 500.0, TOL, 0)
                .unwrap();
        prop_assert_eq!(decisions.len(), 3);
        prop_assert_eq!(decisions[1], 0.0);
    }
}

// ── 2. Grid points ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn grid_points_cover_interval_on_lattice(
        spacing in 0.5..50.0_f64,
        origin in -20.0..20.0_f64,
        min in 0.0..500.0_f64,
        width in 0.0..500.0_f64,
    ) {
        let grid = FixedSpacingGrid::new(spacing, origin).unwrap();
        let points = grid.grid_points(min, min + width, TOL).unwrap();
        prop_assert_eq!(points[0], min);
        prop_assert_eq!(*points.last().unwrap(), if width <= TOL { min } else { min + width });
        prop_assert!(points.windows(2).all(|w| w[0] < w[1]));
        for x in points.iter().skip(1).take(points.len().saturating_sub(2)) {
            let k = (x - origin) / spacing;
            prop_assert!((k - k.round()).abs() < 1e-6);
        }
    }

    // ── 3. Grid weights ──────────────────────────────────────────────

    #[test]
    fn weights_reproduce_inventory(
        spacing in 1.0..20.0_f64,
        width in 30.0..300.0_f64,
        fraction in 0.0..=1.0_f64,
    ) {
        let grid = FixedSpacingGrid::new(spacing, 0.0).unwrap().grid_points(0.0, width, TOL).unwrap();
        let inventory = fraction * width;
        let weights = GridWeights::locate(&grid, inventory, TOL).unwrap();
        prop_assert!(weights.lower <= weights.upper);
        let rebuilt = weights.blend(grid[weights.lower], grid[weights.upper]);
        prop_assert!((rebuilt - inventory).abs() < 1e-9);
    }
}

// ── 4. Inventory space ───────────────────────────────────────────────

fn constant_storage(withdraw: f64, inject: f64, max_inventory: f64, loss: f64) -> CmdtyStorage {
    CmdtyStorage::builder()
        .active_period(d(2021, 3, 1), d(2021, 3, 31))
        .constant_inject_withdraw_range(-withdraw, inject)
        .min_inventory(0.0)
        .max_inventory(max_inventory)
        .per_unit_injection_cost(0.0, |date| date)
        .no_cmdty_consumed_on_inject()
        .per_unit_withdrawal_cost(0.0, |date| date)
        .no_cmdty_consumed_on_withdraw()
        .fixed_percent_cmdty_inventory_loss(loss)
        .no_inventory_cost()
        .must_be_empty_at_end()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn inventory_space_within_limits_and_ends_empty(
        withdraw in 5.0..50.0_f64,
        inject in 5.0..50.0_f64,
        max_inventory in 100.0..1000.0_f64,
        loss in 0.0..0.01_f64,
        start_fraction in 0.0..0.1_f64,
    ) {
        let storage = constant_storage(withdraw, inject, max_inventory, loss);
        let inventory = start_fraction * withdraw * 10.0;
        let space = calculate_inventory_space(&storage, inventory, d(2021, 3, 1), TOL).unwrap();
        prop_assert_eq!(space.len(), 30);
        for range in space.values() {
            prop_assert!(range.min_inventory >= -TOL);
            prop_assert!(range.max_inventory <= max_inventory + TOL);
            prop_assert!(range.min_inventory <= range.max_inventory + TOL);
        }
        let last = space.value(d(2021, 3, 31)).unwrap();
        prop_assert!(last.max_inventory.abs() < 1e-9);
    }
}

// ── 5. Linear ratchets ───────────────────────────────────────────────

proptest! {
    #[test]
    fn linear_ratchet_rates_stay_between_pillars(
        lo_withdraw in -50.0..-1.0_f64,
        hi_withdraw in -50.0..-1.0_f64,
        lo_inject in 1.0..50.0_f64,
        hi_inject in 1.0..50.0_f64,
        inventory in 0.0..=100.0_f64,
    ) {
        let constraint = InjectWithdrawConstraint::piecewise_linear([
            (0.0, (lo_withdraw, lo_inject)),
            (100.0, (hi_withdraw, hi_inject)),
        ])
        .unwrap();
        let range = constraint.range_at(inventory).unwrap();
        prop_assert!(range.min_rate >= lo_withdraw.min(hi_withdraw) - 1e-12);
        prop_assert!(range.min_rate <= lo_withdraw.max(hi_withdraw) + 1e-12);
        prop_assert!(range.max_rate >= lo_inject.min(hi_inject) - 1e-12);
        prop_assert!(range.max_rate <= lo_inject.max(hi_inject) + 1e-12);
    }
}
