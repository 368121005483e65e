//! Module `lsmc::engine`.
//!
//! Least-squares Monte Carlo valuation of commodity storage.
//!
//! The engine runs a backward induction over daily periods on an inventory grid. For every period
//! and grid inventory it evaluates a bang-bang decision set; the next period's simulated values
//! are regressed on the period's basis functions to choose the decision of each simulation, and
//! the chosen decision is then valued with the simulated (not fitted) continuation value. A
//! forward pass replays the regression policy along every simulation to produce deltas, expected
//! storage profiles, per-simulation panels and trigger prices.
//!
//! Key entry point: [`calculate`].
//!
//! Numerical design: the regression uses one SVD pseudo-inverse of the design matrix per period,
//! shared by every next-period grid point. The valuation period is deterministic, so its
//! continuation value is the simulation average rather than a regression. Inventories within the
//! numerical tolerance of a grid node use that node without interpolation. All cash flows are
//! discounted to the valuation date.
//!
//! References: Longstaff and Schwartz (2001), Boogert and de Jong (2008).

use chrono::NaiveDate;
use log::{debug, info, warn};
use nalgebra::DMatrix;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::core::{CashFlow, DailySeries, InventoryRange, StorageError, StorageResult, offset_days};
use crate::lsmc::control::ProgressTracker;
use crate::lsmc::params::ValuationParameters;
use crate::lsmc::results::{
    SimPanel, StorageProfile, TriggerPricePoint, TriggerPriceVolumeProfiles, TriggerPrices,
    ValuationResults,
};
use crate::math::{mean, mean_and_stderr};
use crate::models::SimulationResults;
use crate::rates::DiscountCache;
use crate::storage::{GridWeights, bang_bang_decision_set, calculate_inventory_space};

/// Values a storage contract by least-squares Monte Carlo.
pub fn calculate(params: &ValuationParameters) -> StorageResult<ValuationResults> {
    let storage = &params.storage;
    let current = params.current_period;
    let inventory = params.inventory;
    let tolerance = params.config.numerical_tolerance;

    if inventory < 0.0 {
        return Err(StorageError::InvalidInput(format!(
            "inventory must be >= 0, got {inventory}"
        )));
    }
    if current > storage.end() {
        debug!("valuation date {current} is after storage end {}", storage.end());
        params.on_progress.report(1.0);
        return Ok(ValuationResults::expired());
    }
    if current == storage.end() {
        let npv = if storage.must_be_empty_at_end() {
            if inventory > tolerance {
                return Err(StorageError::InfeasibleConstraints(format!(
                    "storage must be empty at end but inventory on {current} is {inventory}"
                )));
            }
            0.0
        } else {
            storage.terminal_value(*params.forward_curve.value(current)?, inventory)
        };
        info!("storage valued on its end date {current}: NPV {npv}");
        params.on_progress.report(1.0);
        return Ok(ValuationResults::end_period(npv));
    }
    if !params.forward_curve.contains(current) || !params.forward_curve.contains(storage.end()) {
        return Err(StorageError::InvalidInput(format!(
            "forward curve must cover {current} to {}",
            storage.end()
        )));
    }

    params.cancellation.check()?;
    let space = calculate_inventory_space(storage, inventory, current, tolerance)?;
    debug!("inventory space has {} periods", space.len());
    let sims = params
        .simulator
        .simulate(current, storage.end(), &params.forward_curve)?;
    debug!(
        "simulated {} paths with {} factor(s)",
        sims.num_sims(),
        sims.num_factors()
    );

    let valuation = Valuation {
        params,
        sims: &sims,
        discount: DiscountCache::new(params.discounter.clone(), current),
        tolerance,
        start: current.max(storage.start()),
    };
    valuation.run(&space)
}

/// Continuation value per simulation and next-period grid point.
enum Continuation<'a> {
    /// `num_sims x grid` fitted values.
    Fitted(&'a DMatrix<f64>),
    /// Deterministic period: one value per grid point shared by all simulations.
    Means(&'a [f64]),
}

impl Continuation<'_> {
    #[inline]
    fn at(&self, sim: usize, point: usize) -> f64 {
        match self {
            Self::Fitted(m) => m[(sim, point)],
            Self::Means(means) => means[point],
        }
    }

    #[inline]
    fn interpolate(&self, sim: usize, weights: &GridWeights) -> f64 {
        weights.blend(self.at(sim, weights.lower), self.at(sim, weights.upper))
    }
}

/// Regression output kept from the backward pass for the forward pass.
enum ContinuationFit {
    /// `basis x grid` coefficients.
    Regression(DMatrix<f64>),
    Deterministic(Vec<f64>),
}

struct PeriodFit {
    next_grid: Vec<f64>,
    fit: ContinuationFit,
}

/// One candidate injection (> 0) or withdrawal (< 0).
#[derive(Debug, Clone, Copy)]
struct Decision {
    volume: f64,
    consumed: f64,
    cost_npv: f64,
    weights: GridWeights,
}

impl Decision {
    /// Commodity sold (> 0) or bought (< 0) in the market.
    #[inline]
    fn net_volume(&self) -> f64 {
        -self.volume - self.consumed
    }

    #[inline]
    fn immediate_npv(&self, spot_price: f64, settle_df: f64) -> f64 {
        self.net_volume() * spot_price * settle_df - self.cost_npv
    }
}

struct Valuation<'a> {
    params: &'a ValuationParameters,
    sims: &'a SimulationResults,
    discount: DiscountCache,
    tolerance: f64,
    /// First period with a decision.
    start: NaiveDate,
}

impl Valuation<'_> {
    fn run(&self, space: &DailySeries<InventoryRange>) -> StorageResult<ValuationResults> {
        let storage = &self.params.storage;
        let end = storage.end();
        let grids = self.grids(space)?;
        let num_decision_periods = grids.len() - 1;
        let mut progress = ProgressTracker::new(&self.params.on_progress, 2 * num_decision_periods);

        let end_spot = self.sims.spot_prices_for_period(end)?;
        let mut next_values = DMatrix::from_fn(end_spot.len(), grids[num_decision_periods].len(), |sim, g| {
            storage.terminal_value(end_spot[sim], grids[num_decision_periods][g])
        });

        let mut fits = Vec::with_capacity(num_decision_periods);
        for idx in (0..num_decision_periods).rev() {
            self.params.cancellation.check()?;
            let date = offset_days(self.start, idx as i64);
            let (values, fit) = self.backward_step(date, &grids[idx], &grids[idx + 1], &next_values)?;
            fits.push(PeriodFit {
                next_grid: grids[idx + 1].clone(),
                fit,
            });
            next_values = values;
            progress.step();
        }
        fits.reverse();

        let first_values: Vec<f64> = next_values.column(0).iter().copied().collect();
        let (npv, stderr) = mean_and_stderr(&first_values);
        let results = self.forward_pass(&fits, npv, &mut progress)?;
        info!(
            "storage valued with {} simulations on {}: NPV {npv} (std err {stderr})",
            self.sims.num_sims(),
            self.params.current_period
        );
        Ok(results)
    }

    /// Inventory grids from `start` to the storage end.
    fn grids(&self, space: &DailySeries<InventoryRange>) -> StorageResult<Vec<Vec<f64>>> {
        let mut grids = vec![vec![self.params.inventory]];
        for range in space.values() {
            grids.push(self.params.grid_calc.grid_points(
                range.min_inventory,
                range.max_inventory,
                self.tolerance,
            )?);
        }
        debug!(
            "largest inventory grid has {} points",
            grids.iter().map(Vec::len).max().unwrap_or(0)
        );
        Ok(grids)
    }

    fn is_deterministic(&self, date: NaiveDate) -> bool {
        date == self.params.current_period
    }

    fn npv(&self, cash_flows: &[CashFlow]) -> f64 {
        cash_flows
            .iter()
            .map(|cf| cf.amount * self.discount.factor(cf.date))
            .sum()
    }

    fn settle_df(&self, date: NaiveDate) -> f64 {
        self.discount.factor(self.params.settle_date(date))
    }

    /// Values on `date` for every grid inventory and simulation, and the fitted continuation.
    fn backward_step(
        &self,
        date: NaiveDate,
        grid: &[f64],
        next_grid: &[f64],
        next_values: &DMatrix<f64>,
    ) -> StorageResult<(DMatrix<f64>, ContinuationFit)> {
        let spot = self.sims.spot_prices_for_period(date)?;
        let settle_df = self.settle_df(date);

        let fitted;
        let means;
        let (continuation, fit) = if self.is_deterministic(date) {
            means = (0..next_values.ncols())
                .map(|g| next_values.column(g).mean())
                .collect::<Vec<_>>();
            (
                Continuation::Means(&means),
                ContinuationFit::Deterministic(means.clone()),
            )
        } else {
            let design = self.design_matrix(date)?;
            let coefficients = regress(&design, next_values, date)?;
            fitted = &design * &coefficients;
            (
                Continuation::Fitted(&fitted),
                ContinuationFit::Regression(coefficients),
            )
        };

        let value_point = |&inventory: &f64| -> StorageResult<Vec<f64>> {
            let decisions = self.decisions(date, inventory, next_grid, self.params.config.num_extra_decisions)?;
            let inventory_cost = self.npv(&self.params.storage.inventory_cost(date, inventory));
            let values = spot
                .iter()
                .enumerate()
                .map(|(sim, &spot_price)| {
                    let best = best_decision(&decisions, |d| {
                        d.immediate_npv(spot_price, settle_df) + continuation.interpolate(sim, &d.weights)
                    });
                    best.immediate_npv(spot_price, settle_df)
                        + best.weights.blend(
                            next_values[(sim, best.weights.lower)],
                            next_values[(sim, best.weights.upper)],
                        )
                        - inventory_cost
                })
                .collect();
            Ok(values)
        };

        #[cfg(feature = "parallel")]
        let columns = grid
            .par_iter()
            .map(value_point)
            .collect::<StorageResult<Vec<_>>>()?;
        #[cfg(not(feature = "parallel"))]
        let columns = grid
            .iter()
            .map(value_point)
            .collect::<StorageResult<Vec<_>>>()?;

        let values = DMatrix::from_vec(spot.len(), grid.len(), columns.concat());
        Ok((values, fit))
    }

    fn design_matrix(&self, date: NaiveDate) -> StorageResult<DMatrix<f64>> {
        let factors = self.sims.markov_factors(date)?;
        let spot = self.sims.spot_prices_for_period(date)?;
        self.params.basis_functions.design_matrix(&factors, spot)
    }

    /// Candidate decisions with their deterministic cash flows and next-grid location.
    fn decisions(
        &self,
        date: NaiveDate,
        inventory: f64,
        next_grid: &[f64],
        num_extra: usize,
    ) -> StorageResult<Vec<Decision>> {
        let storage = &self.params.storage;
        let range = storage.constraint(date)?.range_within(inventory, self.tolerance)?;
        let loss = inventory * storage.inventory_percent_loss(date);
        let (next_min, next_max) = grid_bounds(next_grid)?;
        bang_bang_decision_set(range, inventory, loss, next_min, next_max, self.tolerance, num_extra)?
            .into_iter()
            .map(|volume| self.decision(date, inventory, loss, volume, next_grid))
            .collect()
    }

    fn decision(
        &self,
        date: NaiveDate,
        inventory: f64,
        loss: f64,
        volume: f64,
        next_grid: &[f64],
    ) -> StorageResult<Decision> {
        let storage = &self.params.storage;
        let (cost, consumed) = if volume > 0.0 {
            (
                storage.injection_cost(date, inventory, volume),
                storage.cmdty_consumed_on_inject(date, inventory, volume),
            )
        } else if volume < 0.0 {
            (
                storage.withdrawal_cost(date, inventory, -volume),
                storage.cmdty_consumed_on_withdraw(date, inventory, -volume),
            )
        } else {
            (Vec::new(), 0.0)
        };
        Ok(Decision {
            volume,
            consumed,
            cost_npv: self.npv(&cost),
            weights: GridWeights::locate(next_grid, inventory - loss + volume, self.tolerance)?,
        })
    }

    /// Replays the regression policy along every simulation.
    fn forward_pass(
        &self,
        fits: &[PeriodFit],
        npv: f64,
        progress: &mut ProgressTracker<'_>,
    ) -> StorageResult<ValuationResults> {
        let storage = &self.params.storage;
        let config = &self.params.config;
        let num_sims = self.sims.num_sims();
        let num_periods = fits.len() + 1;

        let mut inventory = vec![self.params.inventory; num_sims];
        let mut spot_rows = Vec::with_capacity(num_periods);
        let mut inventory_rows = Vec::with_capacity(num_periods);
        let mut volume_rows = Vec::with_capacity(num_periods);
        let mut consumed_rows = Vec::with_capacity(num_periods);
        let mut loss_rows = Vec::with_capacity(num_periods);
        let mut net_volume_rows = Vec::with_capacity(num_periods);
        let mut profiles = Vec::with_capacity(num_periods);
        let mut deltas = Vec::with_capacity(fits.len());
        let mut trigger_prices = Vec::with_capacity(fits.len());
        let mut volume_profiles = Vec::with_capacity(fits.len());

        for (idx, period) in fits.iter().enumerate() {
            self.params.cancellation.check()?;
            let date = offset_days(self.start, idx as i64);
            let spot = self.sims.spot_prices_for_period(date)?;
            let settle_df = self.settle_df(date);
            let forward_price = *self.params.forward_curve.value(date)?;

            let fitted;
            let (continuation, expected_continuation) = match &period.fit {
                ContinuationFit::Deterministic(means) => (Continuation::Means(means), means.clone()),
                ContinuationFit::Regression(coefficients) => {
                    let design = self.design_matrix(date)?;
                    fitted = &design * coefficients;
                    (
                        Continuation::Fitted(&fitted),
                        expected_regression(&design, coefficients),
                    )
                }
            };

            let mut volume = vec![0.0; num_sims];
            let mut consumed = vec![0.0; num_sims];
            let mut loss = vec![0.0; num_sims];
            let mut net_volume = vec![0.0; num_sims];
            let mut period_pv = vec![0.0; num_sims];
            let mut next_inventory = vec![0.0; num_sims];
            for sim in 0..num_sims {
                let inv = inventory[sim];
                let decisions = self.decisions(date, inv, &period.next_grid, config.num_extra_decisions)?;
                let best = best_decision(&decisions, |d| {
                    d.immediate_npv(spot[sim], settle_df) + continuation.interpolate(sim, &d.weights)
                });
                let inventory_cost = self.npv(&storage.inventory_cost(date, inv));
                volume[sim] = best.volume;
                consumed[sim] = best.consumed;
                loss[sim] = inv * storage.inventory_percent_loss(date);
                net_volume[sim] = best.net_volume();
                period_pv[sim] = best.immediate_npv(spot[sim], settle_df) - inventory_cost;
                next_inventory[sim] = inv - loss[sim] + best.volume;
            }

            let delta = net_volume
                .iter()
                .zip(spot)
                .map(|(v, s)| v * s / forward_price)
                .sum::<f64>()
                / num_sims as f64;
            deltas.push(if config.discount_deltas {
                delta * settle_df
            } else {
                delta
            });

            let expected_inventory = mean(&inventory);
            let (triggers, profile) =
                self.trigger_prices(date, expected_inventory, &period.next_grid, &expected_continuation)?;
            trigger_prices.push(triggers);
            volume_profiles.push(profile);

            profiles.push(StorageProfile {
                inventory: expected_inventory,
                inject_withdraw_volume: mean(&volume),
                cmdty_consumed: mean(&consumed),
                inventory_loss: mean(&loss),
                net_volume: mean(&net_volume),
                period_pv: mean(&period_pv),
            });
            spot_rows.push(spot.to_vec());
            inventory_rows.push(std::mem::replace(&mut inventory, next_inventory));
            volume_rows.push(volume);
            consumed_rows.push(consumed);
            loss_rows.push(loss);
            net_volume_rows.push(net_volume);
            progress.step();
        }

        let end = storage.end();
        let end_spot = self.sims.spot_prices_for_period(end)?;
        let terminal: Vec<f64> = inventory
            .iter()
            .zip(end_spot)
            .map(|(inv, s)| storage.terminal_value(*s, *inv))
            .collect();
        profiles.push(StorageProfile {
            inventory: mean(&inventory),
            period_pv: mean(&terminal),
            ..StorageProfile::default()
        });
        spot_rows.push(end_spot.to_vec());
        inventory_rows.push(inventory);
        for rows in [&mut volume_rows, &mut consumed_rows, &mut loss_rows, &mut net_volume_rows] {
            rows.push(vec![0.0; num_sims]);
        }

        debug!(
            "forward pass over {} periods complete, expected end inventory {}",
            fits.len(),
            profiles.last().map_or(0.0, |p| p.inventory)
        );
        let panel = |rows| SimPanel::new(self.start, num_sims, rows);
        Ok(ValuationResults {
            npv,
            deltas: DailySeries::new(self.start, deltas),
            expected_storage_profile: DailySeries::new(self.start, profiles),
            spot_price_by_sim: panel(spot_rows),
            inventory_by_sim: panel(inventory_rows),
            inject_withdraw_volume_by_sim: panel(volume_rows),
            cmdty_consumed_by_sim: panel(consumed_rows),
            inventory_loss_by_sim: panel(loss_rows),
            net_volume_by_sim: panel(net_volume_rows),
            trigger_prices: DailySeries::new(self.start, trigger_prices),
            trigger_price_volume_profiles: DailySeries::new(self.start, volume_profiles),
        })
    }

    /// Spot prices making each volume indifferent to doing nothing at `inventory`, using the
    /// expected continuation value over the next grid.
    fn trigger_prices(
        &self,
        date: NaiveDate,
        inventory: f64,
        next_grid: &[f64],
        expected_continuation: &[f64],
    ) -> StorageResult<(TriggerPrices, TriggerPriceVolumeProfiles)> {
        let storage = &self.params.storage;
        let loss = inventory * storage.inventory_percent_loss(date);
        let Ok(hold) = GridWeights::locate(next_grid, inventory - loss, self.tolerance) else {
            return Ok((TriggerPrices::default(), TriggerPriceVolumeProfiles::default()));
        };
        let hold_value = blend_at(expected_continuation, &hold);
        let settle_df = self.settle_df(date);
        let decisions = match self.decisions(date, inventory, next_grid, 0) {
            Ok(decisions) => decisions,
            Err(e) => {
                debug!("no trigger prices on {date} at inventory {inventory}: {e}");
                return Ok((TriggerPrices::default(), TriggerPriceVolumeProfiles::default()));
            }
        };

        let trigger_point = |volume: f64| -> StorageResult<TriggerPricePoint> {
            let decision = self.decision(date, inventory, loss, volume, next_grid)?;
            let gain = blend_at(expected_continuation, &decision.weights) - hold_value - decision.cost_npv;
            Ok(TriggerPricePoint {
                volume,
                price: gain / ((volume + decision.consumed) * settle_df),
            })
        };
        let num_points = self.params.config.num_trigger_price_volumes;
        let profile = |max_volume: f64| -> StorageResult<Vec<TriggerPricePoint>> {
            (1..=num_points)
                .map(|k| trigger_point(max_volume * k as f64 / num_points as f64))
                .collect()
        };

        let mut triggers = TriggerPrices::default();
        let mut profiles = TriggerPriceVolumeProfiles::default();
        if let Some(max_inject) = decisions.last().map(|d| d.volume).filter(|v| *v > self.tolerance) {
            triggers.max_inject_volume = Some(max_inject);
            triggers.max_inject_trigger_price = Some(trigger_point(max_inject)?.price);
            profiles.inject_trigger_prices = profile(max_inject)?;
        }
        if let Some(max_withdraw) = decisions.first().map(|d| d.volume).filter(|v| *v < -self.tolerance) {
            triggers.max_withdraw_volume = Some(max_withdraw);
            triggers.max_withdraw_trigger_price = Some(trigger_point(max_withdraw)?.price);
            profiles.withdraw_trigger_prices = profile(max_withdraw)?;
        }
        Ok((triggers, profiles))
    }
}

/// First decision maximising `objective`.
fn best_decision<F>(decisions: &[Decision], objective: F) -> &Decision
where
    F: Fn(&Decision) -> f64,
{
    let mut best = &decisions[0];
    let mut best_value = objective(best);
    for decision in &decisions[1..] {
        let value = objective(decision);
        if value > best_value {
            best = decision;
            best_value = value;
        }
    }
    best
}

#[inline]
fn blend_at(values: &[f64], weights: &GridWeights) -> f64 {
    weights.blend(values[weights.lower], values[weights.upper])
}

fn grid_bounds(grid: &[f64]) -> StorageResult<(f64, f64)> {
    grid.first()
        .zip(grid.last())
        .map(|(lo, hi)| (*lo, *hi))
        .ok_or_else(|| StorageError::InvalidInput("inventory grid cannot be empty".to_string()))
}

/// Least-squares coefficients (`basis x grid`) of `targets` on `design` via the pseudo-inverse.
fn regress(design: &DMatrix<f64>, targets: &DMatrix<f64>, date: NaiveDate) -> StorageResult<DMatrix<f64>> {
    let (rows, cols) = design.shape();
    let svd = design.clone().svd(true, true);
    let max_singular = svd.singular_values.max();
    let eps = max_singular * rows.max(cols) as f64 * f64::EPSILON;
    let rank = svd.rank(eps);
    if rank < cols {
        warn!("design matrix on {date} is rank deficient: rank {rank} with {cols} basis functions");
    }
    let pseudo_inverse = svd
        .pseudo_inverse(eps)
        .map_err(|e| StorageError::Numerical(format!("pseudo-inverse on {date}: {e}")))?;
    Ok(pseudo_inverse * targets)
}

/// Continuation value at the average basis-function row.
fn expected_regression(design: &DMatrix<f64>, coefficients: &DMatrix<f64>) -> Vec<f64> {
    let mean_row: Vec<f64> = (0..design.ncols()).map(|j| design.column(j).mean()).collect();
    (0..coefficients.ncols())
        .map(|g| {
            mean_row
                .iter()
                .enumerate()
                .map(|(j, x)| x * coefficients[(j, g)])
                .sum()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn decision(volume: f64, weights: GridWeights) -> Decision {
        Decision {
            volume,
            consumed: 0.0,
            cost_npv: 0.0,
            weights,
        }
    }

    #[test]
    fn first_maximum_wins_ties() {
        let w = GridWeights {
            lower: 0,
            upper: 0,
            lower_weight: 1.0,
            upper_weight: 0.0,
        };
        let decisions = [decision(-1.0, w), decision(0.0, w), decision(1.0, w)];
        assert_eq!(best_decision(&decisions, |_| 1.0).volume, -1.0);
        assert_eq!(best_decision(&decisions, |d| d.volume).volume, 1.0);
    }

    #[test]
    fn immediate_npv_signs() {
        let w = GridWeights {
            lower: 0,
            upper: 0,
            lower_weight: 1.0,
            upper_weight: 0.0,
        };
        let inject = Decision {
            volume: 10.0,
            consumed: 0.1,
            cost_npv: 2.0,
            weights: w,
        };
        assert_relative_eq!(inject.immediate_npv(5.0, 0.9), -10.1 * 5.0 * 0.9 - 2.0);
        let withdraw = Decision {
            volume: -10.0,
            consumed: 0.1,
            cost_npv: 2.0,
            weights: w,
        };
        assert_relative_eq!(withdraw.net_volume(), 9.9);
    }

    #[test]
    fn regression_recovers_exact_linear_fit() {
        let design = DMatrix::from_fn(6, 2, |i, j| if j == 0 { 1.0 } else { i as f64 });
        let targets = DMatrix::from_fn(6, 2, |i, g| 3.0 + (g as f64 + 1.0) * i as f64);
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let beta = regress(&design, &targets, date).unwrap();
        assert_relative_eq!(beta[(0, 0)], 3.0, epsilon = 1e-10);
        assert_relative_eq!(beta[(1, 1)], 2.0, epsilon = 1e-10);
        let expected = expected_regression(&design, &beta);
        assert_relative_eq!(expected[0], 3.0 + 2.5, epsilon = 1e-10);
    }

    #[test]
    fn rank_deficient_design_still_regresses() {
        // Columns 0 and 2 are both the intercept.
        let design = DMatrix::from_fn(5, 3, |i, j| if j == 1 { i as f64 } else { 1.0 });
        let targets = DMatrix::from_fn(5, 1, |i, _| i as f64);
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let beta = regress(&design, &targets, date).unwrap();
        let fitted = &design * &beta;
        for i in 0..5 {
            assert_relative_eq!(fitted[(i, 0)], i as f64, epsilon = 1e-9);
        }
    }
}
