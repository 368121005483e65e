//! Outputs of an LSMC storage valuation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::{DailySeries, StorageError, StorageResult};

/// Expected storage state and flows for one period.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StorageProfile {
    /// Inventory at the start of the period.
    pub inventory: f64,
    /// Positive for injection, negative for withdrawal.
    pub inject_withdraw_volume: f64,
    pub cmdty_consumed: f64,
    pub inventory_loss: f64,
    /// Commodity bought (negative) or sold (positive) in the market.
    pub net_volume: f64,
    /// Present value of the period's cash flows.
    pub period_pv: f64,
}

/// Values by period and simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimPanel {
    start: Option<NaiveDate>,
    num_sims: usize,
    rows: Vec<Vec<f64>>,
}

impl SimPanel {
    pub fn empty() -> Self {
        Self {
            start: None,
            num_sims: 0,
            rows: Vec::new(),
        }
    }

    pub(crate) fn new(start: NaiveDate, num_sims: usize, rows: Vec<Vec<f64>>) -> Self {
        Self {
            start: Some(start),
            num_sims,
            rows,
        }
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn num_sims(&self) -> usize {
        self.num_sims
    }

    pub fn num_periods(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All simulations for `date`.
    pub fn row(&self, date: NaiveDate) -> StorageResult<&[f64]> {
        self.start
            .and_then(|start| usize::try_from((date - start).num_days()).ok())
            .and_then(|idx| self.rows.get(idx))
            .map(Vec::as_slice)
            .ok_or_else(|| StorageError::InvalidInput(format!("panel has no row for {date}")))
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Path of one simulation across all periods.
    pub fn sim_path(&self, sim: usize) -> Vec<f64> {
        self.rows.iter().filter_map(|row| row.get(sim).copied()).collect()
    }
}

/// Maximum-rate trigger prices at the expected inventory.
///
/// A price is only present when the matching decision is feasible.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TriggerPrices {
    pub max_inject_volume: Option<f64>,
    pub max_inject_trigger_price: Option<f64>,
    pub max_withdraw_volume: Option<f64>,
    pub max_withdraw_trigger_price: Option<f64>,
}

impl TriggerPrices {
    pub fn has_inject_price(&self) -> bool {
        self.max_inject_trigger_price.is_some()
    }

    pub fn has_withdraw_price(&self) -> bool {
        self.max_withdraw_trigger_price.is_some()
    }
}

/// Volume and the spot price at which it becomes worth trading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerPricePoint {
    pub volume: f64,
    pub price: f64,
}

/// Trigger prices for evenly spaced volumes up to the maximum rates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TriggerPriceVolumeProfiles {
    /// Ascending volumes.
    pub inject_trigger_prices: Vec<TriggerPricePoint>,
    /// Volumes descending (increasingly negative).
    pub withdraw_trigger_prices: Vec<TriggerPricePoint>,
}

/// Result of [`crate::lsmc::calculate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResults {
    pub npv: f64,
    pub deltas: DailySeries<f64>,
    pub expected_storage_profile: DailySeries<StorageProfile>,
    pub spot_price_by_sim: SimPanel,
    pub inventory_by_sim: SimPanel,
    pub inject_withdraw_volume_by_sim: SimPanel,
    pub cmdty_consumed_by_sim: SimPanel,
    pub inventory_loss_by_sim: SimPanel,
    pub net_volume_by_sim: SimPanel,
    pub trigger_prices: DailySeries<TriggerPrices>,
    pub trigger_price_volume_profiles: DailySeries<TriggerPriceVolumeProfiles>,
}

impl ValuationResults {
    /// Valuation date after the storage end.
    pub fn expired() -> Self {
        Self::end_period(0.0)
    }

    /// Valuation on the storage end date: only the NPV is meaningful.
    pub fn end_period(npv: f64) -> Self {
        Self {
            npv,
            deltas: DailySeries::empty(),
            expected_storage_profile: DailySeries::empty(),
            spot_price_by_sim: SimPanel::empty(),
            inventory_by_sim: SimPanel::empty(),
            inject_withdraw_volume_by_sim: SimPanel::empty(),
            cmdty_consumed_by_sim: SimPanel::empty(),
            inventory_loss_by_sim: SimPanel::empty(),
            net_volume_by_sim: SimPanel::empty(),
            trigger_prices: DailySeries::empty(),
            trigger_price_volume_profiles: DailySeries::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_rows_and_paths() {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let panel = SimPanel::new(start, 2, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(panel.row(start.succ_opt().unwrap()).unwrap(), &[3.0, 4.0]);
        assert_eq!(panel.sim_path(1), vec![2.0, 4.0]);
        assert!(panel.row(start.pred_opt().unwrap()).is_err());
        assert!(SimPanel::empty().row(start).is_err());
    }

    #[test]
    fn shortcut_results_are_empty() {
        let results = ValuationResults::end_period(12.5);
        assert_eq!(results.npv, 12.5);
        assert!(results.deltas.is_empty());
        assert!(results.inventory_by_sim.is_empty());
        assert_eq!(ValuationResults::expired().npv, 0.0);
    }
}
