//! Inputs of an LSMC storage valuation.
//!
//! [`ValuationInputs`] collects optional fields; [`ValuationParameters::from_inputs`] checks that
//! every required one is present and consistent before the engine runs.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::{DailySeries, StorageError, StorageResult};
use crate::lsmc::basis::BasisFunctions;
use crate::lsmc::control::{CancellationToken, ProgressCallback};
use crate::models::SpotSimulator;
use crate::rates::Discounter;
use crate::storage::{CmdtyStorage, FixedSpacingGrid};

/// Maps a delivery day to the date its commodity cash flow settles.
pub type SettleDateFn = Arc<dyn Fn(NaiveDate) -> NaiveDate + Send + Sync>;

/// Numerical settings that can be shipped as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    /// Inventories and decisions closer than this are treated as equal.
    pub numerical_tolerance: f64,
    /// Evenly spaced decisions inserted between consecutive bang-bang decisions.
    pub num_extra_decisions: usize,
    /// Multiply deltas by the discount factor to their settlement date.
    pub discount_deltas: bool,
    /// Volumes per trigger-price profile.
    pub num_trigger_price_volumes: usize,
    /// Basis-function expression, used when no basis functions are given explicitly.
    pub basis_functions: Option<String>,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            numerical_tolerance: 1e-10,
            num_extra_decisions: 0,
            discount_deltas: false,
            num_trigger_price_volumes: 10,
            basis_functions: None,
        }
    }
}

impl ValuationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.numerical_tolerance.is_finite() || self.numerical_tolerance <= 0.0 {
            return Err("numerical_tolerance must be finite and > 0".to_string());
        }
        if self.num_trigger_price_volumes == 0 {
            return Err("num_trigger_price_volumes must be > 0".to_string());
        }
        Ok(())
    }
}

/// Optional valuation inputs.
#[derive(Clone, Default)]
pub struct ValuationInputs {
    pub current_period: Option<NaiveDate>,
    pub inventory: Option<f64>,
    pub forward_curve: Option<DailySeries<f64>>,
    pub storage: Option<CmdtyStorage>,
    pub settle_date_rule: Option<SettleDateFn>,
    pub discounter: Option<Arc<dyn Discounter>>,
    pub grid_calc: Option<FixedSpacingGrid>,
    pub simulator: Option<Arc<dyn SpotSimulator>>,
    pub basis_functions: Option<BasisFunctions>,
    pub cancellation: CancellationToken,
    pub on_progress: ProgressCallback,
    pub config: ValuationConfig,
}

impl ValuationInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settle_date_rule<F>(mut self, rule: F) -> Self
    where
        F: Fn(NaiveDate) -> NaiveDate + Send + Sync + 'static,
    {
        let rule: SettleDateFn = Arc::new(rule);
        self.settle_date_rule = Some(rule);
        self
    }

    pub fn discounter<D>(mut self, discounter: D) -> Self
    where
        D: Discounter + 'static,
    {
        let discounter: Arc<dyn Discounter> = Arc::new(discounter);
        self.discounter = Some(discounter);
        self
    }

    pub fn simulator<S>(mut self, simulator: S) -> Self
    where
        S: SpotSimulator + 'static,
    {
        let simulator: Arc<dyn SpotSimulator> = Arc::new(simulator);
        self.simulator = Some(simulator);
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        self.on_progress = ProgressCallback::new(callback);
        self
    }
}

impl fmt::Debug for ValuationInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValuationInputs")
            .field("current_period", &self.current_period)
            .field("inventory", &self.inventory)
            .field("storage", &self.storage)
            .field("grid_calc", &self.grid_calc)
            .field("basis_functions", &self.basis_functions)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn required<T>(value: Option<T>, field: &str) -> StorageResult<T> {
    value.ok_or_else(|| StorageError::InvalidInput(format!("{field} has not been set.")))
}

/// Validated valuation inputs.
#[derive(Clone)]
pub struct ValuationParameters {
    pub(crate) current_period: NaiveDate,
    pub(crate) inventory: f64,
    pub(crate) forward_curve: DailySeries<f64>,
    pub(crate) storage: CmdtyStorage,
    pub(crate) settle_date_rule: SettleDateFn,
    pub(crate) discounter: Arc<dyn Discounter>,
    pub(crate) grid_calc: FixedSpacingGrid,
    pub(crate) simulator: Arc<dyn SpotSimulator>,
    pub(crate) basis_functions: BasisFunctions,
    pub(crate) cancellation: CancellationToken,
    pub(crate) on_progress: ProgressCallback,
    pub(crate) config: ValuationConfig,
}

impl ValuationParameters {
    pub fn from_inputs(inputs: ValuationInputs) -> StorageResult<Self> {
        let current_period = required(inputs.current_period, "Current period")?;
        let inventory = required(inputs.inventory, "Inventory")?;
        let forward_curve = required(inputs.forward_curve, "Forward curve")?;
        let storage = required(inputs.storage, "Storage")?;
        let settle_date_rule = required(inputs.settle_date_rule, "Settle date rule")?;
        let discounter = required(inputs.discounter, "Discount factors")?;
        let grid_calc = required(inputs.grid_calc, "Grid calculator")?;
        let simulator = required(inputs.simulator, "Spot simulator")?;
        let basis_functions = match (inputs.basis_functions, &inputs.config.basis_functions) {
            (Some(functions), _) => functions,
            (None, Some(expression)) => BasisFunctions::parse(expression)?,
            (None, None) => return Err(StorageError::InvalidInput(
                "Basis functions has not been set.".to_string(),
            )),
        };

        inputs.config.validate().map_err(StorageError::InvalidInput)?;
        if !inventory.is_finite() {
            return Err(StorageError::InvalidInput(
                "inventory must be finite".to_string(),
            ));
        }
        basis_functions.validate(simulator.num_factors())?;

        Ok(Self {
            current_period,
            inventory,
            forward_curve,
            storage,
            settle_date_rule,
            discounter,
            grid_calc,
            simulator,
            basis_functions,
            cancellation: inputs.cancellation,
            on_progress: inputs.on_progress,
            config: inputs.config,
        })
    }

    pub fn current_period(&self) -> NaiveDate {
        self.current_period
    }

    pub fn inventory(&self) -> f64 {
        self.inventory
    }

    pub fn storage(&self) -> &CmdtyStorage {
        &self.storage
    }

    pub fn forward_curve(&self) -> &DailySeries<f64> {
        &self.forward_curve
    }

    pub fn config(&self) -> &ValuationConfig {
        &self.config
    }

    pub fn basis_functions(&self) -> &BasisFunctions {
        &self.basis_functions
    }

    pub fn settle_date(&self, period: NaiveDate) -> NaiveDate {
        (self.settle_date_rule)(period)
    }
}

impl fmt::Debug for ValuationParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValuationParameters")
            .field("current_period", &self.current_period)
            .field("inventory", &self.inventory)
            .field("storage", &self.storage)
            .field("grid_calc", &self.grid_calc)
            .field("basis_functions", &self.basis_functions)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
