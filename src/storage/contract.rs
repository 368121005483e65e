//! Module `storage::contract`.
//!
//! Immutable description of a storage facility: active period, ratchet tables, cost functions,
//! commodity consumed on injection/withdrawal, inventory loss and the terminal condition.
//! Contracts are only produced by [`CmdtyStorageBuilder::build`], which validates them.
//!
//! Sign conventions: a decision volume is positive for injection and negative for withdrawal.
//! Cost and consumption functions always receive the absolute volume moved. Cash flows returned by
//! cost functions are costs, so a positive amount reduces the storage value.
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::core::{CashFlow, InventoryRange, StorageError, StorageResult, days_inclusive};
use crate::storage::constraints::{
    InjectWithdrawConstraint, InjectWithdrawRange, InjectWithdrawRangeByInventory,
    RatchetInterpolation,
};

/// `(date, inventory, |volume|) -> cost cash flows`.
pub type CostFn = Arc<dyn Fn(NaiveDate, f64, f64) -> Vec<CashFlow> + Send + Sync>;
/// `(date, inventory, |volume|) -> commodity volume consumed`.
pub type ConsumedFn = Arc<dyn Fn(NaiveDate, f64, f64) -> f64 + Send + Sync>;
/// `date -> fraction of inventory lost over the period`.
pub type LossFn = Arc<dyn Fn(NaiveDate) -> f64 + Send + Sync>;
/// `(date, inventory) -> holding cost cash flows`.
pub type InventoryCostFn = Arc<dyn Fn(NaiveDate, f64) -> Vec<CashFlow> + Send + Sync>;
/// `(spot price, terminal inventory) -> value`.
pub type TerminalValueFn = Arc<dyn Fn(f64, f64) -> f64 + Send + Sync>;

/// What happens to inventory left at the end of the active period.
#[derive(Clone)]
pub enum TerminalCondition {
    /// Inventory must be zero at the end period.
    MustBeEmpty,
    /// Remaining inventory is worth `f(spot, inventory)`.
    Value(TerminalValueFn),
}

impl fmt::Debug for TerminalCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MustBeEmpty => f.write_str("MustBeEmpty"),
            Self::Value(_) => f.write_str("Value(<fn>)"),
        }
    }
}

/// Commodity storage contract.
#[derive(Clone)]
pub struct CmdtyStorage {
    start: NaiveDate,
    end: NaiveDate,
    constraints: Vec<(NaiveDate, InjectWithdrawConstraint)>,
    injection_cost: CostFn,
    withdrawal_cost: CostFn,
    consumed_on_inject: ConsumedFn,
    consumed_on_withdraw: ConsumedFn,
    inventory_loss: LossFn,
    inventory_cost: InventoryCostFn,
    terminal: TerminalCondition,
}

impl CmdtyStorage {
    pub fn builder() -> CmdtyStorageBuilder {
        CmdtyStorageBuilder::default()
    }

    /// First day on which injection or withdrawal is allowed.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Terminal day. No decision is taken on it.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn must_be_empty_at_end(&self) -> bool {
        matches!(self.terminal, TerminalCondition::MustBeEmpty)
    }

    pub fn terminal_condition(&self) -> &TerminalCondition {
        &self.terminal
    }

    /// Ratchet table in force on `date`: the last one dated on or before it.
    pub fn constraint(&self, date: NaiveDate) -> StorageResult<&InjectWithdrawConstraint> {
        let idx = self.constraints.partition_point(|(d, _)| *d <= date);
        if idx == 0 {
            return Err(StorageError::InvalidInput(format!(
                "no inject/withdraw constraint is defined for {date}"
            )));
        }
        Ok(&self.constraints[idx - 1].1)
    }

    /// Feasible rates on `date` at `inventory`.
    pub fn inject_withdraw_range(
        &self,
        date: NaiveDate,
        inventory: f64,
    ) -> StorageResult<InjectWithdrawRange> {
        self.constraint(date)?.range_at(inventory)
    }

    pub fn min_inventory(&self, date: NaiveDate) -> StorageResult<f64> {
        if date == self.end && self.must_be_empty_at_end() {
            return Ok(0.0);
        }
        Ok(self.constraint(date)?.min_inventory())
    }

    pub fn max_inventory(&self, date: NaiveDate) -> StorageResult<f64> {
        if date == self.end && self.must_be_empty_at_end() {
            return Ok(0.0);
        }
        Ok(self.constraint(date)?.max_inventory())
    }

    /// Lowest min and highest max inventory over the whole active period.
    pub fn global_inventory_range(&self) -> StorageResult<InventoryRange> {
        let mut range = InventoryRange::new(f64::INFINITY, f64::NEG_INFINITY);
        for date in days_inclusive(self.start, self.end) {
            range.min_inventory = range.min_inventory.min(self.min_inventory(date)?);
            range.max_inventory = range.max_inventory.max(self.max_inventory(date)?);
        }
        Ok(range)
    }

    /// Fraction of inventory lost over the period starting on `date`.
    pub fn inventory_percent_loss(&self, date: NaiveDate) -> f64 {
        (self.inventory_loss)(date)
    }

    pub fn injection_cost(&self, date: NaiveDate, inventory: f64, volume: f64) -> Vec<CashFlow> {
        (self.injection_cost)(date, inventory, volume)
    }

    pub fn withdrawal_cost(&self, date: NaiveDate, inventory: f64, volume: f64) -> Vec<CashFlow> {
        (self.withdrawal_cost)(date, inventory, volume)
    }

    pub fn cmdty_consumed_on_inject(&self, date: NaiveDate, inventory: f64, volume: f64) -> f64 {
        (self.consumed_on_inject)(date, inventory, volume)
    }

    pub fn cmdty_consumed_on_withdraw(&self, date: NaiveDate, inventory: f64, volume: f64) -> f64 {
        (self.consumed_on_withdraw)(date, inventory, volume)
    }

    pub fn inventory_cost(&self, date: NaiveDate, inventory: f64) -> Vec<CashFlow> {
        (self.inventory_cost)(date, inventory)
    }

    /// Value of inventory held at the end period. Zero for must-be-empty contracts.
    pub fn terminal_value(&self, spot_price: f64, inventory: f64) -> f64 {
        match &self.terminal {
            TerminalCondition::MustBeEmpty => 0.0,
            TerminalCondition::Value(f) => f(spot_price, inventory),
        }
    }
}

impl fmt::Debug for CmdtyStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CmdtyStorage")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("constraints", &self.constraints)
            .field("terminal", &self.terminal)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
enum RateSpec {
    Constant(InjectWithdrawRange),
    Ratchets(RatchetInterpolation, Vec<(NaiveDate, Vec<InjectWithdrawRangeByInventory>)>),
}

/// Builder for [`CmdtyStorage`].
#[derive(Clone, Default)]
pub struct CmdtyStorageBuilder {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    rates: Option<RateSpec>,
    min_inventory: Option<f64>,
    max_inventory: Option<f64>,
    injection_cost: Option<CostFn>,
    withdrawal_cost: Option<CostFn>,
    consumed_on_inject: Option<ConsumedFn>,
    consumed_on_withdraw: Option<ConsumedFn>,
    inventory_loss: Option<LossFn>,
    inventory_cost: Option<InventoryCostFn>,
    must_be_empty: bool,
    terminal_value: Option<TerminalValueFn>,
}

impl CmdtyStorageBuilder {
    /// Sets the first and last day of the storage.
    pub fn active_period(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Same rates at all times and inventories; pair with
    /// [`min_inventory`](Self::min_inventory) and [`max_inventory`](Self::max_inventory).
    pub fn constant_inject_withdraw_range(mut self, min_rate: f64, max_rate: f64) -> Self {
        self.rates = Some(RateSpec::Constant(InjectWithdrawRange::new(min_rate, max_rate)));
        self
    }

    pub fn min_inventory(mut self, min_inventory: f64) -> Self {
        self.min_inventory = Some(min_inventory);
        self
    }

    pub fn max_inventory(mut self, max_inventory: f64) -> Self {
        self.max_inventory = Some(max_inventory);
        self
    }

    /// Time- and inventory-varying ratchet tables. Each table applies from its date until the
    /// next table's date.
    pub fn ratchets<P>(
        mut self,
        interpolation: RatchetInterpolation,
        tables: impl IntoIterator<Item = (NaiveDate, Vec<P>)>,
    ) -> Self
    where
        P: Into<InjectWithdrawRangeByInventory>,
    {
        let tables = tables
            .into_iter()
            .map(|(date, pillars)| (date, pillars.into_iter().map(Into::into).collect()))
            .collect();
        self.rates = Some(RateSpec::Ratchets(interpolation, tables));
        self
    }

    /// Custom injection cost; receives the injected volume.
    pub fn injection_cost<F>(mut self, cost: F) -> Self
    where
        F: Fn(NaiveDate, f64, f64) -> Vec<CashFlow> + Send + Sync + 'static,
    {
        self.injection_cost = Some(Arc::new(cost));
        self
    }

    /// `cost * volume` paid on `payment_date(injection date)`.
    pub fn per_unit_injection_cost<P>(self, cost: f64, payment_date: P) -> Self
    where
        P: Fn(NaiveDate) -> NaiveDate + Send + Sync + 'static,
    {
        self.injection_cost(move |date, _, volume| vec![CashFlow::new(payment_date(date), cost * volume)])
    }

    /// Custom withdrawal cost; receives the absolute withdrawn volume.
    pub fn withdrawal_cost<F>(mut self, cost: F) -> Self
    where
        F: Fn(NaiveDate, f64, f64) -> Vec<CashFlow> + Send + Sync + 'static,
    {
        self.withdrawal_cost = Some(Arc::new(cost));
        self
    }

    /// `cost * |volume|` paid on `payment_date(withdrawal date)`.
    pub fn per_unit_withdrawal_cost<P>(self, cost: f64, payment_date: P) -> Self
    where
        P: Fn(NaiveDate) -> NaiveDate + Send + Sync + 'static,
    {
        self.withdrawal_cost(move |date, _, volume| vec![CashFlow::new(payment_date(date), cost * volume)])
    }

    pub fn no_cmdty_consumed_on_inject(mut self) -> Self {
        self.consumed_on_inject = Some(Arc::new(|_: NaiveDate, _: f64, _: f64| 0.0));
        self
    }

    /// `fraction * volume` of commodity is bought on top of every injection.
    pub fn fixed_percent_cmdty_consumed_on_inject(mut self, fraction: f64) -> Self {
        self.consumed_on_inject = Some(Arc::new(move |_: NaiveDate, _: f64, volume: f64| fraction * volume));
        self
    }

    pub fn no_cmdty_consumed_on_withdraw(mut self) -> Self {
        self.consumed_on_withdraw = Some(Arc::new(|_: NaiveDate, _: f64, _: f64| 0.0));
        self
    }

    /// `fraction * |volume|` of every withdrawal is consumed and not sold.
    pub fn fixed_percent_cmdty_consumed_on_withdraw(mut self, fraction: f64) -> Self {
        self.consumed_on_withdraw = Some(Arc::new(move |_: NaiveDate, _: f64, volume: f64| fraction * volume));
        self
    }

    pub fn no_cmdty_inventory_loss(mut self) -> Self {
        self.inventory_loss = Some(Arc::new(|_: NaiveDate| 0.0));
        self
    }

    pub fn fixed_percent_cmdty_inventory_loss(mut self, fraction: f64) -> Self {
        self.inventory_loss = Some(Arc::new(move |_: NaiveDate| fraction));
        self
    }

    pub fn cmdty_inventory_loss<F>(mut self, loss: F) -> Self
    where
        F: Fn(NaiveDate) -> f64 + Send + Sync + 'static,
    {
        self.inventory_loss = Some(Arc::new(loss));
        self
    }

    pub fn no_inventory_cost(mut self) -> Self {
        self.inventory_cost = Some(Arc::new(|_: NaiveDate, _: f64| Vec::new()));
        self
    }

    pub fn inventory_cost<F>(mut self, cost: F) -> Self
    where
        F: Fn(NaiveDate, f64) -> Vec<CashFlow> + Send + Sync + 'static,
    {
        self.inventory_cost = Some(Arc::new(cost));
        self
    }

    pub fn must_be_empty_at_end(mut self) -> Self {
        self.must_be_empty = true;
        self
    }

    /// Value of inventory left at the end, as `f(spot price, inventory)`.
    pub fn terminal_value<F>(mut self, value: F) -> Self
    where
        F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
    {
        self.terminal_value = Some(Arc::new(value));
        self
    }

    /// Validates and builds the contract.
    pub fn build(self) -> StorageResult<CmdtyStorage> {
        let start = self.start.ok_or_else(|| missing("Active period"))?;
        let end = self.end.ok_or_else(|| missing("Active period"))?;
        if start >= end {
            return Err(StorageError::InvalidInput(format!(
                "storage start {start} must be before storage end {end}"
            )));
        }

        let constraints = match self.rates.ok_or_else(|| missing("Inject/withdraw range"))? {
            RateSpec::Constant(range) => {
                let min_inventory = self.min_inventory.ok_or_else(|| missing("Min inventory"))?;
                let max_inventory = self.max_inventory.ok_or_else(|| missing("Max inventory"))?;
                vec![(
                    start,
                    InjectWithdrawConstraint::constant(range, min_inventory, max_inventory)?,
                )]
            }
            RateSpec::Ratchets(interpolation, mut tables) => {
                if self.min_inventory.is_some() || self.max_inventory.is_some() {
                    return Err(StorageError::InvalidInput(
                        "min/max inventory are taken from the ratchet pillars and cannot be set separately"
                            .to_string(),
                    ));
                }
                tables.sort_by_key(|(date, _)| *date);
                if tables.windows(2).any(|w| w[0].0 == w[1].0) {
                    return Err(StorageError::InvalidInput(
                        "ratchet table dates must be distinct".to_string(),
                    ));
                }
                match tables.first() {
                    None => {
                        return Err(StorageError::InvalidInput(
                            "at least one ratchet table is required".to_string(),
                        ));
                    }
                    Some((first, _)) if *first > start => {
                        return Err(StorageError::InvalidInput(format!(
                            "first ratchet table date {first} is after storage start {start}"
                        )));
                    }
                    Some(_) => {}
                }
                tables
                    .into_iter()
                    .map(|(date, pillars)| {
                        InjectWithdrawConstraint::new(interpolation, pillars).map(|c| (date, c))
                    })
                    .collect::<StorageResult<Vec<_>>>()?
            }
        };

        let terminal = match (self.must_be_empty, self.terminal_value) {
            (true, Some(_)) => {
                return Err(StorageError::InvalidInput(
                    "terminal value cannot be combined with must-be-empty-at-end".to_string(),
                ));
            }
            (true, None) => TerminalCondition::MustBeEmpty,
            (false, Some(f)) => TerminalCondition::Value(f),
            (false, None) => return Err(missing("Terminal inventory value")),
        };

        Ok(CmdtyStorage {
            start,
            end,
            constraints,
            injection_cost: self.injection_cost.ok_or_else(|| missing("Injection cost"))?,
            withdrawal_cost: self.withdrawal_cost.ok_or_else(|| missing("Withdrawal cost"))?,
            consumed_on_inject: self
                .consumed_on_inject
                .ok_or_else(|| missing("Commodity consumed on inject"))?,
            consumed_on_withdraw: self
                .consumed_on_withdraw
                .ok_or_else(|| missing("Commodity consumed on withdraw"))?,
            inventory_loss: self.inventory_loss.ok_or_else(|| missing("Inventory loss"))?,
            inventory_cost: self.inventory_cost.ok_or_else(|| missing("Inventory cost"))?,
            terminal,
        })
    }
}

fn missing(field: &str) -> StorageError {
    StorageError::InvalidInput(format!("{field} has not been set."))
}
