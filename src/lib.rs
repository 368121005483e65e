//! Ferric Storage values flexible commodity storage (for example a gas cavern) by least-squares
//! Monte Carlo under a multi-factor mean-reverting spot price model.
//!
//! The crate is organised bottom-up:
//! - [`core`]: error type, daily series and cash flows.
//! - [`math`], [`rates`]: interpolation, day counts and discounting.
//! - [`storage`]: the contract (ratchets, costs, losses, terminal condition), reachable
//!   inventory space, inventory grids and decision sets.
//! - [`models`]: the multi-factor spot model and its Monte Carlo simulator.
//! - [`lsmc`]: basis functions, valuation inputs and the valuation engine.
//!
//! References:
//! - Longstaff and Schwartz (2001), *Valuing American Options by Simulation*.
//! - Boogert and de Jong (2008), *Gas Storage Valuation Using a Monte Carlo Method*.
//!
//! Numerical considerations:
//! - NPVs are sampling estimates; the regression policy is sub-optimal so the estimate is biased
//!   low, while using regression values directly would bias it high.
//! - Inventory grid spacing trades accuracy against run time roughly linearly.
//! - The number of basis functions should stay well below the number of simulations.
//!
//! # Feature Flags
//! - `parallel`: values inventory grid points on Rayon worker threads.
//!
//! # Quick Start
//! Value a one-month storage with one mean-reverting factor:
//! ```rust
//! use chrono::NaiveDate;
//! use ferric_storage::core::DailySeries;
//! use ferric_storage::lsmc::{BasisFunctions, ValuationInputs, ValuationParameters, calculate};
//! use ferric_storage::models::{MultiFactorParameters, MultiFactorSpotSimulator};
//! use ferric_storage::rates::ContinuousCompoundingDiscounter;
//! use ferric_storage::storage::{CmdtyStorage, FixedSpacingGrid};
//!
//! let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
//! let storage = CmdtyStorage::builder()
//!     .active_period(start, end)
//!     .constant_inject_withdraw_range(-20.0, 20.0)
//!     .min_inventory(0.0)
//!     .max_inventory(100.0)
//!     .per_unit_injection_cost(0.05, |date| date)
//!     .no_cmdty_consumed_on_inject()
//!     .per_unit_withdrawal_cost(0.05, |date| date)
//!     .no_cmdty_consumed_on_withdraw()
//!     .no_cmdty_inventory_loss()
//!     .no_inventory_cost()
//!     .must_be_empty_at_end()
//!     .build()
//!     .unwrap();
//!
//! let model = MultiFactorParameters::for_1_factor(12.0, DailySeries::from_fn(start, end, |_| 0.6)).unwrap();
//! let simulator = MultiFactorSpotSimulator::new(model, 200, Some(7)).unwrap();
//! let inputs = ValuationInputs {
//!     current_period: Some(start),
//!     inventory: Some(0.0),
//!     forward_curve: Some(DailySeries::from_fn(start, end, |_| 10.0)),
//!     grid_calc: Some(FixedSpacingGrid::for_global_inventory_range(&storage, 20).unwrap()),
//!     basis_functions: Some(BasisFunctions::parse("1 + x0 + x0**2").unwrap()),
//!     storage: Some(storage),
//!     ..ValuationInputs::new()
//! }
//! .settle_date_rule(|date| date)
//! .discounter(ContinuousCompoundingDiscounter::flat(0.03).unwrap())
//! .simulator(simulator);
//!
//! let results = calculate(&ValuationParameters::from_inputs(inputs).unwrap()).unwrap();
//! assert!(results.npv.is_finite());
//! assert_eq!(results.deltas.len(), 30);
//! ```

pub mod core;
pub mod lsmc;
pub mod math;
pub mod models;
pub mod rates;
pub mod storage;

/// Common imports for ergonomic usage.
#[allow(ambiguous_glob_reexports)]
pub mod prelude {
    pub use crate::core::*;
    pub use crate::lsmc::*;
    pub use crate::models::*;
    pub use crate::rates::*;
    pub use crate::storage::*;
}
