//! Least-squares Monte Carlo storage valuation.
//!
//! [`ValuationInputs`] are checked into [`ValuationParameters`] and handed to [`calculate`].
//! Regression basis functions are built with [`BasisFunctions`], either programmatically from
//! [`s`] and [`x`] or parsed from an expression such as `"1 + s + x0 + x0**2"`.

pub mod basis;
pub mod control;
pub mod engine;
pub mod expression;
pub mod params;
pub mod results;

pub use basis::{BasisFunction, BasisFunctions, CustomBasisFn, MAX_POWER, PowerMonomial, s, x};
pub use control::{CancellationToken, ProgressCallback, ProgressFn};
pub use engine::calculate;
pub use expression::parse_basis_functions;
pub use params::{SettleDateFn, ValuationConfig, ValuationInputs, ValuationParameters};
pub use results::{
    SimPanel, StorageProfile, TriggerPricePoint, TriggerPriceVolumeProfiles, TriggerPrices,
    ValuationResults,
};
