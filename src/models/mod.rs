//! Stochastic spot price models used by the storage valuation engine.
//!
//! Covers the multi-factor mean-reverting model and its Monte Carlo simulator.

pub mod multi_factor;

pub use multi_factor::{
    Factor, MultiFactorParameters, MultiFactorSpotSimulator, SimulationResults, SpotSimulator,
};
