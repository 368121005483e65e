//! Module `models::multi_factor`.
//!
//! Multi-factor mean-reverting spot price model and its exact-step Monte Carlo simulator.
//!
//! Each factor `X_i` is an Ornstein-Uhlenbeck process with unit volatility and mean reversion
//! `kappa_i`, started at zero on the valuation date, with instantaneous correlation `rho_ij`.
//! The spot price for delivery on day `T` observed on `T` is
//! `S(T) = F(T) * exp(sum_i sigma_i(T) X_i(T) - 0.5 * Var[sum_i sigma_i(T) X_i(T)])`,
//! which makes `E[S(T)] = F(T)`.
//!
//! Key types: [`MultiFactorParameters`], [`MultiFactorSpotSimulator`] (implements
//! [`SpotSimulator`]) and [`SimulationResults`].
//!
//! Numerical design: steps use closed-form transition moments (not Euler). The per-step covariance
//! `Sigma_ij = rho_ij (1 - exp(-(kappa_i + kappa_j) dt)) / (kappa_i + kappa_j)` is factorised by
//! Cholesky, falling back to a symmetric eigen-decomposition when it is only semi-definite.
//! Time is measured in Act/365 years.
use chrono::NaiveDate;
use log::debug;
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

use crate::core::{DailySeries, StorageError, StorageResult, days_between, days_inclusive};

const DAYS_PER_YEAR: f64 = 365.0;

/// One model factor.
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    pub mean_reversion: f64,
    /// Spot volatility by delivery day.
    pub volatility: DailySeries<f64>,
}

impl Factor {
    pub fn new(mean_reversion: f64, volatility: DailySeries<f64>) -> Self {
        Self {
            mean_reversion,
            volatility,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.mean_reversion.is_finite() || self.mean_reversion < 0.0 {
            return Err("mean reversion must be finite and >= 0".to_string());
        }
        if self.volatility.is_empty() {
            return Err("volatility curve cannot be empty".to_string());
        }
        if self
            .volatility
            .values()
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err("volatility must be finite and >= 0".to_string());
        }
        Ok(())
    }
}

/// Factors plus their correlation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiFactorParameters {
    factors: Vec<Factor>,
    correlations: DMatrix<f64>,
}

impl MultiFactorParameters {
    pub fn new(factors: Vec<Factor>, correlations: DMatrix<f64>) -> StorageResult<Self> {
        let params = Self {
            factors,
            correlations,
        };
        params.validate().map_err(StorageError::InvalidInput)?;
        Ok(params)
    }

    pub fn for_1_factor(mean_reversion: f64, volatility: DailySeries<f64>) -> StorageResult<Self> {
        Self::new(
            vec![Factor::new(mean_reversion, volatility)],
            DMatrix::identity(1, 1),
        )
    }

    pub fn for_2_factors(correlation: f64, first: Factor, second: Factor) -> StorageResult<Self> {
        Self::new(
            vec![first, second],
            DMatrix::from_row_slice(2, 2, &[1.0, correlation, correlation, 1.0]),
        )
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.factors.is_empty() {
            return Err("at least one factor is required".to_string());
        }
        for (i, factor) in self.factors.iter().enumerate() {
            factor.validate().map_err(|e| format!("factor {i}: {e}"))?;
        }
        let n = self.factors.len();
        if self.correlations.nrows() != n || self.correlations.ncols() != n {
            return Err(format!("correlation matrix must be {n}x{n}"));
        }
        for i in 0..n {
            if (self.correlations[(i, i)] - 1.0).abs() > 1e-12 {
                return Err("correlation matrix must have unit diagonal".to_string());
            }
            for j in 0..i {
                let rho = self.correlations[(i, j)];
                if !rho.is_finite() || !(-1.0..=1.0).contains(&rho) {
                    return Err("correlations must be finite and in [-1, 1]".to_string());
                }
                if (rho - self.correlations[(j, i)]).abs() > 1e-12 {
                    return Err("correlation matrix must be symmetric".to_string());
                }
            }
        }
        if self.correlations.clone().cholesky().is_none() {
            return Err("correlation matrix must be positive definite".to_string());
        }
        Ok(())
    }

    pub fn num_factors(&self) -> usize {
        self.factors.len()
    }

    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    pub fn correlations(&self) -> &DMatrix<f64> {
        &self.correlations
    }

    /// `Cov[X_i(t), X_j(t)]` for factors started at zero, `t` in years.
    fn factor_covariance(&self, t: f64) -> DMatrix<f64> {
        let n = self.num_factors();
        DMatrix::from_fn(n, n, |i, j| {
            let k = self.factors[i].mean_reversion + self.factors[j].mean_reversion;
            self.correlations[(i, j)] * decay_integral(k, t)
        })
    }

    fn volatilities(&self, date: NaiveDate) -> StorageResult<DVector<f64>> {
        let vols = self
            .factors
            .iter()
            .map(|f| f.volatility.value(date).copied())
            .collect::<StorageResult<Vec<_>>>()?;
        Ok(DVector::from_vec(vols))
    }

    /// Variance of `ln S(to)` seen from `from`.
    pub fn spot_log_variance(&self, from: NaiveDate, to: NaiveDate) -> StorageResult<f64> {
        let t = days_between(from, to).max(0) as f64 / DAYS_PER_YEAR;
        let sigma = self.volatilities(to)?;
        Ok(sigma.dot(&(self.factor_covariance(t) * &sigma)))
    }
}

/// `integral_0^t exp(-k (t - u)) du`.
#[inline]
fn decay_integral(k: f64, t: f64) -> f64 {
    if k.abs() < 1e-12 {
        t
    } else {
        -(-k * t).exp_m1() / k
    }
}

/// Lower-triangular-like root `L` with `L L^T = cov`.
fn covariance_root(cov: &DMatrix<f64>) -> DMatrix<f64> {
    if let Some(chol) = cov.clone().cholesky() {
        return chol.l();
    }
    let eigen = cov.clone().symmetric_eigen();
    let sqrt_vals = eigen.eigenvalues.map(|v| v.max(0.0).sqrt());
    eigen.eigenvectors * DMatrix::from_diagonal(&sqrt_vals)
}

/// Simulated spot prices and factor paths, one entry per day from the valuation date.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResults {
    start: NaiveDate,
    num_sims: usize,
    num_factors: usize,
    spot: Vec<Vec<f64>>,
    factors: Vec<Vec<Vec<f64>>>,
}

impl SimulationResults {
    /// Assembles results from per-period spot prices and per-period, per-factor paths.
    pub fn new(
        start: NaiveDate,
        num_sims: usize,
        num_factors: usize,
        spot: Vec<Vec<f64>>,
        factors: Vec<Vec<Vec<f64>>>,
    ) -> StorageResult<Self> {
        if spot.len() != factors.len()
            || spot.iter().any(|s| s.len() != num_sims)
            || factors
                .iter()
                .any(|f| f.len() != num_factors || f.iter().any(|x| x.len() != num_sims))
        {
            return Err(StorageError::InvalidInput(
                "simulation arrays have inconsistent dimensions".to_string(),
            ));
        }
        Ok(Self {
            start,
            num_sims,
            num_factors,
            spot,
            factors,
        })
    }

    pub fn num_sims(&self) -> usize {
        self.num_sims
    }

    pub fn num_factors(&self) -> usize {
        self.num_factors
    }

    pub fn num_periods(&self) -> usize {
        self.spot.len()
    }

    fn index(&self, date: NaiveDate) -> StorageResult<usize> {
        let idx = days_between(self.start, date);
        if idx < 0 || idx as usize >= self.spot.len() {
            return Err(StorageError::InvalidInput(format!(
                "no simulated prices for {date}"
            )));
        }
        Ok(idx as usize)
    }

    pub fn spot_prices_for_period(&self, date: NaiveDate) -> StorageResult<&[f64]> {
        Ok(&self.spot[self.index(date)?])
    }

    pub fn markov_factors_for_period(&self, date: NaiveDate, factor: usize) -> StorageResult<&[f64]> {
        let idx = self.index(date)?;
        self.factors[idx]
            .get(factor)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                StorageError::InvalidInput(format!(
                    "factor index {factor} out of range for {} factors",
                    self.num_factors
                ))
            })
    }

    /// All factor paths for `date`.
    pub fn markov_factors(&self, date: NaiveDate) -> StorageResult<Vec<&[f64]>> {
        let idx = self.index(date)?;
        Ok(self.factors[idx].iter().map(Vec::as_slice).collect())
    }
}

/// Source of simulated spot prices for the valuation engine.
pub trait SpotSimulator: Send + Sync {
    fn num_factors(&self) -> usize;

    /// Simulates every day in `[current, end]`. The `current` day is deterministic.
    fn simulate(
        &self,
        current: NaiveDate,
        end: NaiveDate,
        forward_curve: &DailySeries<f64>,
    ) -> StorageResult<SimulationResults>;
}

/// Exact-step simulator for [`MultiFactorParameters`].
#[derive(Debug, Clone)]
pub struct MultiFactorSpotSimulator {
    params: MultiFactorParameters,
    num_sims: usize,
    seed: Option<u64>,
}

impl MultiFactorSpotSimulator {
    /// `seed = None` draws a fresh seed per run.
    pub fn new(params: MultiFactorParameters, num_sims: usize, seed: Option<u64>) -> StorageResult<Self> {
        if num_sims == 0 {
            return Err(StorageError::InvalidInput(
                "number of simulations must be > 0".to_string(),
            ));
        }
        Ok(Self {
            params,
            num_sims,
            seed,
        })
    }

    pub fn params(&self) -> &MultiFactorParameters {
        &self.params
    }
}

impl SpotSimulator for MultiFactorSpotSimulator {
    fn num_factors(&self) -> usize {
        self.params.num_factors()
    }

    fn simulate(
        &self,
        current: NaiveDate,
        end: NaiveDate,
        forward_curve: &DailySeries<f64>,
    ) -> StorageResult<SimulationResults> {
        if end < current {
            return Err(StorageError::InvalidInput(format!(
                "simulation end {end} is before {current}"
            )));
        }
        let n = self.params.num_factors();
        let num_sims = self.num_sims;
        let seed = self.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);

        let dt = 1.0 / DAYS_PER_YEAR;
        let decay: Vec<f64> = self
            .params
            .factors
            .iter()
            .map(|f| (-f.mean_reversion * dt).exp())
            .collect();
        let step_cov = self.params.factor_covariance(dt);
        let root = covariance_root(&step_cov);
        let pair_decay = DMatrix::from_fn(n, n, |i, j| decay[i] * decay[j]);

        let num_periods = days_between(current, end) as usize + 1;
        let mut spot = Vec::with_capacity(num_periods);
        let mut factors = Vec::with_capacity(num_periods);
        let mut state = vec![vec![0.0; num_sims]; n];
        let mut cumulative_cov = DMatrix::<f64>::zeros(n, n);
        let mut z = vec![0.0; n];

        for (step, date) in days_inclusive(current, end).enumerate() {
            let forward = *forward_curve.value(date)?;
            if step > 0 {
                for sim in 0..num_sims {
                    for zi in z.iter_mut() {
                        *zi = StandardNormal.sample(&mut rng);
                    }
                    for i in 0..n {
                        let shock: f64 = (0..n).map(|j| root[(i, j)] * z[j]).sum();
                        state[i][sim] = state[i][sim] * decay[i] + shock;
                    }
                }
                cumulative_cov = cumulative_cov.component_mul(&pair_decay) + &step_cov;
            }

            let sigma = self.params.volatilities(date)?;
            let log_variance = sigma.dot(&(&cumulative_cov * &sigma));
            let prices = (0..num_sims)
                .map(|sim| {
                    let log_dev: f64 = (0..n).map(|i| sigma[i] * state[i][sim]).sum();
                    forward * (log_dev - 0.5 * log_variance).exp()
                })
                .collect();
            spot.push(prices);
            factors.push(state.clone());
        }

        debug!(
            "simulated {num_sims} paths of {n} factor(s) over {num_periods} periods (seed {seed})"
        );
        SimulationResults::new(current, num_sims, n, spot, factors)
    }
}
