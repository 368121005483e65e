//! Module `lsmc::basis`.
//!
//! Regression basis functions and the per-period design matrix.
//!
//! A basis function fills one design-matrix column (one value per simulation) from the simulated
//! Markov factors and spot prices of a period. Every built-in function is a [`PowerMonomial`]:
//! the product of spot and factor integer powers. Monomials multiply by adding exponents and
//! raise to a power by scaling them, so a product is evaluated once rather than factor by factor.
//!
//! Key types: [`PowerMonomial`], [`BasisFunction`], [`BasisFunctions`].
//! Key helpers: [`s`], [`x`] for writing monomials as `s() * x(0).pow(2)`.
//!
//! References: Longstaff and Schwartz (2001), Boogert and de Jong (2008).
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Mul};
use std::sync::Arc;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::core::{StorageError, StorageResult};
use crate::lsmc::expression::parse_basis_functions;

/// Largest exponent a monomial can be evaluated with (`f64::powi` takes an `i32`).
pub const MAX_POWER: u32 = i32::MAX as u32;

fn evaluation_power(power: u32) -> StorageResult<i32> {
    i32::try_from(power).map_err(|_| StorageError::OutOfRange {
        value: f64::from(power),
        min: 0.0,
        max: f64::from(MAX_POWER),
    })
}

fn checked_power(power: Option<u32>) -> Option<u32> {
    power.filter(|p| *p <= MAX_POWER)
}

/// `spot^a * x_0^b_0 * x_1^b_1 * ...` with non-negative integer exponents.
///
/// The `*` operator and [`PowerMonomial::pow`] saturate on overflow and evaluation then rejects
/// exponents above [`MAX_POWER`]; [`PowerMonomial::checked_mul`] and
/// [`PowerMonomial::checked_pow`] report overflow instead.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PowerMonomial {
    spot_power: u32,
    factor_powers: BTreeMap<usize, u32>,
}

/// Spot price to the power one.
pub fn s() -> PowerMonomial {
    PowerMonomial::spot()
}

/// Markov factor `index` to the power one.
pub fn x(index: usize) -> PowerMonomial {
    PowerMonomial::factor(index)
}

impl PowerMonomial {
    /// The constant monomial.
    pub fn one() -> Self {
        Self::default()
    }

    pub fn spot() -> Self {
        Self {
            spot_power: 1,
            factor_powers: BTreeMap::new(),
        }
    }

    pub fn factor(index: usize) -> Self {
        Self {
            spot_power: 0,
            factor_powers: BTreeMap::from([(index, 1)]),
        }
    }

    /// Rejects negative powers.
    pub fn new(spot_power: i32, factor_powers: &[(usize, i32)]) -> StorageResult<Self> {
        let spot_power = u32::try_from(spot_power).map_err(|_| {
            StorageError::InvalidInput("Spot power must be non-negative.".to_string())
        })?;
        let mut monomial = Self {
            spot_power,
            factor_powers: BTreeMap::new(),
        };
        for &(index, power) in factor_powers {
            let power = u32::try_from(power).map_err(|_| {
                StorageError::InvalidInput("Markov factor powers must be non-negative.".to_string())
            })?;
            let total = monomial.factor_powers.entry(index).or_insert(0);
            *total = checked_power(total.checked_add(power)).ok_or_else(|| {
                StorageError::InvalidInput(format!(
                    "Markov factor x{index} power exceeds {MAX_POWER}."
                ))
            })?;
        }
        monomial.factor_powers.retain(|_, p| *p > 0);
        Ok(monomial)
    }

    pub fn spot_power(&self) -> u32 {
        self.spot_power
    }

    pub fn factor_power(&self, index: usize) -> u32 {
        self.factor_powers.get(&index).copied().unwrap_or(0)
    }

    pub fn factor_powers(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.factor_powers.iter().map(|(i, p)| (*i, *p))
    }

    pub fn is_constant(&self) -> bool {
        self.spot_power == 0 && self.factor_powers.is_empty()
    }

    pub fn max_factor_index(&self) -> Option<usize> {
        self.factor_powers.keys().next_back().copied()
    }

    /// Multiplies every exponent by `power`, saturating on overflow.
    pub fn pow(&self, power: u32) -> Self {
        if power == 0 {
            return Self::one();
        }
        Self {
            spot_power: self.spot_power.saturating_mul(power),
            factor_powers: self
                .factor_powers
                .iter()
                .map(|(i, p)| (*i, p.saturating_mul(power)))
                .collect(),
        }
    }

    /// Like [`PowerMonomial::pow`] but `None` when an exponent would exceed [`MAX_POWER`].
    pub fn checked_pow(&self, power: u32) -> Option<Self> {
        if power == 0 {
            return Some(Self::one());
        }
        let mut factor_powers = BTreeMap::new();
        for (&i, &p) in &self.factor_powers {
            factor_powers.insert(i, checked_power(p.checked_mul(power))?);
        }
        Some(Self {
            spot_power: checked_power(self.spot_power.checked_mul(power))?,
            factor_powers,
        })
    }

    /// Product of two monomials, `None` when an exponent would exceed [`MAX_POWER`].
    pub fn checked_mul(&self, rhs: &PowerMonomial) -> Option<Self> {
        let mut product = self.clone();
        product.spot_power = checked_power(product.spot_power.checked_add(rhs.spot_power))?;
        for (&i, &p) in &rhs.factor_powers {
            let total = product.factor_powers.entry(i).or_insert(0);
            *total = checked_power(total.checked_add(p))?;
        }
        Some(product)
    }

    /// Largest exponent in the monomial.
    pub fn max_power(&self) -> u32 {
        self.factor_powers
            .values()
            .copied()
            .fold(self.spot_power, u32::max)
    }

    /// Writes the monomial of every simulation into `column`.
    pub fn evaluate_into(
        &self,
        markov_factors: &[&[f64]],
        spot_prices: &[f64],
        column: &mut [f64],
    ) -> StorageResult<()> {
        if spot_prices.len() != column.len() {
            return Err(StorageError::InvalidInput(format!(
                "spot price count {} does not match column length {}",
                spot_prices.len(),
                column.len()
            )));
        }
        if self.spot_power == 0 {
            column.fill(1.0);
        } else {
            let p = evaluation_power(self.spot_power)?;
            for (out, s) in column.iter_mut().zip(spot_prices) {
                *out = s.powi(p);
            }
        }
        for (&index, &power) in &self.factor_powers {
            let factor = markov_factors.get(index).ok_or_else(|| {
                StorageError::InvalidInput(format!(
                    "basis function uses factor x{index} but only {} factor(s) are simulated",
                    markov_factors.len()
                ))
            })?;
            if factor.len() != column.len() {
                return Err(StorageError::InvalidInput(format!(
                    "factor x{index} has {} simulations, expected {}",
                    factor.len(),
                    column.len()
                )));
            }
            let p = evaluation_power(power)?;
            for (out, x) in column.iter_mut().zip(factor.iter()) {
                *out *= x.powi(p);
            }
        }
        Ok(())
    }
}

impl fmt::Display for PowerMonomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_constant() {
            return write!(f, "1");
        }
        let mut parts = Vec::new();
        match self.spot_power {
            0 => {}
            1 => parts.push("s".to_string()),
            p => parts.push(format!("s**{p}")),
        }
        for (i, p) in &self.factor_powers {
            if *p == 1 {
                parts.push(format!("x{i}"));
            } else {
                parts.push(format!("x{i}**{p}"));
            }
        }
        write!(f, "{}", parts.join(" * "))
    }
}

impl Mul for PowerMonomial {
    type Output = PowerMonomial;

    fn mul(mut self, rhs: PowerMonomial) -> PowerMonomial {
        self.spot_power = self.spot_power.saturating_add(rhs.spot_power);
        for (i, p) in rhs.factor_powers {
            let total = self.factor_powers.entry(i).or_insert(0);
            *total = total.saturating_add(p);
        }
        self
    }
}

impl Add for PowerMonomial {
    type Output = BasisFunctions;

    fn add(self, rhs: PowerMonomial) -> BasisFunctions {
        BasisFunctions::from(self) + rhs
    }
}

/// Signature of a user supplied basis function: factors by index, spot prices, output column.
pub type CustomBasisFn = dyn Fn(&[&[f64]], &[f64], &mut [f64]) + Send + Sync;

/// One design-matrix column generator.
#[derive(Clone)]
pub enum BasisFunction {
    Monomial(PowerMonomial),
    Custom(Arc<CustomBasisFn>),
}

impl BasisFunction {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[&[f64]], &[f64], &mut [f64]) + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    pub fn evaluate_into(
        &self,
        markov_factors: &[&[f64]],
        spot_prices: &[f64],
        column: &mut [f64],
    ) -> StorageResult<()> {
        match self {
            Self::Monomial(m) => m.evaluate_into(markov_factors, spot_prices, column),
            Self::Custom(f) => {
                f(markov_factors, spot_prices, column);
                Ok(())
            }
        }
    }
}

impl fmt::Debug for BasisFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monomial(m) => write!(f, "Monomial({m})"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl From<PowerMonomial> for BasisFunction {
    fn from(value: PowerMonomial) -> Self {
        Self::Monomial(value)
    }
}

/// Ordered list of basis functions, one per design-matrix column.
#[derive(Debug, Clone, Default)]
pub struct BasisFunctions {
    functions: Vec<BasisFunction>,
}

fn check_max_power(max_power: u32) -> StorageResult<()> {
    if max_power < 1 {
        return Err(StorageError::InvalidInput(
            "Maximum power must be greater than zero.".to_string(),
        ));
    }
    Ok(())
}

impl BasisFunctions {
    pub fn new(functions: Vec<BasisFunction>) -> Self {
        Self { functions }
    }

    pub fn ones() -> Self {
        PowerMonomial::one().into()
    }

    pub fn spot_price_power(power: u32) -> Self {
        s().pow(power).into()
    }

    pub fn markov_factor_power(factor: usize, power: u32) -> Self {
        x(factor).pow(power).into()
    }

    /// `x_factor^1 .. x_factor^max_power`.
    pub fn markov_factor_powers_up_to(factor: usize, max_power: u32) -> StorageResult<Self> {
        check_max_power(max_power)?;
        Ok(Self::new(
            (1..=max_power)
                .map(|p| BasisFunction::from(x(factor).pow(p)))
                .collect(),
        ))
    }

    /// Powers `1..=max_power` of every factor, factor-major.
    pub fn all_markov_factor_powers_up_to(max_power: u32, num_factors: usize) -> StorageResult<Self> {
        check_max_power(max_power)?;
        let mut functions = Self::default();
        for factor in 0..num_factors {
            functions = functions + Self::markov_factor_powers_up_to(factor, max_power)?;
        }
        Ok(functions)
    }

    pub fn generic(spot_power: i32, factor_powers: &[(usize, i32)]) -> StorageResult<Self> {
        Ok(PowerMonomial::new(spot_power, factor_powers)?.into())
    }

    /// Constant column followed by powers `1..=max_degree` of each factor.
    pub fn polynomial(max_degree: u32, cross_products: bool, num_factors: usize) -> StorageResult<Self> {
        if cross_products {
            return Err(StorageError::NotImplemented(
                "cross products between Markov factors in polynomial regression".to_string(),
            ));
        }
        Ok(Self::ones() + Self::all_markov_factor_powers_up_to(max_degree, num_factors)?)
    }

    /// Parses a sum of monomials such as `1 + s + s*x0**2`.
    pub fn parse(expression: &str) -> StorageResult<Self> {
        let monomials = parse_basis_functions(expression)?;
        Ok(Self::new(
            monomials.iter().cloned().map(BasisFunction::from).collect(),
        ))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BasisFunction> {
        self.functions.iter()
    }

    /// Highest factor index used by a monomial, ignoring custom functions.
    pub fn max_factor_index(&self) -> Option<usize> {
        self.functions
            .iter()
            .filter_map(|f| match f {
                BasisFunction::Monomial(m) => m.max_factor_index(),
                BasisFunction::Custom(_) => None,
            })
            .max()
    }

    pub fn validate(&self, num_factors: usize) -> StorageResult<()> {
        if self.is_empty() {
            return Err(StorageError::InvalidInput(
                "at least one basis function is required".to_string(),
            ));
        }
        if let Some(max) = self.max_factor_index().filter(|max| *max >= num_factors) {
            return Err(StorageError::InvalidInput(format!(
                "basis functions use factor x{max} but the model has {num_factors} factor(s)"
            )));
        }
        for function in &self.functions {
            if let BasisFunction::Monomial(m) = function {
                evaluation_power(m.max_power())?;
            }
        }
        Ok(())
    }

    /// Fills `design` (`num_sims x len()`, column-major) from one period's simulations.
    pub fn populate_design_matrix(
        &self,
        markov_factors: &[&[f64]],
        spot_prices: &[f64],
        design: &mut DMatrix<f64>,
    ) -> StorageResult<()> {
        let num_sims = spot_prices.len();
        if design.nrows() != num_sims || design.ncols() != self.len() {
            return Err(StorageError::InvalidInput(format!(
                "design matrix is {}x{}, expected {num_sims}x{}",
                design.nrows(),
                design.ncols(),
                self.len()
            )));
        }
        if num_sims == 0 {
            return Ok(());
        }
        for (function, column) in self
            .functions
            .iter()
            .zip(design.as_mut_slice().chunks_mut(num_sims))
        {
            function.evaluate_into(markov_factors, spot_prices, column)?;
        }
        Ok(())
    }

    /// Allocates and fills a design matrix.
    pub fn design_matrix(&self, markov_factors: &[&[f64]], spot_prices: &[f64]) -> StorageResult<DMatrix<f64>> {
        let mut design = DMatrix::zeros(spot_prices.len(), self.len());
        self.populate_design_matrix(markov_factors, spot_prices, &mut design)?;
        Ok(design)
    }
}

impl From<PowerMonomial> for BasisFunctions {
    fn from(value: PowerMonomial) -> Self {
        Self::new(vec![value.into()])
    }
}

impl From<BasisFunction> for BasisFunctions {
    fn from(value: BasisFunction) -> Self {
        Self::new(vec![value])
    }
}

impl Add for BasisFunctions {
    type Output = BasisFunctions;

    fn add(mut self, rhs: BasisFunctions) -> BasisFunctions {
        self.functions.extend(rhs.functions);
        self
    }
}

impl Add<PowerMonomial> for BasisFunctions {
    type Output = BasisFunctions;

    fn add(mut self, rhs: PowerMonomial) -> BasisFunctions {
        self.functions.push(rhs.into());
        self
    }
}
