//! Library-wide error type for storage valuation.

use thiserror::Error;

/// Errors produced while building storage contracts or valuing them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    /// Malformed input: missing fields, non-finite numbers, inconsistent curves.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// An argument fell outside the interval it must lie in.
    #[error("value {value} is outside of the interval [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },
    /// Inventory constraints admit no feasible path. Never retried.
    #[error("storage inventory constraints cannot be satisfied: {0}")]
    InfeasibleConstraints(String),
    /// A requested option exists in the API but has no implementation.
    #[error("not implemented: {0}")]
    NotImplemented(String),
    /// Basis-function expression could not be tokenized or parsed.
    #[error("expression error at position {position}: {message}")]
    Expression { message: String, position: usize },
    /// Linear algebra or other numerical failure.
    #[error("numerical error: {0}")]
    Numerical(String),
    /// Valuation was cancelled through its cancellation token.
    #[error("valuation cancelled")]
    Cancelled,
}

impl StorageError {
    /// `true` for the cancellation outcome, which is not a computation failure.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// `true` for errors that signal an infeasible storage contract.
    #[inline]
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Self::InfeasibleConstraints(_))
    }
}

/// Result alias used across the crate.
pub type StorageResult<T> = Result<T, StorageError>;
