//! Interpolation routines for curves and inventory grids.
//!
//! Two users share this module: zero-rate curves used for discounting (piecewise-linear with
//! flat extrapolation) and the inventory-grid lookups inside backward induction, where a
//! post-decision inventory is located on the next period's grid and continuation values are
//! blended with linear weights.
//!
//! Numerical considerations: grid lookups snap to a node when the query lies within the
//! numerical tolerance of it, so that boundary-exact decisions do not pick up interpolation noise.

use crate::core::{StorageError, StorageResult};

/// Common interpolation interface.
pub trait Interpolator {
    /// Returns interpolated value `y(x)`.
    fn value(&self, x: f64) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QueryLocation {
    Left,
    Inside(usize),
    Right,
}

fn validate_xy(x: &[f64], y: &[f64], min_len: usize) -> StorageResult<()> {
    if x.len() != y.len() {
        return Err(StorageError::InvalidInput(
            "x and y must have same length".to_string(),
        ));
    }
    if x.len() < min_len {
        return Err(StorageError::InvalidInput(
            "not enough interpolation nodes".to_string(),
        ));
    }
    if x.windows(2).any(|w| w[1] <= w[0]) {
        return Err(StorageError::InvalidInput(
            "x must be strictly increasing".to_string(),
        ));
    }
    if x.iter().any(|v| !v.is_finite()) || y.iter().any(|v| !v.is_finite()) {
        return Err(StorageError::InvalidInput(
            "x and y must be finite".to_string(),
        ));
    }
    Ok(())
}

/// Index of the bracket `[x[i], x[i + 1]]` containing `xq`; the last bracket for `xq == x[n-1]`.
pub(crate) fn query_location(x: &[f64], xq: f64) -> QueryLocation {
    if xq < x[0] {
        return QueryLocation::Left;
    }
    if xq > x[x.len() - 1] {
        return QueryLocation::Right;
    }
    let idx = x.partition_point(|v| *v <= xq);
    if idx == 0 {
        QueryLocation::Inside(0)
    } else if idx >= x.len() {
        QueryLocation::Inside(x.len().saturating_sub(2))
    } else {
        QueryLocation::Inside(idx - 1)
    }
}

#[inline]
pub(crate) fn linear_weights(x0: f64, x1: f64, xq: f64) -> (f64, f64) {
    let w = if (x1 - x0).abs() <= f64::EPSILON {
        0.0
    } else {
        (xq - x0) / (x1 - x0)
    };
    (1.0 - w, w)
}

/// Solves for `x` on the straight line through `(x1, y1)` and `(x2, y2)` where `y = y_target`.
#[inline]
pub fn interpolate_linear_and_solve(x1: f64, y1: f64, x2: f64, y2: f64, y_target: f64) -> f64 {
    if (y2 - y1).abs() <= f64::EPSILON {
        return x1;
    }
    x1 + (y_target - y1) * (x2 - x1) / (y2 - y1)
}

/// Piecewise-linear interpolation in `y`, flat beyond the end nodes.
#[derive(Debug, Clone)]
pub struct LinearInterpolator {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl LinearInterpolator {
    /// Builds the interpolator. A single node is accepted and behaves as a constant.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> StorageResult<Self> {
        validate_xy(&x, &y, 1)?;
        Ok(Self { x, y })
    }
}

impl Interpolator for LinearInterpolator {
    // `new` guarantees at least one node, so every query has an answer.
    fn value(&self, xq: f64) -> f64 {
        let n = self.x.len();
        if n == 1 {
            return self.y[0];
        }
        match query_location(&self.x, xq) {
            QueryLocation::Left => self.y[0],
            QueryLocation::Right => self.y[n - 1],
            QueryLocation::Inside(i) => {
                let (w0, w1) = linear_weights(self.x[i], self.x[i + 1], xq);
                w0 * self.y[i] + w1 * self.y[i + 1]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn linear_interpolator_blends_and_extrapolates_flat() {
        let interp =
            LinearInterpolator::new(vec![0.0, 1.0, 3.0], vec![0.02, 0.03, 0.05]).unwrap();
        assert_relative_eq!(interp.value(0.5), 0.025, epsilon = 1e-14);
        assert_relative_eq!(interp.value(2.0), 0.04, epsilon = 1e-14);
        assert_relative_eq!(interp.value(-1.0), 0.02, epsilon = 1e-14);
        assert_relative_eq!(interp.value(9.0), 0.05, epsilon = 1e-14);
    }

    #[test]
    fn single_node_is_constant() {
        let interp = LinearInterpolator::new(vec![0.0], vec![0.07]).unwrap();
        assert_eq!(interp.value(-50.0), 0.07);
        assert_eq!(interp.value(1e6), 0.07);
    }

    #[test]
    fn invalid_nodes_are_rejected() {
        assert!(LinearInterpolator::new(vec![1.0, 1.0], vec![0.0, 0.0]).is_err());
        assert!(LinearInterpolator::new(vec![], vec![]).is_err());
        assert!(LinearInterpolator::new(vec![0.0], vec![f64::NAN]).is_err());
    }

    #[test]
    fn solve_on_line_segment() {
        let x = interpolate_linear_and_solve(0.0, -6.0, 23.5, 16.795, 0.0);
        assert_relative_eq!(x, 6.0 / 0.97, epsilon = 1e-12);
    }

    #[test]
    fn query_location_uses_last_bracket_at_top_node() {
        let grid = [0.0, 5.3, 9.5];
        assert_eq!(query_location(&grid, 9.5), QueryLocation::Inside(1));
        assert_eq!(query_location(&grid, 5.3), QueryLocation::Inside(1));
        assert_eq!(query_location(&grid, 0.0), QueryLocation::Inside(0));
        assert_eq!(query_location(&grid, 10.0), QueryLocation::Right);
    }
}
