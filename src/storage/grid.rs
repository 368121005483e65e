//! Inventory state-space grids.
//!
//! Every period's grid is cut from one global lattice `origin + k * spacing`, so a post-decision
//! inventory that lands on a lattice point in one period lands on a grid point of the next.

use serde::{Deserialize, Serialize};

use crate::core::{StorageError, StorageResult};
use crate::storage::contract::CmdtyStorage;

/// Fixed-spacing grid calculator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedSpacingGrid {
    spacing: f64,
    origin: f64,
}

impl FixedSpacingGrid {
    pub fn new(spacing: f64, origin: f64) -> StorageResult<Self> {
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(StorageError::InvalidInput(
                "grid spacing must be finite and > 0".to_string(),
            ));
        }
        if !origin.is_finite() {
            return Err(StorageError::InvalidInput(
                "grid origin must be finite".to_string(),
            ));
        }
        Ok(Self { spacing, origin })
    }

    /// Spreads `num_points` over the global inventory range of `storage`.
    pub fn for_global_inventory_range(storage: &CmdtyStorage, num_points: usize) -> StorageResult<Self> {
        if num_points < 3 {
            return Err(StorageError::InvalidInput(format!(
                "number of grid points over the global inventory range must be at least 3, got {num_points}"
            )));
        }
        let global = storage.global_inventory_range()?;
        let spacing = global.width() / (num_points - 1) as f64;
        Self::new(spacing, global.min_inventory)
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Grid over `[min_inventory, max_inventory]`: both ends plus every lattice point strictly
    /// inside (further than `tolerance` from the ends).
    pub fn grid_points(
        &self,
        min_inventory: f64,
        max_inventory: f64,
        tolerance: f64,
    ) -> StorageResult<Vec<f64>> {
        if max_inventory < min_inventory - tolerance {
            return Err(StorageError::InfeasibleConstraints(format!(
                "empty inventory interval [{min_inventory}, {max_inventory}]"
            )));
        }
        if max_inventory - min_inventory <= tolerance {
            return Ok(vec![min_inventory]);
        }

        let mut points = vec![min_inventory];
        let mut k = ((min_inventory - self.origin) / self.spacing).floor() as i64 + 1;
        loop {
            let x = self.origin + k as f64 * self.spacing;
            if x >= max_inventory - tolerance {
                break;
            }
            if x > min_inventory + tolerance {
                points.push(x);
            }
            k += 1;
        }
        points.push(max_inventory);
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn interval_on_lattice_gives_even_points() {
        let grid = FixedSpacingGrid::new(2.5, 0.0).unwrap();
        let points = grid.grid_points(0.0, 10.0, 1e-10).unwrap();
        assert_eq!(points, vec![0.0, 2.5, 5.0, 7.5, 10.0]);
    }

    #[test]
    fn off_lattice_ends_are_kept() {
        let grid = FixedSpacingGrid::new(2.5, 0.0).unwrap();
        let points = grid.grid_points(1.2, 8.1, 1e-10).unwrap();
        assert_eq!(points, vec![1.2, 2.5, 5.0, 7.5, 8.1]);
    }

    #[test]
    fn degenerate_interval_is_single_point() {
        let grid = FixedSpacingGrid::new(2.5, 0.0).unwrap();
        assert_eq!(grid.grid_points(3.0, 3.0, 1e-10).unwrap(), vec![3.0]);
        assert!(grid.grid_points(3.0, 2.0, 1e-10).unwrap_err().is_infeasible());
    }

    #[test]
    fn interior_points_share_lattice_across_intervals() {
        let grid = FixedSpacingGrid::new(0.7, -1.0).unwrap();
        let a = grid.grid_points(0.0, 5.0, 1e-10).unwrap();
        let b = grid.grid_points(1.0, 6.0, 1e-10).unwrap();
        for x in a[1..a.len() - 1].iter().chain(&b[1..b.len() - 1]) {
            let k = (x + 1.0) / 0.7;
            assert_relative_eq!(k, k.round(), epsilon = 1e-9);
        }
    }

    #[test]
    fn zero_spacing_rejected() {
        assert!(FixedSpacingGrid::new(0.0, 0.0).is_err());
    }
}
