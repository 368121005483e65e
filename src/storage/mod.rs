//! Storage contract model: ratchet constraints, contract builder, inventory space, grids and
//! decision sets.

pub mod constraints;
pub mod contract;
pub mod decisions;
pub mod grid;
pub mod inventory_space;

pub use constraints::{
    InjectWithdrawConstraint, InjectWithdrawRange, InjectWithdrawRangeByInventory,
    RatchetInterpolation, RatchetPillars,
};
pub use contract::{CmdtyStorage, CmdtyStorageBuilder, TerminalCondition};
pub use decisions::{GridWeights, bang_bang_decision_set, bisect_inventory_space};
pub use grid::FixedSpacingGrid;
pub use inventory_space::calculate_inventory_space;
