//! Block-Coordinate Frank-Wolfe solver.
//!
//! One solver instance owns its shard of the dataset and the matching block
//! of dual variables; a distributed coordinator runs one instance per shard
//! and periodically averages their weight vectors through
//! [`BcfwSolver::weights`] and [`BcfwSolver::set_weights`], treating each
//! vector as a snapshot (copy out, average, copy in) between steps.

mod bcfw;

pub use self::bcfw::{BcfwParams, BcfwSolver, Sampling, SolveStatus};
