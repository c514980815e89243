//! Structural SVM training with Block-Coordinate Frank-Wolfe (BCFW)
//!
//! This library implements the single-machine core of a distributed
//! structured-output trainer: a BCFW dual solver that updates one example's
//! dual block per step, paired with a chain oracle solving the
//! loss-augmented decoding problem by max-sum dynamic programming in the
//! log domain. The solver is structure-agnostic: any type implementing
//! [`StructuredOracle`] plugs in unchanged.
//!
//! # Examples
//!
//! ```
//! use structsvm::{BcfwSolver, ChainOracle, Dataset, Sampling};
//!
//! // Two states, one feature per sequence position
//! let oracle = ChainOracle::new(2, 1)?;
//!
//! let mut dataset = Dataset::new();
//! dataset.append(vec![1.0, -1.0, 1.0], vec![0, 1, 0])?;
//! dataset.append(vec![-1.0, 1.0], vec![1, 0])?;
//!
//! let mut solver = BcfwSolver::new(oracle, dataset)?
//!     .with_lambda(0.01)?
//!     .with_max_iterations(50)?
//!     .with_sampling(Sampling::RoundRobin);
//! let status = solver.train()?;
//! println!("finished: {:?}, dual = {}", status, solver.dual_objective());
//!
//! let w = solver.weights();
//! # assert_eq!(w.len(), 2 * 1 + 2 * 2 + 2 * 2);
//! # Ok::<(), structsvm::TrainError>(())
//! ```

mod dataset;
mod error;

/// Structure-specific oracles: feature map, loss and loss-augmented decoding
pub mod oracle;
/// The BCFW optimizer
pub mod solver;

// Re-export main types
pub use self::dataset::{Dataset, Instance};
pub use self::error::{Result, TrainError};
pub use self::oracle::{ChainOracle, StructuredOracle};
pub use self::solver::{BcfwParams, BcfwSolver, Sampling, SolveStatus};
