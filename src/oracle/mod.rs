//! Structured-prediction oracles.
//!
//! An oracle bundles the three structure-specific operations the solver
//! needs behind one contract: the joint feature map, the task loss, and the
//! loss-augmented decoder. The solver stays structure-agnostic; chains,
//! trees or general graphs plug in by implementing [`StructuredOracle`] and
//! composing it into the solver at construction time.

mod chain;

pub use self::chain::ChainOracle;

use crate::error::{Result, TrainError};

/// The structure-specific contract consumed by
/// [`BcfwSolver`](crate::solver::BcfwSolver).
///
/// `dimensions` must be implemented by every oracle; the remaining methods
/// default to [`TrainError::NotImplemented`], so a partially implemented
/// oracle fails loudly at first use instead of feeding zero feature maps
/// into training.
pub trait StructuredOracle {
    /// Dimension of the joint feature vector, which must equal the weight
    /// vector's length.
    fn dimensions(&self) -> usize;

    /// Joint feature map `phi(x, y)` of a covariate and a candidate label
    /// sequence. Pure and deterministic.
    fn feature_map(&self, _covariate: &[f64], _labels: &[usize]) -> Result<Vec<f64>> {
        Err(TrainError::NotImplemented("feature_map"))
    }

    /// Task loss between the true and predicted label sequences, in
    /// `[0, 1]`. The truth goes first; the loss-augmented decoder depends
    /// on the argument order.
    fn loss(&self, _truth: &[usize], _predicted: &[usize]) -> Result<f64> {
        Err(TrainError::NotImplemented("loss"))
    }

    /// Label sequence maximizing `<w, phi(x, y)> + loss(truth, y)` under
    /// the current weights.
    fn max_oracle(
        &self,
        _weights: &[f64],
        _covariate: &[f64],
        _truth: &[usize],
    ) -> Result<Vec<usize>> {
        Err(TrainError::NotImplemented("max_oracle"))
    }
}
