use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dataset::{Dataset, Instance};
use crate::error::{Result, TrainError};
use crate::oracle::StructuredOracle;

/// Policy for picking the example a step works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
    /// Independent uniform draws
    Uniform,
    /// Cyclic sweeps in dataset order
    RoundRobin,
}

/// Terminal state reported by [`BcfwSolver::train`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// The exact duality gap dropped below the configured threshold
    Converged,
    /// The epoch budget ran out before the gap threshold was reached
    MaxIterationsReached,
    /// The external stop flag was raised between steps
    Stopped,
}

/// BCFW training parameters.
#[derive(Debug, Clone)]
pub struct BcfwParams {
    lambda: f64,
    max_iterations: usize,
    gap_threshold: f64,
    gap_check_period: usize,
    gap_smoothing: f64,
    sampling: Sampling,
    shuffle_seed: Option<u64>,
    averaging: bool,
}

impl Default for BcfwParams {
    fn default() -> Self {
        Self {
            lambda: 0.01,
            max_iterations: 100,
            gap_threshold: 1e-3,
            gap_check_period: 10,
            gap_smoothing: 0.1,
            sampling: Sampling::Uniform,
            shuffle_seed: None,
            averaging: false,
        }
    }
}

impl BcfwParams {
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn set_lambda(&mut self, lambda: f64) -> Result<()> {
        if lambda <= 0.0 {
            return Err(TrainError::InvalidConfig("lambda must be positive".into()));
        }
        self.lambda = lambda;
        Ok(())
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) -> Result<()> {
        if max_iterations < 1 {
            return Err(TrainError::InvalidConfig(
                "max_iterations must be at least 1".into(),
            ));
        }
        self.max_iterations = max_iterations;
        Ok(())
    }

    pub fn gap_threshold(&self) -> f64 {
        self.gap_threshold
    }

    pub fn set_gap_threshold(&mut self, gap_threshold: f64) -> Result<()> {
        if gap_threshold < 0.0 {
            return Err(TrainError::InvalidConfig(
                "gap_threshold must be non-negative".into(),
            ));
        }
        self.gap_threshold = gap_threshold;
        Ok(())
    }

    pub fn gap_check_period(&self) -> usize {
        self.gap_check_period
    }

    pub fn set_gap_check_period(&mut self, period: usize) -> Result<()> {
        if period == 0 {
            return Err(TrainError::InvalidConfig(
                "gap_check_period must be positive".into(),
            ));
        }
        self.gap_check_period = period;
        Ok(())
    }

    pub fn gap_smoothing(&self) -> f64 {
        self.gap_smoothing
    }

    pub fn set_gap_smoothing(&mut self, gap_smoothing: f64) -> Result<()> {
        if gap_smoothing <= 0.0 || gap_smoothing > 1.0 {
            return Err(TrainError::InvalidConfig(
                "gap_smoothing must be in (0, 1]".into(),
            ));
        }
        self.gap_smoothing = gap_smoothing;
        Ok(())
    }

    pub fn sampling(&self) -> Sampling {
        self.sampling
    }

    pub fn set_sampling(&mut self, sampling: Sampling) {
        self.sampling = sampling;
    }

    pub fn shuffle_seed(&self) -> Option<u64> {
        self.shuffle_seed
    }

    pub fn set_shuffle_seed(&mut self, seed: Option<u64>) {
        self.shuffle_seed = seed;
    }

    pub fn averaging(&self) -> bool {
        self.averaging
    }

    pub fn set_averaging(&mut self, enabled: bool) {
        self.averaging = enabled;
    }
}

/// Block-Coordinate Frank-Wolfe solver for structural SVMs.
///
/// Implements algorithm 4 in (Lacoste-Julien, Jaggi, Schmidt, Pletscher;
/// ICML 2013). The solver maintains the global weight vector `w` and one
/// dual block per training example; each step decodes a single example
/// through the oracle, takes a closed-form line-search step on that block,
/// and applies the matching delta to `w`, so `w` equals the sum of all
/// blocks at every observation point. Only the picked block is touched.
///
/// A step reads `w`, calls the oracle and writes back synchronously; the
/// instance is single-threaded. For distributed training, run one solver
/// per shard and synchronize through [`weights`](Self::weights) /
/// [`set_weights`](Self::set_weights) between calls to
/// [`run_steps`](Self::run_steps).
#[derive(Debug)]
pub struct BcfwSolver<O: StructuredOracle> {
    oracle: O,
    dataset: Dataset,
    params: BcfwParams,
    /// Global weight vector w
    weights: Vec<f64>,
    /// Weighted running average of the iterates
    avg_weights: Vec<f64>,
    /// Per-example dual blocks w_i with w = sum_i w_i
    block_weights: Vec<Vec<f64>>,
    /// Per-example dual losses l_i
    block_losses: Vec<f64>,
    /// Running sum of the dual losses
    loss_sum: f64,
    /// Smoothed estimate of the total duality gap
    gap_estimate: f64,
    steps_taken: u64,
    cursor: usize,
    rng: Option<StdRng>,
    stop: Option<Arc<AtomicBool>>,
    verbose: bool,
}

impl<O: StructuredOracle> BcfwSolver<O> {
    /// Create a solver over a dataset with default parameters. Weights and
    /// dual variables start at zero.
    pub fn new(oracle: O, dataset: Dataset) -> Result<Self> {
        if dataset.is_empty() {
            return Err(TrainError::InvalidConfig(
                "dataset must contain at least one instance".into(),
            ));
        }
        let dims = oracle.dimensions();
        if dims == 0 {
            return Err(TrainError::InvalidConfig(
                "oracle reports zero feature dimensions".into(),
            ));
        }
        let count = dataset.len();
        Ok(Self {
            oracle,
            dataset,
            params: BcfwParams::default(),
            weights: vec![0.0; dims],
            avg_weights: vec![0.0; dims],
            block_weights: vec![vec![0.0; dims]; count],
            block_losses: vec![0.0; count],
            loss_sum: 0.0,
            gap_estimate: f64::INFINITY,
            steps_taken: 0,
            cursor: 0,
            rng: None,
            stop: None,
            verbose: false,
        })
    }

    /// Set regularization strength (builder pattern)
    pub fn with_lambda(mut self, lambda: f64) -> Result<Self> {
        self.params.set_lambda(lambda)?;
        Ok(self)
    }

    /// Set the epoch budget (builder pattern)
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Result<Self> {
        self.params.set_max_iterations(max_iterations)?;
        Ok(self)
    }

    /// Set the convergence gap threshold (builder pattern)
    pub fn with_gap_threshold(mut self, gap_threshold: f64) -> Result<Self> {
        self.params.set_gap_threshold(gap_threshold)?;
        Ok(self)
    }

    /// Set the example-picking policy (builder pattern)
    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.params.set_sampling(sampling);
        self
    }

    /// Seed the sampler for reproducible runs (builder pattern)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.params.set_shuffle_seed(Some(seed));
        self
    }

    /// Enable iterate averaging (builder pattern)
    pub fn with_averaging(mut self, enabled: bool) -> Self {
        self.params.set_averaging(enabled);
        self
    }

    /// Enable or disable verbose output
    pub fn verbose(&mut self, enabled: bool) -> &mut Self {
        self.verbose = enabled;
        self
    }

    /// Get training parameters
    pub fn params(&self) -> &BcfwParams {
        &self.params
    }

    /// Get training parameters for mutation
    pub fn params_mut(&mut self) -> &mut BcfwParams {
        &mut self.params
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Read-only snapshot of the current weight vector.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Replace the weight vector: the synchronization entry point for a
    /// distributed coordinator. Call only between steps; the caller copies
    /// out, averages across shards and copies back in.
    pub fn set_weights(&mut self, weights: &[f64]) -> Result<()> {
        if weights.len() != self.oracle.dimensions() {
            return Err(TrainError::InvalidConfig(format!(
                "weight vector has dimension {}, oracle expects {}",
                weights.len(),
                self.oracle.dimensions()
            )));
        }
        self.weights.copy_from_slice(weights);
        Ok(())
    }

    /// Weighted running average of the iterates, when averaging is enabled
    /// and at least one step has run.
    pub fn averaged_weights(&self) -> Option<&[f64]> {
        if self.params.averaging() && self.steps_taken > 0 {
            Some(&self.avg_weights)
        } else {
            None
        }
    }

    /// Install a cooperative stop flag, checked between steps only so the
    /// dual invariant holds whenever the solver is observed.
    pub fn set_stop_flag(&mut self, flag: Arc<AtomicBool>) {
        self.stop = Some(flag);
    }

    /// Number of single-block steps taken so far.
    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    /// Latest smoothed estimate of the total duality gap. Infinite until
    /// the first step.
    pub fn gap_estimate(&self) -> f64 {
        self.gap_estimate
    }

    /// Current dual objective `-(lambda/2)*||w||^2 + sum_i l_i`,
    /// non-decreasing across steps.
    pub fn dual_objective(&self) -> f64 {
        let norm_sq: f64 = self.weights.iter().map(|w| w * w).sum();
        -0.5 * self.params.lambda() * norm_sq + self.loss_sum
    }

    /// Exact duality gap: one full oracle pass with `w` held fixed,
    /// summing the per-block gaps.
    pub fn compute_duality_gap(&self) -> Result<f64> {
        let lambda = self.params.lambda();
        let mut total = 0.0;
        for (idx, inst) in self.dataset.instances().iter().enumerate() {
            let (vertex, vertex_loss) = self.block_vertex(inst)?;
            let block = &self.block_weights[idx];
            let mut dir_dot_w = 0.0;
            for k in 0..vertex.len() {
                dir_dot_w += (block[k] - vertex[k]) * self.weights[k];
            }
            total += lambda * dir_dot_w - self.block_losses[idx] + vertex_loss;
        }
        Ok(total)
    }

    /// Run up to `n` single-block steps and return the smoothed gap
    /// estimate. This is the unit of work a coordinator schedules between
    /// synchronization points; it returns early if the stop flag is raised.
    pub fn run_steps(&mut self, n: usize) -> Result<f64> {
        for _ in 0..n {
            if self.should_stop() {
                break;
            }
            let idx = self.sample_index();
            self.step(idx)?;
        }
        Ok(self.gap_estimate)
    }

    /// Run epochs of `dataset.len()` steps until the exact duality gap
    /// drops below the threshold, the epoch budget runs out, or the stop
    /// flag is raised.
    pub fn train(&mut self) -> Result<SolveStatus> {
        let count = self.dataset.len();
        let verbose = self.verbose;

        if verbose {
            println!("Training with BCFW (lambda={})...", self.params.lambda());
        }

        for epoch in 1..=self.params.max_iterations() {
            for _ in 0..count {
                if self.should_stop() {
                    if verbose {
                        println!("Stopped at epoch {}", epoch);
                    }
                    return Ok(SolveStatus::Stopped);
                }
                let idx = self.sample_index();
                self.step(idx)?;
            }

            if epoch % self.params.gap_check_period() == 0 {
                let gap = self.compute_duality_gap()?;
                self.gap_estimate = gap;
                if verbose {
                    println!(
                        "Epoch {}: dual = {:.6}, gap = {:.6}",
                        epoch,
                        self.dual_objective(),
                        gap
                    );
                }
                if gap <= self.params.gap_threshold() {
                    if verbose {
                        println!("Converged at epoch {}", epoch);
                    }
                    return Ok(SolveStatus::Converged);
                }
            }
        }

        Ok(SolveStatus::MaxIterationsReached)
    }

    /// Frank-Wolfe vertex `(w_s, l_s)` of one example's dual block under
    /// the current weights.
    fn block_vertex(&self, inst: &Instance) -> Result<(Vec<f64>, f64)> {
        let count = self.dataset.len() as f64;
        let lambda = self.params.lambda();

        let decoded = self
            .oracle
            .max_oracle(&self.weights, &inst.covariate, &inst.labels)?;
        let phi_truth = self.oracle.feature_map(&inst.covariate, &inst.labels)?;
        let phi_decoded = self.oracle.feature_map(&inst.covariate, &decoded)?;
        let loss = self.oracle.loss(&inst.labels, &decoded)?;

        let scale = 1.0 / (lambda * count);
        let vertex = phi_truth
            .iter()
            .zip(&phi_decoded)
            .map(|(t, d)| (t - d) * scale)
            .collect();
        Ok((vertex, loss / count))
    }

    /// One BCFW iteration on the dual block of example `idx`.
    fn step(&mut self, idx: usize) -> Result<()> {
        let count = self.dataset.len() as f64;
        let lambda = self.params.lambda();

        let inst = &self.dataset.instances()[idx];
        let (vertex, vertex_loss) = self.block_vertex(inst)?;

        // Per-block gap and exact line search over the quadratic dual.
        let block = &self.block_weights[idx];
        let mut dir_dot_w = 0.0;
        let mut dir_norm_sq = 0.0;
        for k in 0..vertex.len() {
            let d = block[k] - vertex[k];
            dir_dot_w += d * self.weights[k];
            dir_norm_sq += d * d;
        }
        let gap = lambda * dir_dot_w - self.block_losses[idx] + vertex_loss;
        let gamma = if dir_norm_sq > 0.0 {
            (gap / (lambda * dir_norm_sq)).clamp(0.0, 1.0)
        } else {
            0.0
        };

        // Convex combination of the block, applied to w as a delta so
        // w = sum_i w_i stays exact without resummation.
        let block = &mut self.block_weights[idx];
        for k in 0..vertex.len() {
            let updated = (1.0 - gamma) * block[k] + gamma * vertex[k];
            self.weights[k] += updated - block[k];
            block[k] = updated;
        }
        let updated_loss = (1.0 - gamma) * self.block_losses[idx] + gamma * vertex_loss;
        self.loss_sum += updated_loss - self.block_losses[idx];
        self.block_losses[idx] = updated_loss;

        self.steps_taken += 1;
        if self.params.averaging() {
            // 2/(k+2) schedule over the step counter
            let rho = 2.0 / (self.steps_taken as f64 + 1.0);
            for (avg, w) in self.avg_weights.iter_mut().zip(&self.weights) {
                *avg += rho * (w - *avg);
            }
        }

        // n times the block gap is a one-sample estimate of the total
        // duality gap.
        let estimate = gap * count;
        let beta = self.params.gap_smoothing();
        self.gap_estimate = if self.steps_taken == 1 {
            estimate
        } else {
            (1.0 - beta) * self.gap_estimate + beta * estimate
        };

        Ok(())
    }

    fn sample_index(&mut self) -> usize {
        let count = self.dataset.len();
        match self.params.sampling() {
            Sampling::Uniform => {
                let seed = self.params.shuffle_seed();
                let rng = self.rng.get_or_insert_with(|| match seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                });
                rng.gen_range(0..count)
            }
            Sampling::RoundRobin => {
                let idx = self.cursor;
                self.cursor = (self.cursor + 1) % count;
                idx
            }
        }
    }

    fn should_stop(&self) -> bool {
        self.stop
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    }
}
