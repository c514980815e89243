use super::StructuredOracle;
use crate::error::{Result, TrainError};

/// Oracle for chain-structured labels over dense per-position covariates.
///
/// The joint feature vector concatenates three blocks: unary
/// (`num_states * per_unit_dim`), boundary bias (`2 * num_states`) and
/// pairwise transitions (`num_states * num_states`). Both boundary
/// indicators index the bias block by state, so when the first and last
/// label coincide (always for a length-1 chain) they land on the same entry
/// and it holds the sum of both contributions; the upper half of the block
/// stays zero under this feature map.
#[derive(Debug, Clone)]
pub struct ChainOracle {
    /// Number of distinct states a position can take
    num_states: usize,
    /// Covariate dimension per sequence position
    per_unit_dim: usize,
}

impl ChainOracle {
    pub fn new(num_states: usize, per_unit_dim: usize) -> Result<Self> {
        if num_states == 0 {
            return Err(TrainError::InvalidConfig(
                "num_states must be at least 1".into(),
            ));
        }
        if per_unit_dim == 0 {
            return Err(TrainError::InvalidConfig(
                "per_unit_dim must be at least 1".into(),
            ));
        }
        Ok(Self {
            num_states,
            per_unit_dim,
        })
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn per_unit_dim(&self) -> usize {
        self.per_unit_dim
    }

    fn bias_offset(&self) -> usize {
        self.num_states * self.per_unit_dim
    }

    fn pairwise_offset(&self) -> usize {
        self.bias_offset() + 2 * self.num_states
    }

    /// Validate one (covariate, labels) pair and return the sequence length.
    fn check_example(&self, covariate: &[f64], labels: &[usize]) -> Result<usize> {
        if labels.is_empty() {
            return Err(TrainError::Precondition(
                "label sequence must not be empty".into(),
            ));
        }
        if covariate.len() % self.per_unit_dim != 0 {
            return Err(TrainError::Precondition(format!(
                "covariate length {} does not partition into blocks of {}",
                covariate.len(),
                self.per_unit_dim
            )));
        }
        let seq_len = covariate.len() / self.per_unit_dim;
        if seq_len != labels.len() {
            return Err(TrainError::Precondition(format!(
                "covariate holds {} positions but the label sequence has {}",
                seq_len,
                labels.len()
            )));
        }
        if let Some(&label) = labels.iter().find(|&&label| label >= self.num_states) {
            return Err(TrainError::Precondition(format!(
                "label {} is out of range for {} states",
                label, self.num_states
            )));
        }
        Ok(seq_len)
    }

    /// Unary potentials `[pos][state]` from the unary and boundary-bias
    /// weight blocks.
    fn unary_potentials(
        &self,
        weights: &[f64],
        covariate: &[f64],
        seq_len: usize,
    ) -> Vec<Vec<f64>> {
        let mut theta = vec![vec![0.0; self.num_states]; seq_len];
        for (t, row) in theta.iter_mut().enumerate() {
            let block = &covariate[t * self.per_unit_dim..(t + 1) * self.per_unit_dim];
            for (state, score) in row.iter_mut().enumerate() {
                let wstate = &weights[state * self.per_unit_dim..(state + 1) * self.per_unit_dim];
                *score = block.iter().zip(wstate).map(|(x, w)| x * w).sum();
            }
        }
        // The boundary bias contributes at both ends; a length-1 chain
        // picks it up twice, mirroring the feature map.
        let bias = self.bias_offset();
        for state in 0..self.num_states {
            theta[0][state] += weights[bias + state];
            theta[seq_len - 1][state] += weights[bias + state];
        }
        theta
    }

    /// Pairwise potentials `[prev][next]` read directly from the
    /// transition block of the weight vector.
    fn pairwise_potentials(&self, weights: &[f64]) -> Vec<Vec<f64>> {
        let offset = self.pairwise_offset();
        let mut theta = vec![vec![0.0; self.num_states]; self.num_states];
        for (prev, row) in theta.iter_mut().enumerate() {
            for (next, score) in row.iter_mut().enumerate() {
                *score = weights[offset + prev + self.num_states * next];
            }
        }
        theta
    }
}

impl StructuredOracle for ChainOracle {
    fn dimensions(&self) -> usize {
        self.num_states * self.per_unit_dim + 2 * self.num_states + self.num_states * self.num_states
    }

    fn feature_map(&self, covariate: &[f64], labels: &[usize]) -> Result<Vec<f64>> {
        let seq_len = self.check_example(covariate, labels)?;
        let mut phi = vec![0.0; self.dimensions()];

        // Unary block: accumulate each position's covariate block into the
        // sub-block of its label. Positions sharing a label share a slot.
        for (t, &label) in labels.iter().enumerate() {
            let block = &covariate[t * self.per_unit_dim..(t + 1) * self.per_unit_dim];
            let dst = label * self.per_unit_dim;
            for (k, &x) in block.iter().enumerate() {
                phi[dst + k] += x;
            }
        }

        // Boundary bias for the first and last label, summed when the two
        // indices coincide.
        let bias = self.bias_offset();
        phi[bias + labels[0]] += 1.0;
        phi[bias + labels[seq_len - 1]] += 1.0;

        // Pairwise transition counts.
        let pairwise = self.pairwise_offset();
        for t in 1..seq_len {
            phi[pairwise + labels[t - 1] + self.num_states * labels[t]] += 1.0;
        }

        Ok(phi)
    }

    fn loss(&self, truth: &[usize], predicted: &[usize]) -> Result<f64> {
        if truth.is_empty() {
            return Err(TrainError::Precondition(
                "truth sequence must not be empty".into(),
            ));
        }
        if truth.len() != predicted.len() {
            return Err(TrainError::Precondition(format!(
                "sequence lengths differ: truth {} vs predicted {}",
                truth.len(),
                predicted.len()
            )));
        }
        let mismatches = truth.iter().zip(predicted).filter(|(t, p)| t != p).count();
        Ok(mismatches as f64 / truth.len() as f64)
    }

    fn max_oracle(
        &self,
        weights: &[f64],
        covariate: &[f64],
        truth: &[usize],
    ) -> Result<Vec<usize>> {
        if weights.len() != self.dimensions() {
            return Err(TrainError::Precondition(format!(
                "weight vector has dimension {}, oracle expects {}",
                weights.len(),
                self.dimensions()
            )));
        }
        let seq_len = self.check_example(covariate, truth)?;

        let mut unary = self.unary_potentials(weights, covariate, seq_len);

        // Hamming loss augmentation in closed form: the loss contributes
        // 1/seq_len per mismatched position, i.e. a constant shift of every
        // state minus a correction at the truth label.
        let unit = 1.0 / seq_len as f64;
        for (t, row) in unary.iter_mut().enumerate() {
            for score in row.iter_mut() {
                *score += unit;
            }
            row[truth[t]] -= unit;
        }

        // A single position degenerates to an argmax; no pairwise term.
        if seq_len == 1 {
            return Ok(vec![argmax(&unary[0])]);
        }

        let pairwise = self.pairwise_potentials(weights);

        // Max-sum forward pass in the log domain, recording the best
        // predecessor per (position, state).
        let mut alpha = unary[0].clone();
        let mut next = vec![0.0; self.num_states];
        let mut backptr = vec![vec![0usize; self.num_states]; seq_len];
        for t in 1..seq_len {
            for state in 0..self.num_states {
                let mut best = f64::NEG_INFINITY;
                let mut best_prev = 0;
                for prev in 0..self.num_states {
                    let score = alpha[prev] + pairwise[prev][state];
                    // Strict comparison keeps the lowest state on ties.
                    if score > best {
                        best = score;
                        best_prev = prev;
                    }
                }
                next[state] = best + unary[t][state];
                backptr[t][state] = best_prev;
            }
            std::mem::swap(&mut alpha, &mut next);
        }

        // Backtrack from the best final state. The descending range is
        // bounded below at 1, so the loop index cannot wrap.
        let mut path = vec![0usize; seq_len];
        path[seq_len - 1] = argmax(&alpha);
        for t in (1..seq_len).rev() {
            path[t - 1] = backptr[t][path[t]];
        }
        Ok(path)
    }
}

/// Index of the first maximum, breaking ties toward the lowest state.
fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (state, &score) in scores.iter().enumerate().skip(1) {
        if score > scores[best] {
            best = state;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        let oracle = ChainOracle::new(26, 128).unwrap();
        assert_eq!(oracle.dimensions(), 26 * 128 + 2 * 26 + 26 * 26);
    }

    #[test]
    fn test_argmax_first_maximum_wins() {
        assert_eq!(argmax(&[0.0, 1.0, 1.0]), 1);
        assert_eq!(argmax(&[2.0]), 0);
        assert_eq!(argmax(&[-1.0, -1.0, -0.5]), 2);
    }

    #[test]
    fn test_pairwise_potentials_layout() {
        let oracle = ChainOracle::new(2, 1).unwrap();
        let mut weights = vec![0.0; oracle.dimensions()];
        // Pairwise block starts after unary (2) and bias (4); bucket
        // prev + num_states * next.
        weights[6] = 0.1; // (0, 0)
        weights[7] = 0.2; // (1, 0)
        weights[8] = 0.3; // (0, 1)
        weights[9] = 0.4; // (1, 1)
        let theta = oracle.pairwise_potentials(&weights);
        assert_eq!(theta[0][0], 0.1);
        assert_eq!(theta[1][0], 0.2);
        assert_eq!(theta[0][1], 0.3);
        assert_eq!(theta[1][1], 0.4);
    }
}
