use crate::error::{Result, TrainError};

/// One training example: a dense covariate paired with its label sequence.
///
/// The covariate concatenates one feature block per sequence position, so
/// its length is `labels.len()` times the oracle's per-position dimension.
#[derive(Debug, Clone)]
pub struct Instance {
    /// Per-position feature blocks, concatenated
    pub covariate: Vec<f64>,
    /// One state index per position
    pub labels: Vec<usize>,
}

/// An ordered collection of training instances.
///
/// Loaded once by the caller and read-only to the solver.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    instances: Vec<Instance>,
}

impl Dataset {
    /// Create an empty dataset
    pub fn new() -> Self {
        Self {
            instances: Vec::new(),
        }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            instances: Vec::with_capacity(cap),
        }
    }

    /// Append one training example.
    ///
    /// The covariate must split into one equal-size block per label; the
    /// per-position dimension itself is the oracle's concern, so only
    /// divisibility can be checked here.
    pub fn append(&mut self, covariate: Vec<f64>, labels: Vec<usize>) -> Result<()> {
        if labels.is_empty() {
            return Err(TrainError::Precondition(
                "empty label sequences are not allowed".into(),
            ));
        }
        if covariate.is_empty() {
            return Err(TrainError::Precondition(
                "empty covariates are not allowed".into(),
            ));
        }
        if covariate.len() % labels.len() != 0 {
            return Err(TrainError::Precondition(format!(
                "covariate length {} is not a multiple of the sequence length {}",
                covariate.len(),
                labels.len()
            )));
        }
        self.instances.push(Instance { covariate, labels });
        Ok(())
    }

    /// Number of instances
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Instance> {
        self.instances.get(index)
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_access() {
        let mut dataset = Dataset::new();
        dataset.append(vec![1.0, 2.0, 3.0, 4.0], vec![0, 1]).unwrap();
        dataset.append(vec![0.5, 0.5], vec![1]).unwrap();

        assert_eq!(dataset.len(), 2);
        assert!(!dataset.is_empty());
        assert_eq!(dataset.get(0).unwrap().labels, vec![0, 1]);
        assert_eq!(dataset.get(1).unwrap().covariate, vec![0.5, 0.5]);
        assert!(dataset.get(2).is_none());
    }

    #[test]
    fn test_append_rejects_malformed_examples() {
        let mut dataset = Dataset::new();

        let result = dataset.append(vec![1.0], vec![]);
        assert!(matches!(result, Err(TrainError::Precondition(_))));

        let result = dataset.append(vec![], vec![0]);
        assert!(matches!(result, Err(TrainError::Precondition(_))));

        // Five values cannot split into two equal blocks
        let result = dataset.append(vec![1.0, 2.0, 3.0, 4.0, 5.0], vec![0, 1]);
        assert!(matches!(result, Err(TrainError::Precondition(_))));

        assert!(dataset.is_empty());
    }
}
