use thiserror::Error;

/// Errors surfaced by the solver and oracle core.
///
/// Every failure here is a deterministic function of the input — a
/// configuration or data bug, never a transient fault — so callers should
/// propagate rather than retry.
#[derive(Debug, Error)]
pub enum TrainError {
    /// Invalid construction-time configuration, such as a non-positive
    /// regularization strength or a weight vector of the wrong dimension.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A malformed example reached the core: mismatched sequence lengths, a
    /// covariate that does not partition evenly, or a label out of range.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// A structure-specific oracle method has no implementation yet.
    #[error("{0} is not implemented for this oracle")]
    NotImplemented(&'static str),
}

/// Result type alias for solver and oracle operations.
pub type Result<T> = std::result::Result<T, TrainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = TrainError::InvalidConfig("lambda must be positive".into());
        assert!(err.to_string().contains("lambda"));

        let err = TrainError::NotImplemented("max_oracle");
        assert_eq!(err.to_string(), "max_oracle is not implemented for this oracle");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TrainError>();
    }
}
