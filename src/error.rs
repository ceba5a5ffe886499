//! Error types for model-server validation runs.
//!
//! The taxonomy separates caller bugs (`IllegalState`) from container
//! conditions (`JobAborted`, `DeadlineExceeded`) and from infrastructure
//! failures, which pass through untranslated.

use thiserror::Error;

use crate::runtime::RuntimeError;

/// Result type alias for validator operations.
pub type ValidatorResult<T> = Result<T, ValidatorError>;

/// Errors that can occur while running a model server for validation.
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// The caller violated a state-machine precondition (double start,
    /// endpoint or wait before start). Always a caller bug, never retried.
    #[error("{0}")]
    IllegalState(&'static str),

    /// The container terminated or disappeared before reaching a ready
    /// state. Terminal for this validation attempt.
    #[error("job aborted: {0}")]
    JobAborted(String),

    /// The ready state was not observed within the caller-supplied budget.
    /// The caller may retry with a larger deadline.
    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// Container runtime failures other than not-found. Surfaced as-is:
    /// these indicate environment problems, not validation outcomes.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Host port allocation failed.
    #[error("port allocation failed: {0}")]
    Port(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_illegal_state_display_is_verbatim() {
        let err = ValidatorError::IllegalState("container is not started.");
        assert_eq!(err.to_string(), "container is not started.");
    }

    #[test]
    fn test_runtime_error_passes_through() {
        let err = ValidatorError::from(RuntimeError::NotFound("abc123".to_string()));
        assert!(err.to_string().contains("abc123"));
    }

    #[test]
    fn test_classified_errors_are_distinguishable() {
        let aborted = ValidatorError::JobAborted("container entered status dead".to_string());
        let deadline = ValidatorError::DeadlineExceeded("not running after 10s".to_string());
        assert!(matches!(aborted, ValidatorError::JobAborted(_)));
        assert!(matches!(deadline, ValidatorError::DeadlineExceeded(_)));
    }
}
