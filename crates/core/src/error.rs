//! Error types for model operations.

use thiserror::Error;

/// Errors from editing the strategy model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Condition index {index} out of range (len {len})")]
    ConditionIndexOutOfRange { index: usize, len: usize },

    #[error("Strategy name must not be empty")]
    EmptyStrategyName,
}

/// Result type for model operations.
pub type CoreResult<T> = Result<T, CoreError>;
