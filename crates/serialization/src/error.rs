//! Error types for the stored settings format.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Unknown condition type: {0}")]
    UnknownConditionType(String),

    #[error("Failed to encode options: {0}")]
    Encode(#[source] serde_json::Error),
}

pub type MigrationResult<T> = Result<T, MigrationError>;
