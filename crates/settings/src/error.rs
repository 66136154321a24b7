//! Error types for the settings API and session.

use spike_core::{CoreError, ValidationReport};
use spike_serialization::MigrationError;
use thiserror::Error;

/// Errors from the settings HTTP API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response. `message` is the server's `detail` when present.
    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Login is not configured")]
    MissingLogin,
}

impl ApiError {
    /// HTTP status of a server-side failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced by settings session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Saving is blocked until every listed strategy is fixed.
    #[error("{} strategies need their own filters", .0.len())]
    Validation(ValidationReport),

    #[error(transparent)]
    Strategy(#[from] CoreError),

    #[error("Strategy not found")]
    UnknownStrategy,

    #[error("Strategy position {index} is out of range ({len} strategies)")]
    PositionOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Encode(#[from] MigrationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub type SessionResult<T> = Result<T, SessionError>;
