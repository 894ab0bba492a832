//! Error types for card service and token provider calls.

use thiserror::Error;

/// Errors returned by a card service or an access-token provider.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The bearer token was rejected as stale or invalid.
    ///
    /// This is the only condition a card manager retries.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The service answered with an error status.
    #[error("service error ({status}): {message}")]
    Service { status: u16, message: String },

    /// The request never got an answer.
    #[error("transport error: {0}")]
    Transport(String),

    /// No card with the requested id.
    #[error("card not found: {0}")]
    NotFound(String),

    /// The token provider could not produce a token.
    #[error("access token unavailable: {0}")]
    TokenUnavailable(String),

    /// A model in the request or response could not be encoded or decoded.
    #[error(transparent)]
    Core(#[from] cardkit_core::CoreError),
}

impl ClientError {
    /// Whether this is the distinguished unauthorized condition.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
