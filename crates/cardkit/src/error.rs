//! Error types for the card manager.

use cardkit_client::ClientError;
use cardkit_core::{CardId, CoreError, ValidationError};
use thiserror::Error;

/// Errors that can occur during card manager operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Missing or malformed input to a local operation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Encoding, decoding or chain-linking failure.
    #[error("core error: {0}")]
    Core(CoreError),

    /// Card service or token provider failure.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// The card verifier rejected a card.
    #[error("card {card_id} rejected by verifier")]
    CardValidation { card_id: CardId },

    /// The service answered with something other than what was asked for.
    #[error("invalid service response: {0}")]
    InvalidResponse(String),

    /// The co-signing hook failed.
    #[error("sign callback failed: {0}")]
    SignCallback(String),
}

impl From<CoreError> for ManagerError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Validation(v) => ManagerError::Validation(v),
            other => ManagerError::Core(other),
        }
    }
}

impl ManagerError {
    /// Whether the card service reported the token as unauthorized.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ManagerError::Client(e) if e.is_unauthorized())
    }
}

/// Result type for card manager operations.
pub type Result<T> = std::result::Result<T, ManagerError>;
