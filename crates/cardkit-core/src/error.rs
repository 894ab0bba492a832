//! Error types for cardkit core.

use thiserror::Error;

/// Validation errors for caller-supplied input to local operations.
///
/// These are raised synchronously and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("identity is mandatory")]
    MissingIdentity,

    #[error("public key is mandatory")]
    MissingPublicKey,

    #[error("model already has a signature from signer {0:?}")]
    DuplicateSigner(String),

    #[error("signer name must not be empty")]
    EmptySigner,

    #[error("model has no self signature")]
    MissingSelfSignature,

    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}

/// Core errors that can occur while encoding, decoding, signing or linking cards.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid private key")]
    InvalidPrivateKey,

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("malformed model: {0}")]
    MalformedModel(String),

    #[error("card {0} appears more than once in the batch")]
    DuplicateCard(String),

    #[error("cards {first} and {second} both supersede card {previous}")]
    ForkedChain {
        previous: String,
        first: String,
        second: String,
    },

    #[error("previous card references form a cycle")]
    ChainCycle,
}

impl From<base64::DecodeError> for CoreError {
    fn from(e: base64::DecodeError) -> Self {
        CoreError::DecodingError(format!("base64: {e}"))
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::DecodingError(format!("json: {e}"))
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
