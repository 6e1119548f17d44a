//! Error types for the Attestry core.

use thiserror::Error;

/// Core errors that can occur during block and challenge operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("malformed challenge: {0}")]
    MalformedChallenge(String),

    #[error("malformed block: {0}")]
    MalformedBlock(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}
