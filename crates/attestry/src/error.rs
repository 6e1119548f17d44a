//! Error types for the ledger engine.

use attestry_core::CoreError;
use thiserror::Error;

/// Errors that can occur during ledger operations.
///
/// Lookup misses are not represented here; they come back as `Option` from
/// the lookup methods.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The challenge could not be parsed (caller input).
    #[error("malformed challenge: {0}")]
    MalformedChallenge(String),

    /// The challenge's liveness window has elapsed (caller input).
    #[error("challenge expired: issued at {issued_at}, elapsed {elapsed}s")]
    ExpiredChallenge {
        /// Unix seconds embedded in the challenge.
        issued_at: i64,
        /// Seconds between issuance and submission.
        elapsed: i64,
    },

    /// Signature verification failed, or the challenge was issued for a
    /// different identity than the claimant (caller input).
    #[error("invalid signature")]
    InvalidSignature,

    /// The existing chain failed self-validation before an append. This is
    /// fatal to further writes: it indicates prior corruption, not a
    /// transient fault.
    #[error("chain integrity failure: {}", .0.join("; "))]
    Integrity(Vec<String>),

    /// Internal fault from the core primitives.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
