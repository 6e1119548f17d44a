//! Block: the immutable record unit of the chain.
//!
//! A block is sealed once, at append time: every field is set first, then
//! the content hash is computed over the rest. After that nothing may
//! change; tampering is caught by [`validate_blocks`](crate::validate_blocks).

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_bytes;
use crate::crypto::{Ed25519PublicKey, Ed25519Signature};
use crate::types::BlockHash;

/// Fixed marker payload carried by the genesis block.
pub const GENESIS_MARKER: &str = "Genesis Block";

/// A signed record binding an identity, a subject identity, and a domain
/// value into the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    /// The claimant identity that signed the challenge.
    pub identity: Ed25519PublicKey,

    /// The issued challenge string, echoed back by the claimant.
    pub challenge: String,

    /// Signature over the challenge bytes.
    pub signature: Ed25519Signature,

    /// The identity this record is about.
    pub subject: Ed25519PublicKey,

    /// The attested domain value, e.g. `"score:42"`.
    pub record: String,
}

/// Block payload, a tagged variant.
///
/// Every reader of block payloads matches both variants exhaustively;
/// genesis is never confused with attestation data by field probing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// Fixed marker payload of the first block.
    Genesis,
    /// A validated attestation submission.
    Attestation(Attestation),
}

impl Payload {
    /// Check if this is the genesis payload.
    pub fn is_genesis(&self) -> bool {
        matches!(self, Payload::Genesis)
    }

    /// Get the attestation (if this is not genesis).
    pub fn as_attestation(&self) -> Option<&Attestation> {
        match self {
            Payload::Genesis => None,
            Payload::Attestation(a) => Some(a),
        }
    }
}

/// An immutable, self-verifying block.
///
/// `hash` is a pure function of the other fields: it is Blake3 over the
/// canonical serialization with the hash field excluded. Recomputing it
/// from an unmodified block always reproduces the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain, assigned at append time.
    pub height: u64,

    /// Unix seconds, assigned by the ledger at append time (never by the
    /// submitter).
    pub timestamp: i64,

    /// Hash of the immediately preceding block; `None` only for genesis.
    pub previous_hash: Option<BlockHash>,

    /// The block payload.
    pub payload: Payload,

    /// Content hash, computed last at seal time.
    pub hash: BlockHash,
}

impl Block {
    /// Seal a block: set every field, then compute the hash over the rest.
    pub fn seal(
        payload: Payload,
        height: u64,
        previous_hash: Option<BlockHash>,
        timestamp: i64,
    ) -> Self {
        let mut block = Self {
            height,
            timestamp,
            previous_hash,
            payload,
            hash: BlockHash::ZERO,
        };
        block.hash = block.compute_hash();
        block
    }

    /// Seal the genesis block: marker payload, no predecessor, height 0.
    pub fn genesis(timestamp: i64) -> Self {
        Self::seal(Payload::Genesis, 0, None, timestamp)
    }

    /// Recompute the content hash from the block's other fields.
    pub fn compute_hash(&self) -> BlockHash {
        BlockHash::hash(&canonical_bytes(self))
    }

    /// Check that the stored hash matches the recomputed one.
    pub fn verify_hash(&self) -> bool {
        self.compute_hash() == self.hash
    }

    /// Check if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.payload.is_genesis()
    }

    /// Get the attestation payload (if any).
    pub fn as_attestation(&self) -> Option<&Attestation> {
        self.payload.as_attestation()
    }
}
