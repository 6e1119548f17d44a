//! # Attestry Core
//!
//! Pure primitives for the Attestry ledger: blocks, canonical encoding,
//! identities, and the ownership challenge protocol.
//!
//! This crate contains no I/O and no shared state. It is pure computation
//! over cryptographic data structures; the ledger engine lives in the
//! `attestry` crate.
//!
//! ## Key Types
//!
//! - [`Block`] - The immutable, self-verifying record unit of the chain
//! - [`Payload`] - Tagged block payload: [`Payload::Genesis`] or an [`Attestation`]
//! - [`BlockHash`] - Content hash of a block (Blake3, 256-bit)
//! - [`Ed25519PublicKey`] - A claimant identity
//! - [`SignatureVerifier`] - The seam for signature checking
//!
//! ## Canonicalization
//!
//! Block hashes are computed over deterministic CBOR with the stored hash
//! excluded. See the [`canonical`] module.

pub mod block;
pub mod canonical;
pub mod challenge;
pub mod crypto;
pub mod error;
pub mod types;
pub mod validation;

pub use block::{Attestation, Block, Payload, GENESIS_MARKER};
pub use canonical::{canonical_bytes, decode_block, encode_block};
pub use challenge::{
    issue_challenge, issue_challenge_at, parse_challenge, ChallengeParts, CHALLENGE_DOMAIN_TAG,
};
pub use crypto::{Ed25519PublicKey, Ed25519Signature, Ed25519Verifier, Keypair, SignatureVerifier};
pub use error::CoreError;
pub use types::BlockHash;
pub use validation::validate_blocks;
