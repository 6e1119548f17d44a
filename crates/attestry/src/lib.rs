//! # Attestry
//!
//! A minimal, single-process, append-only hash-chained ledger for
//! attestations. A claimant proves control of an Ed25519 identity through
//! a challenge/response handshake with a liveness window, then submits a
//! signed record that is bound into the chain by content hashing.
//!
//! ## Overview
//!
//! - **[`Ledger`]**: the ordered chain of blocks. Genesis is sealed at
//!   construction; the only mutation is append, serialized behind a write
//!   lock.
//! - **[`SubmissionPipeline`]**: validates challenge freshness and the
//!   claimant's signature before anything touches the chain.
//! - **[`Ledger::validate_chain`]**: two independent integrity passes
//!   (self-hash and linkage) reported as data, not errors.
//!
//! This is a local, trusted-writer integrity log: no consensus, no
//! replication, no fork resolution.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use attestry::{issue_challenge, Keypair, Ledger, SubmissionPipeline};
//!
//! async fn example() {
//!     let ledger = Arc::new(Ledger::new());
//!     let pipeline = SubmissionPipeline::new(Arc::clone(&ledger));
//!
//!     // The claimant holds the keypair; the ledger only ever sees the
//!     // public identity.
//!     let claimant = Keypair::generate();
//!     let identity = claimant.public_key();
//!
//!     let challenge = issue_challenge(&identity);
//!     let signature = claimant.sign(challenge.as_bytes());
//!
//!     let block = pipeline
//!         .submit(&identity, &challenge, &signature, &identity, "score:42")
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(block.height, 1);
//!     assert!(ledger.validate_chain().await.is_empty());
//! }
//! ```

pub mod error;
pub mod ledger;
pub mod pipeline;

// Re-export the core crate
pub use attestry_core as core;

pub use error::{LedgerError, Result};
pub use ledger::Ledger;
pub use pipeline::{PipelineConfig, SubmissionPipeline, DEFAULT_LIVENESS_WINDOW};

// Re-export commonly used core types
pub use attestry_core::{
    issue_challenge, issue_challenge_at, parse_challenge, validate_blocks, Attestation, Block,
    BlockHash, ChallengeParts, Ed25519PublicKey, Ed25519Signature, Ed25519Verifier, Keypair,
    Payload, SignatureVerifier, CHALLENGE_DOMAIN_TAG, GENESIS_MARKER,
};
