//! # Attestry Testkit
//!
//! Fixtures and helpers for exercising the attestation ledger in tests:
//! a claimant keypair wired to a ledger and pipeline, plus shortcuts for
//! producing correctly signed (or deliberately broken) submissions.

pub mod fixtures;

pub use fixtures::TestFixture;
