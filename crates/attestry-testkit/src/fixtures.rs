//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use attestry::{Ledger, Result, SubmissionPipeline};
use attestry_core::{
    issue_challenge, issue_challenge_at, Block, Ed25519PublicKey, Ed25519Signature, Keypair,
};

/// A test fixture with a claimant keypair, a ledger, and a pipeline.
pub struct TestFixture {
    pub keypair: Keypair,
    pub ledger: Arc<Ledger>,
    pub pipeline: SubmissionPipeline,
}

impl TestFixture {
    /// Create a new fixture with a random claimant keypair.
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Create with a deterministic claimant keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        let ledger = Arc::new(Ledger::new());
        let pipeline = SubmissionPipeline::new(Arc::clone(&ledger));
        Self {
            keypair: Keypair::from_seed(&seed),
            ledger,
            pipeline,
        }
    }

    /// The claimant's public identity.
    pub fn identity(&self) -> Ed25519PublicKey {
        self.keypair.public_key()
    }

    /// Issue a challenge for the claimant and sign it correctly.
    pub fn signed_challenge(&self) -> (String, Ed25519Signature) {
        let challenge = issue_challenge(&self.identity());
        let signature = self.keypair.sign(challenge.as_bytes());
        (challenge, signature)
    }

    /// Issue a challenge with an explicit issuance time, correctly signed.
    pub fn signed_challenge_at(&self, issued_at: i64) -> (String, Ed25519Signature) {
        let challenge = issue_challenge_at(&self.identity(), issued_at);
        let signature = self.keypair.sign(challenge.as_bytes());
        (challenge, signature)
    }

    /// Full happy-path submission: issue, sign, submit.
    pub async fn submit_record(
        &self,
        subject: &Ed25519PublicKey,
        record: &str,
    ) -> Result<Block> {
        let (challenge, signature) = self.signed_challenge();
        self.pipeline
            .submit(&self.identity(), &challenge, &signature, subject, record)
            .await
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
