//! Submission pipeline: freshness check, signature check, then append.
//!
//! Both checks run before any chain mutation. A submission that fails
//! either one never touches the ledger; there is nothing to roll back.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::warn;

use attestry_core::{
    parse_challenge, Attestation, Block, Ed25519PublicKey, Ed25519Signature, Ed25519Verifier,
    Payload, SignatureVerifier,
};

use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;

/// Default liveness window between challenge issuance and submission.
pub const DEFAULT_LIVENESS_WINDOW: Duration = Duration::from_secs(300);

/// Configuration for the submission pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum elapsed time between challenge issuance and submission.
    pub liveness_window: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            liveness_window: DEFAULT_LIVENESS_WINDOW,
        }
    }
}

/// Orchestrates validated submissions into the ledger.
///
/// Generic over the [`SignatureVerifier`] seam so tests can substitute a
/// permissive or failing verifier; production uses [`Ed25519Verifier`].
pub struct SubmissionPipeline<V: SignatureVerifier = Ed25519Verifier> {
    ledger: Arc<Ledger>,
    verifier: V,
    config: PipelineConfig,
}

impl SubmissionPipeline<Ed25519Verifier> {
    /// Create a pipeline with the stock Ed25519 verifier and defaults.
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self::with_verifier(ledger, Ed25519Verifier, PipelineConfig::default())
    }
}

impl<V: SignatureVerifier> SubmissionPipeline<V> {
    /// Create a pipeline with an explicit verifier and configuration.
    pub fn with_verifier(ledger: Arc<Ledger>, verifier: V, config: PipelineConfig) -> Self {
        Self {
            ledger,
            verifier,
            config,
        }
    }

    /// The ledger this pipeline appends to.
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Validate and append a signed attestation.
    ///
    /// Order of checks: challenge parse, identity binding, liveness window,
    /// signature. Any failure aborts before the ledger is touched.
    pub async fn submit(
        &self,
        identity: &Ed25519PublicKey,
        challenge: &str,
        signature: &Ed25519Signature,
        subject: &Ed25519PublicKey,
        record: &str,
    ) -> Result<Block> {
        self.submit_at(identity, challenge, signature, subject, record, now_secs())
            .await
    }

    /// [`submit`](Self::submit) with an explicit clock, for tests.
    pub async fn submit_at(
        &self,
        identity: &Ed25519PublicKey,
        challenge: &str,
        signature: &Ed25519Signature,
        subject: &Ed25519PublicKey,
        record: &str,
        now: i64,
    ) -> Result<Block> {
        let parts = parse_challenge(challenge)
            .map_err(|e| LedgerError::MalformedChallenge(e.to_string()))?;

        // The challenge must have been issued for the claimant
        if parts.identity != *identity {
            warn!("challenge identity does not match claimant");
            return Err(LedgerError::InvalidSignature);
        }

        let elapsed = now - parts.issued_at;
        let window = self.config.liveness_window.as_secs() as i64;
        if elapsed < 0 || elapsed > window {
            warn!(issued_at = parts.issued_at, elapsed, "challenge outside liveness window");
            return Err(LedgerError::ExpiredChallenge {
                issued_at: parts.issued_at,
                elapsed,
            });
        }

        self.verifier
            .verify(identity, challenge.as_bytes(), signature)
            .map_err(|_| LedgerError::InvalidSignature)?;

        let payload = Payload::Attestation(Attestation {
            identity: *identity,
            challenge: challenge.to_string(),
            signature: *signature,
            subject: *subject,
            record: record.to_string(),
        });

        self.ledger.append_block(payload).await
    }
}

/// Current wall-clock time in Unix seconds.
fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use attestry_core::{issue_challenge_at, CoreError, Keypair};

    fn make_pipeline() -> (SubmissionPipeline, Keypair, Ed25519PublicKey) {
        let ledger = Arc::new(Ledger::new());
        let pipeline = SubmissionPipeline::new(ledger);
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let subject = Keypair::from_seed(&[0x43; 32]).public_key();
        (pipeline, keypair, subject)
    }

    #[tokio::test]
    async fn test_submit_happy_path() {
        let (pipeline, keypair, subject) = make_pipeline();
        let identity = keypair.public_key();

        let challenge = issue_challenge_at(&identity, 1_000_000);
        let signature = keypair.sign(challenge.as_bytes());

        let block = pipeline
            .submit_at(&identity, &challenge, &signature, &subject, "score:42", 1_000_010)
            .await
            .unwrap();

        assert_eq!(block.height, 1);
        let attestation = block.as_attestation().unwrap();
        assert_eq!(attestation.record, "score:42");
        assert_eq!(attestation.subject, subject);
        assert!(pipeline.ledger().validate_chain().await.is_empty());
    }

    #[tokio::test]
    async fn test_submit_at_window_boundary() {
        let (pipeline, keypair, subject) = make_pipeline();
        let identity = keypair.public_key();

        let challenge = issue_challenge_at(&identity, 1_000_000);
        let signature = keypair.sign(challenge.as_bytes());

        // Exactly at the window edge is still accepted
        assert!(pipeline
            .submit_at(&identity, &challenge, &signature, &subject, "r", 1_000_300)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_expired_challenge_rejected_without_mutation() {
        let (pipeline, keypair, subject) = make_pipeline();
        let identity = keypair.public_key();

        let challenge = issue_challenge_at(&identity, 1_000_000);
        let signature = keypair.sign(challenge.as_bytes());

        let err = pipeline
            .submit_at(&identity, &challenge, &signature, &subject, "r", 1_000_301)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::ExpiredChallenge { issued_at: 1_000_000, elapsed: 301 }
        ));
        assert_eq!(pipeline.ledger().chain_len().await, 1);
        assert_eq!(pipeline.ledger().chain_height().await, 0);
    }

    #[tokio::test]
    async fn test_future_challenge_rejected() {
        let (pipeline, keypair, subject) = make_pipeline();
        let identity = keypair.public_key();

        let challenge = issue_challenge_at(&identity, 2_000_000);
        let signature = keypair.sign(challenge.as_bytes());

        assert!(matches!(
            pipeline
                .submit_at(&identity, &challenge, &signature, &subject, "r", 1_000_000)
                .await,
            Err(LedgerError::ExpiredChallenge { .. })
        ));
    }

    #[tokio::test]
    async fn test_wrong_message_signature_rejected_without_mutation() {
        let (pipeline, keypair, subject) = make_pipeline();
        let identity = keypair.public_key();

        let challenge = issue_challenge_at(&identity, 1_000_000);
        // Signature over a different message than the issued challenge
        let signature = keypair.sign(b"something else entirely");

        let err = pipeline
            .submit_at(&identity, &challenge, &signature, &subject, "r", 1_000_010)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidSignature));
        assert_eq!(pipeline.ledger().chain_len().await, 1);
    }

    #[tokio::test]
    async fn test_challenge_for_other_identity_rejected() {
        let (pipeline, keypair, subject) = make_pipeline();
        let identity = keypair.public_key();
        let other = Keypair::from_seed(&[0x07; 32]);

        // Challenge issued for someone else, signed by the claimant
        let challenge = issue_challenge_at(&other.public_key(), 1_000_000);
        let signature = keypair.sign(challenge.as_bytes());

        assert!(matches!(
            pipeline
                .submit_at(&identity, &challenge, &signature, &subject, "r", 1_000_010)
                .await,
            Err(LedgerError::InvalidSignature)
        ));
        assert_eq!(pipeline.ledger().chain_len().await, 1);
    }

    #[tokio::test]
    async fn test_malformed_challenge_rejected() {
        let (pipeline, keypair, subject) = make_pipeline();
        let identity = keypair.public_key();
        let signature = keypair.sign(b"whatever");

        let err = pipeline
            .submit_at(&identity, "not a challenge", &signature, &subject, "r", 1_000_000)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::MalformedChallenge(_)));
        assert_eq!(pipeline.ledger().chain_len().await, 1);
    }

    #[tokio::test]
    async fn test_custom_verifier_seam() {
        struct RejectAll;
        impl SignatureVerifier for RejectAll {
            fn verify(
                &self,
                _identity: &Ed25519PublicKey,
                _message: &[u8],
                _signature: &Ed25519Signature,
            ) -> std::result::Result<(), CoreError> {
                Err(CoreError::InvalidSignature)
            }
        }

        let ledger = Arc::new(Ledger::new());
        let pipeline =
            SubmissionPipeline::with_verifier(ledger, RejectAll, PipelineConfig::default());

        let keypair = Keypair::from_seed(&[0x42; 32]);
        let identity = keypair.public_key();
        let challenge = issue_challenge_at(&identity, 1_000_000);
        let signature = keypair.sign(challenge.as_bytes());

        assert!(matches!(
            pipeline
                .submit_at(&identity, &challenge, &signature, &identity, "r", 1_000_001)
                .await,
            Err(LedgerError::InvalidSignature)
        ));
    }
}
