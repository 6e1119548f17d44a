//! Ownership challenge protocol.
//!
//! A challenge is a short-lived string the caller must sign to prove
//! control of an identity: `"{identity_hex}:{unix_secs}:{domain_tag}"`.
//!
//! No server-side record of issued challenges is kept; the validity window
//! is re-derived from the embedded timestamp at verification time. The
//! trade-off is stated plainly: anyone who intercepts a valid signed
//! challenge can replay it within the window. Replay mitigation is out of
//! scope for this ledger.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::crypto::Ed25519PublicKey;
use crate::error::CoreError;

/// Fixed domain tag embedded in every challenge.
///
/// Binds signatures to this protocol so a challenge signature cannot be
/// confused with a signature over unrelated data.
pub const CHALLENGE_DOMAIN_TAG: &str = "attestry-ownership-v0";

/// The decoded parts of a challenge string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeParts {
    /// The identity the challenge was issued for.
    pub identity: Ed25519PublicKey,
    /// Unix seconds at issuance.
    pub issued_at: i64,
}

/// Issue a challenge for the given identity at the current wall-clock time.
pub fn issue_challenge(identity: &Ed25519PublicKey) -> String {
    issue_challenge_at(identity, now_secs())
}

/// Issue a challenge with an explicit issuance time.
///
/// Pure; [`issue_challenge`] is this plus the wall clock.
pub fn issue_challenge_at(identity: &Ed25519PublicKey, issued_at: i64) -> String {
    format!(
        "{}:{}:{}",
        identity.to_hex(),
        issued_at,
        CHALLENGE_DOMAIN_TAG
    )
}

/// Parse a challenge string back into its parts.
///
/// Checks the segment count, the domain tag, the embedded timestamp, and
/// the embedded identity encoding. Freshness is the caller's concern; the
/// window is not applied here.
pub fn parse_challenge(challenge: &str) -> Result<ChallengeParts, CoreError> {
    let mut segments = challenge.splitn(3, ':');

    let identity_hex = segments
        .next()
        .ok_or_else(|| CoreError::MalformedChallenge("missing identity".into()))?;
    let ts = segments
        .next()
        .ok_or_else(|| CoreError::MalformedChallenge("missing timestamp".into()))?;
    let tag = segments
        .next()
        .ok_or_else(|| CoreError::MalformedChallenge("missing domain tag".into()))?;

    if tag != CHALLENGE_DOMAIN_TAG {
        return Err(CoreError::MalformedChallenge(format!(
            "unexpected domain tag: {tag}"
        )));
    }

    let issued_at: i64 = ts
        .parse()
        .map_err(|_| CoreError::MalformedChallenge(format!("bad timestamp: {ts}")))?;

    let identity = Ed25519PublicKey::from_hex(identity_hex)
        .map_err(|_| CoreError::MalformedChallenge("bad identity encoding".into()))?;

    Ok(ChallengeParts {
        identity,
        issued_at,
    })
}

/// Current wall-clock time in Unix seconds.
fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_secs() as i64
}
