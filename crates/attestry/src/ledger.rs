//! The ledger: an append-only, hash-linked chain of blocks.
//!
//! One `Ledger` instance is constructed per deployment and threaded through
//! the API surface explicitly; there is no process-wide singleton. The
//! chain lives behind a `tokio::sync::RwLock` with single-writer semantics:
//! an append holds the write lock for the whole read-tail / validate / seal
//! / push sequence, so no two appends ever compute `height` and
//! `previous_hash` from the same snapshot. Lookups take read locks and see
//! the chain strictly before or strictly after any given append.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use attestry_core::{validate_blocks, Block, BlockHash, Ed25519PublicKey, Payload};

use crate::error::{LedgerError, Result};

/// The append-only attestation chain.
pub struct Ledger {
    inner: RwLock<LedgerInner>,
}

struct LedgerInner {
    /// Ordered blocks; index 0 is genesis.
    chain: Vec<Block>,

    /// Cached height, always `chain.len() - 1`.
    height: u64,
}

impl Ledger {
    /// Create a ledger with a freshly sealed genesis block.
    ///
    /// The chain is never observed empty: genesis is sealed synchronously
    /// here, before the ledger is shared.
    pub fn new() -> Self {
        let genesis = Block::genesis(now_secs());
        Self {
            inner: RwLock::new(LedgerInner {
                chain: vec![genesis],
                height: 0,
            }),
        }
    }

    /// Restore a ledger from a previously recorded chain.
    ///
    /// This is the substitution point for a durable backend: blocks stored
    /// with their exact sealed field set remain self-verifying here. An
    /// empty input gets a fresh genesis. No validation happens on restore;
    /// corruption surfaces on the next [`validate_chain`](Self::validate_chain)
    /// or append.
    pub fn from_chain(chain: Vec<Block>) -> Self {
        if chain.is_empty() {
            return Self::new();
        }
        let height = chain.len() as u64 - 1;
        Self {
            inner: RwLock::new(LedgerInner { chain, height }),
        }
    }

    /// Append a block carrying the given payload.
    ///
    /// Assigns `height`, `previous_hash`, and the server-side `timestamp`,
    /// validates the existing chain, seals, and pushes — all under the
    /// write lock. Refuses to build on top of corruption.
    pub async fn append_block(&self, payload: Payload) -> Result<Block> {
        let mut inner = self.inner.write().await;

        let height = inner.chain.len() as u64;
        let previous_hash = inner.chain.last().map(|b| b.hash);
        let timestamp = now_secs();

        let errors = validate_blocks(&inner.chain);
        if !errors.is_empty() {
            warn!(?errors, "refusing to append to an inconsistent chain");
            return Err(LedgerError::Integrity(errors));
        }

        let block = Block::seal(payload, height, previous_hash, timestamp);

        inner.chain.push(block.clone());
        inner.height = height;
        debug!(height, hash = %block.hash, "appended block");

        Ok(block)
    }

    /// Get the block at the given height, if any.
    pub async fn get_block_by_height(&self, height: u64) -> Option<Block> {
        let inner = self.inner.read().await;
        inner.chain.iter().find(|b| b.height == height).cloned()
    }

    /// Get the first block with the given hash, if any. Linear scan.
    pub async fn get_block_by_hash(&self, hash: &BlockHash) -> Option<Block> {
        let inner = self.inner.read().await;
        inner.chain.iter().find(|b| b.hash == *hash).cloned()
    }

    /// Collect the records attested about the given subject identity, in
    /// chain order (oldest first). Genesis is skipped.
    ///
    /// O(chain length); acceptable because the ledger is small and local.
    pub async fn get_records_by_identity(&self, subject: &Ed25519PublicKey) -> Vec<String> {
        let inner = self.inner.read().await;
        inner
            .chain
            .iter()
            .filter_map(|b| b.as_attestation())
            .filter(|a| a.subject == *subject)
            .map(|a| a.record.clone())
            .collect()
    }

    /// Validate the whole chain; an empty report means it is consistent.
    ///
    /// Inconsistency is this method's result, never its error.
    pub async fn validate_chain(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        validate_blocks(&inner.chain)
    }

    /// The cached chain height (index of the last block).
    pub async fn chain_height(&self) -> u64 {
        self.inner.read().await.height
    }

    /// The number of blocks in the chain.
    pub async fn chain_len(&self) -> usize {
        self.inner.read().await.chain.len()
    }

    /// A consistent copy of the whole chain.
    pub async fn snapshot(&self) -> Vec<Block> {
        self.inner.read().await.chain.clone()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

/// Current wall-clock time in Unix seconds.
fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_secs() as i64
}
