//! Chain validation: self-hash and linkage checks.
//!
//! Two independent passes over the chain. The first catches a block that
//! was altered without updating its own hash; the second catches a
//! different block spliced into a position. Keeping them separate gives
//! diagnosable output instead of a single opaque "chain broken" signal.
//!
//! Inconsistency is reported as data, never as an error: an inconsistent
//! chain is a normal result of this function, not a failure of it.

use crate::block::Block;

/// Validate a chain of blocks, returning accumulated error descriptions.
///
/// An empty result means the chain is valid. The genesis block at index 0
/// is exempt from self-validation but participates in linkage checks as the
/// predecessor of block 1.
pub fn validate_blocks(blocks: &[Block]) -> Vec<String> {
    let mut errors = Vec::new();

    for (i, block) in blocks.iter().enumerate().skip(1) {
        if !block.verify_hash() {
            errors.push(format!("invalid block number: {i}"));
        }
    }

    for (i, block) in blocks.iter().enumerate().skip(1) {
        if block.previous_hash != Some(blocks[i - 1].hash) {
            errors.push(format!("invalid link from block {i} to previous block"));
        }
    }

    errors
}
