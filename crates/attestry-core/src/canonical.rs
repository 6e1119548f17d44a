//! Canonical CBOR encoding for deterministic block hashing.
//!
//! This module implements RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats (timestamps are i64 seconds)
//!
//! The canonical encoding is critical: the same block produces identical
//! bytes (and thus an identical hash) across all platforms, so stored
//! blocks remain self-verifying wherever they are replayed.
//!
//! Two encodings exist:
//! - [`canonical_bytes`]: the block with its hash field excluded. This is
//!   the hashing preimage; the hash cannot cover itself.
//! - [`encode_block`] / [`decode_block`]: the full block including the
//!   stored hash, for persistence or transport.

use ciborium::value::Value;

use crate::block::{Attestation, Block, Payload, GENESIS_MARKER};
use crate::crypto::{Ed25519PublicKey, Ed25519Signature};
use crate::error::CoreError;
use crate::types::BlockHash;

/// Block field keys (integer keys for compact encoding).
///
/// Keys 0-23 encode as single bytes in CBOR. The order is fixed and part of
/// the hashing contract.
mod keys {
    pub const HEIGHT: u64 = 0;
    pub const TIMESTAMP: u64 = 1;
    pub const PREVIOUS_HASH: u64 = 2;
    pub const PAYLOAD: u64 = 3;
    pub const HASH: u64 = 4;
}

/// Payload envelope keys.
mod payload_keys {
    pub const KIND: u64 = 0;
    pub const BODY: u64 = 1;
}

/// Attestation body keys.
mod attestation_keys {
    pub const IDENTITY: u64 = 0;
    pub const CHALLENGE: u64 = 1;
    pub const SIGNATURE: u64 = 2;
    pub const SUBJECT: u64 = 3;
    pub const RECORD: u64 = 4;
}

/// Payload kind discriminants.
const KIND_GENESIS: u64 = 0;
const KIND_ATTESTATION: u64 = 1;

/// Encode a block to canonical CBOR bytes with the hash field excluded.
///
/// This is the preimage over which the block hash is computed.
pub fn canonical_bytes(block: &Block) -> Vec<u8> {
    let value = block_to_cbor_value(block, false);
    encode_cbor_value_canonical(&value)
}

/// Encode a full block, including its stored hash.
pub fn encode_block(block: &Block) -> Vec<u8> {
    let value = block_to_cbor_value(block, true);
    encode_cbor_value_canonical(&value)
}

/// Decode a block from bytes produced by [`encode_block`].
///
/// The stored hash is carried as data, not recomputed; callers that care
/// run [`Block::verify_hash`] afterwards.
pub fn decode_block(bytes: &[u8]) -> Result<Block, CoreError> {
    let cursor = std::io::Cursor::new(bytes);
    let value: Value =
        ciborium::from_reader(cursor).map_err(|e| CoreError::DecodingError(e.to_string()))?;
    cbor_value_to_block(&value)
}

/// Convert a block to a CBOR Value (map with integer keys).
fn block_to_cbor_value(block: &Block, include_hash: bool) -> Value {
    let mut entries = Vec::with_capacity(5);

    entries.push((
        Value::Integer(keys::HEIGHT.into()),
        Value::Integer(block.height.into()),
    ));

    entries.push((
        Value::Integer(keys::TIMESTAMP.into()),
        Value::Integer(block.timestamp.into()),
    ));

    let prev_value = match &block.previous_hash {
        Some(hash) => Value::Bytes(hash.0.to_vec()),
        None => Value::Null,
    };
    entries.push((Value::Integer(keys::PREVIOUS_HASH.into()), prev_value));

    entries.push((
        Value::Integer(keys::PAYLOAD.into()),
        payload_to_cbor_value(&block.payload),
    ));

    if include_hash {
        entries.push((
            Value::Integer(keys::HASH.into()),
            Value::Bytes(block.hash.0.to_vec()),
        ));
    }

    Value::Map(entries)
}

/// Convert a payload to its tagged CBOR form.
fn payload_to_cbor_value(payload: &Payload) -> Value {
    match payload {
        Payload::Genesis => Value::Map(vec![
            (
                Value::Integer(payload_keys::KIND.into()),
                Value::Integer(KIND_GENESIS.into()),
            ),
            (
                Value::Integer(payload_keys::BODY.into()),
                Value::Text(GENESIS_MARKER.to_string()),
            ),
        ]),
        Payload::Attestation(a) => {
            let body = Value::Map(vec![
                (
                    Value::Integer(attestation_keys::IDENTITY.into()),
                    Value::Bytes(a.identity.0.to_vec()),
                ),
                (
                    Value::Integer(attestation_keys::CHALLENGE.into()),
                    Value::Text(a.challenge.clone()),
                ),
                (
                    Value::Integer(attestation_keys::SIGNATURE.into()),
                    Value::Bytes(a.signature.0.to_vec()),
                ),
                (
                    Value::Integer(attestation_keys::SUBJECT.into()),
                    Value::Bytes(a.subject.0.to_vec()),
                ),
                (
                    Value::Integer(attestation_keys::RECORD.into()),
                    Value::Text(a.record.clone()),
                ),
            ]);
            Value::Map(vec![
                (
                    Value::Integer(payload_keys::KIND.into()),
                    Value::Integer(KIND_ATTESTATION.into()),
                ),
                (Value::Integer(payload_keys::BODY.into()), body),
            ])
        }
    }
}

/// Encode a CBOR Value to canonical bytes.
fn encode_cbor_value_canonical(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value);
    buf
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(i) => {
            encode_integer(buf, *i);
        }
        Value::Bytes(b) => {
            encode_bytes(buf, b);
        }
        Value::Text(s) => {
            encode_text(buf, s);
        }
        Value::Array(arr) => {
            encode_array(buf, arr);
        }
        Value::Map(entries) => {
            encode_map_canonical(buf, entries);
        }
        Value::Bool(b) => {
            buf.push(if *b { 0xf5 } else { 0xf4 });
        }
        Value::Null => {
            buf.push(0xf6);
        }
        Value::Float(_) => {
            panic!("floats not supported in canonical encoding");
        }
        _ => {
            panic!("unsupported CBOR value type");
        }
    }
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        // Major type 0: unsigned integer
        encode_uint(buf, 0, n as u64);
    } else {
        // Major type 1: negative integer; CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode an array (major type 4).
fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item);
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) {
    let mut key_value_pairs: Vec<(Vec<u8>, &Value)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_value_to(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, key_value_pairs.len() as u64);

    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}

/// Convert a CBOR Value (map) back to a Block.
fn cbor_value_to_block(value: &Value) -> Result<Block, CoreError> {
    let map = match value {
        Value::Map(m) => m,
        _ => return Err(CoreError::MalformedBlock("expected map".into())),
    };

    let get = |key: u64| -> Option<&Value> {
        map.iter()
            .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == key as i128))
            .map(|(_, v)| v)
    };

    let height = match get(keys::HEIGHT) {
        Some(Value::Integer(i)) => {
            let n: i128 = (*i).into();
            u64::try_from(n).map_err(|_| CoreError::MalformedBlock("invalid height".into()))?
        }
        _ => return Err(CoreError::MalformedBlock("missing height".into())),
    };

    let timestamp = match get(keys::TIMESTAMP) {
        Some(Value::Integer(i)) => {
            let n: i128 = (*i).into();
            i64::try_from(n).map_err(|_| CoreError::MalformedBlock("invalid timestamp".into()))?
        }
        _ => return Err(CoreError::MalformedBlock("missing timestamp".into())),
    };

    let previous_hash = match get(keys::PREVIOUS_HASH) {
        Some(Value::Bytes(b)) if b.len() == 32 => {
            let mut arr = [0u8; 32];
            arr.copy_from_slice(b);
            Some(BlockHash(arr))
        }
        Some(Value::Null) | None => None,
        _ => return Err(CoreError::MalformedBlock("invalid previous_hash".into())),
    };

    let payload = match get(keys::PAYLOAD) {
        Some(v) => cbor_value_to_payload(v)?,
        None => return Err(CoreError::MalformedBlock("missing payload".into())),
    };

    let hash = match get(keys::HASH) {
        Some(Value::Bytes(b)) if b.len() == 32 => {
            let mut arr = [0u8; 32];
            arr.copy_from_slice(b);
            BlockHash(arr)
        }
        _ => return Err(CoreError::MalformedBlock("invalid hash".into())),
    };

    Ok(Block {
        height,
        timestamp,
        previous_hash,
        payload,
        hash,
    })
}

/// Convert the tagged CBOR form back to a payload.
fn cbor_value_to_payload(value: &Value) -> Result<Payload, CoreError> {
    let map = match value {
        Value::Map(m) => m,
        _ => return Err(CoreError::MalformedBlock("payload: expected map".into())),
    };

    let get = |key: u64| -> Option<&Value> {
        map.iter()
            .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == key as i128))
            .map(|(_, v)| v)
    };

    let kind = match get(payload_keys::KIND) {
        Some(Value::Integer(i)) => i128::from(*i),
        _ => return Err(CoreError::MalformedBlock("payload: missing kind".into())),
    };

    match kind {
        k if k == KIND_GENESIS as i128 => match get(payload_keys::BODY) {
            Some(Value::Text(s)) if s == GENESIS_MARKER => Ok(Payload::Genesis),
            _ => Err(CoreError::MalformedBlock("invalid genesis marker".into())),
        },
        k if k == KIND_ATTESTATION as i128 => {
            let body = match get(payload_keys::BODY) {
                Some(Value::Map(m)) => m,
                _ => return Err(CoreError::MalformedBlock("attestation: expected map".into())),
            };
            cbor_map_to_attestation(body).map(Payload::Attestation)
        }
        other => Err(CoreError::MalformedBlock(format!(
            "unknown payload kind: {other}"
        ))),
    }
}

fn cbor_map_to_attestation(map: &[(Value, Value)]) -> Result<Attestation, CoreError> {
    let get = |key: u64| -> Option<&Value> {
        map.iter()
            .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == key as i128))
            .map(|(_, v)| v)
    };

    let identity = match get(attestation_keys::IDENTITY) {
        Some(Value::Bytes(b)) if b.len() == 32 => {
            let mut arr = [0u8; 32];
            arr.copy_from_slice(b);
            Ed25519PublicKey(arr)
        }
        _ => return Err(CoreError::MalformedBlock("invalid identity".into())),
    };

    let challenge = match get(attestation_keys::CHALLENGE) {
        Some(Value::Text(s)) => s.clone(),
        _ => return Err(CoreError::MalformedBlock("invalid challenge".into())),
    };

    let signature = match get(attestation_keys::SIGNATURE) {
        Some(Value::Bytes(b)) if b.len() == 64 => {
            let mut arr = [0u8; 64];
            arr.copy_from_slice(b);
            Ed25519Signature(arr)
        }
        _ => return Err(CoreError::MalformedBlock("invalid signature".into())),
    };

    let subject = match get(attestation_keys::SUBJECT) {
        Some(Value::Bytes(b)) if b.len() == 32 => {
            let mut arr = [0u8; 32];
            arr.copy_from_slice(b);
            Ed25519PublicKey(arr)
        }
        _ => return Err(CoreError::MalformedBlock("invalid subject".into())),
    };

    let record = match get(attestation_keys::RECORD) {
        Some(Value::Text(s)) => s.clone(),
        _ => return Err(CoreError::MalformedBlock("invalid record".into())),
    };

    Ok(Attestation {
        identity,
        challenge,
        signature,
        subject,
        record,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use proptest::prelude::*;

    fn make_block(height: u64, timestamp: i64, record: &str) -> Block {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let subject = Keypair::from_seed(&[0x43; 32]);
        let challenge = format!("{}:{}:tag", keypair.public_key().to_hex(), timestamp);
        let signature = keypair.sign(challenge.as_bytes());
        let attestation = Attestation {
            identity: keypair.public_key(),
            challenge,
            signature,
            subject: subject.public_key(),
            record: record.to_string(),
        };
        Block::seal(
            Payload::Attestation(attestation),
            height,
            Some(BlockHash::from_bytes([0xaa; 32])),
            timestamp,
        )
    }

    #[test]
    fn test_canonical_encoding_deterministic() {
        let block = make_block(1, 1736870400, "score:42");
        assert_eq!(canonical_bytes(&block), canonical_bytes(&block));
    }

    #[test]
    fn test_canonical_bytes_exclude_hash() {
        let block = make_block(1, 1736870400, "score:42");
        let mut hash_cleared = block.clone();
        hash_cleared.hash = BlockHash::ZERO;
        assert_eq!(canonical_bytes(&block), canonical_bytes(&hash_cleared));
    }

    #[test]
    fn test_encode_block_covers_hash() {
        let block = make_block(1, 1736870400, "score:42");
        let mut hash_cleared = block.clone();
        hash_cleared.hash = BlockHash::ZERO;
        assert_ne!(encode_block(&block), encode_block(&hash_cleared));
    }

    #[test]
    fn test_block_roundtrip() {
        let block = make_block(7, 1736870400, "score:42");
        let bytes = encode_block(&block);
        let decoded = decode_block(&bytes).unwrap();
        assert_eq!(block, decoded);
        assert!(decoded.verify_hash());
    }

    #[test]
    fn test_genesis_roundtrip() {
        let genesis = Block::genesis(1736870400);
        let decoded = decode_block(&encode_block(&genesis)).unwrap();
        assert_eq!(genesis, decoded);
        assert!(decoded.is_genesis());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_block(&[0xff, 0x00, 0x12]).is_err());
        // A valid CBOR value that is not a block map
        assert!(decode_block(&[0x01]).is_err());
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();

        // 0-23: single byte
        encode_uint(&mut buf, 0, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        // 24-255: two bytes
        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        // 256-65535: three bytes
        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);
    }

    #[test]
    fn test_negative_integer_encoding() {
        let mut buf = Vec::new();
        encode_integer(&mut buf, (-1i64).into());
        assert_eq!(buf, vec![0x20]);

        buf.clear();
        encode_integer(&mut buf, (-25i64).into());
        assert_eq!(buf, vec![0x38, 24]);
    }

    #[test]
    fn test_map_key_ordering() {
        let mut buf = Vec::new();
        let entries = vec![
            (Value::Integer(4.into()), Value::Integer(40.into())),
            (Value::Integer(0.into()), Value::Integer(0.into())),
            (Value::Integer(2.into()), Value::Integer(2.into())),
        ];
        encode_map_canonical(&mut buf, &entries);

        assert_eq!(buf[0], 0xa3); // map of 3
        assert_eq!(buf[1], 0x00); // key 0
        assert_eq!(buf[2], 0x00);
        assert_eq!(buf[3], 0x02); // key 2
        assert_eq!(buf[4], 0x02);
        assert_eq!(buf[5], 0x04); // key 4
        assert_eq!(buf[6], 0x18); // value 40 (>23)
        assert_eq!(buf[7], 40);
    }

    proptest! {
        #[test]
        fn prop_seal_roundtrip(
            height in 0u64..1_000_000,
            timestamp in 0i64..4_102_444_800,
            record in "[a-zA-Z0-9:._-]{0,48}",
        ) {
            let block = make_block(height, timestamp, &record);
            prop_assert!(block.verify_hash());

            let decoded = decode_block(&encode_block(&block)).unwrap();
            prop_assert_eq!(&decoded, &block);
            prop_assert!(decoded.verify_hash());
        }

        #[test]
        fn prop_hash_detects_height_tamper(
            height in 0u64..1_000_000,
            bump in 1u64..1000,
        ) {
            let block = make_block(height, 1736870400, "score:1");
            let mut tampered = block.clone();
            tampered.height = height + bump;
            prop_assert!(!tampered.verify_hash());
        }
    }
}
