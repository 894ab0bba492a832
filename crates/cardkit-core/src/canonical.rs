//! Snapshot codec: canonical CBOR for content and signature snapshots.
//!
//! Any `serde` value can be snapshotted. The encoding follows RFC 8949 Core
//! Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats (timestamps are i64 seconds)
//!
//! Determinism matters because a card's id is a hash of its content snapshot:
//! the same logical record must always produce identical bytes.

use ciborium::value::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Cursor;

use crate::error::{CoreError, Result};

/// Serialize `record` into a canonical snapshot.
pub fn take_snapshot<T: Serialize + ?Sized>(record: &T) -> Result<Vec<u8>> {
    let value = Value::serialized(record).map_err(|e| CoreError::EncodingError(e.to_string()))?;
    let mut buf = Vec::new();
    encode_value_to(&mut buf, &value)?;
    Ok(buf)
}

/// Deserialize a snapshot produced by [`take_snapshot`].
///
/// Fails on malformed or truncated input, and on trailing bytes after the
/// first CBOR item.
pub fn parse_snapshot<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut cursor = Cursor::new(bytes);
    let value: Value =
        ciborium::from_reader(&mut cursor).map_err(|e| CoreError::DecodingError(e.to_string()))?;

    if cursor.position() != bytes.len() as u64 {
        return Err(CoreError::DecodingError(format!(
            "{} trailing bytes after snapshot",
            bytes.len() as u64 - cursor.position()
        )));
    }

    value
        .deserialized()
        .map_err(|e| CoreError::DecodingError(e.to_string()))
}

/// Best-effort decode of optional metadata.
///
/// Absent input and decode failures both map to `None`; callers that treat
/// a snapshot as optional use this instead of [`parse_snapshot`].
pub fn try_parse_snapshot<T: DeserializeOwned>(bytes: Option<&[u8]>) -> Option<T> {
    let bytes = bytes?;
    match parse_snapshot(bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("ignoring undecodable snapshot ({} bytes): {}", bytes.len(), e);
            None
        }
    }
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => encode_array(buf, arr)?,
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(_) => {
            return Err(CoreError::EncodingError(
                "floats not supported in snapshots".into(),
            ))
        }
        _ => {
            return Err(CoreError::EncodingError(
                "unsupported CBOR value type".into(),
            ))
        }
    }
    Ok(())
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
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
fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) -> Result<()> {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item)?;
    }
    Ok(())
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison; duplicate keys are rejected.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<()> {
    let mut key_value_pairs: Vec<(Vec<u8>, &Value)> = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        key_value_pairs.push((key_buf, v));
    }

    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    if key_value_pairs.windows(2).any(|w| w[0].0 == w[1].0) {
        return Err(CoreError::EncodingError("duplicate map key".into()));
    }

    encode_uint(buf, 5, key_value_pairs.len() as u64);
    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}
