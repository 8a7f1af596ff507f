//! # Canonical Serialization
//!
//! `CanonicalBytes` is the only construction path for bytes that are
//! signed (transactions, credentials) or hashed (accumulators, proof
//! challenges) anywhere in the stack.
//!
//! ## Invariant
//!
//! The inner field is private. Any function that signs or digests must take
//! `&CanonicalBytes`, and the only way to produce one is [`CanonicalBytes::new`],
//! which rejects floats and serializes with RFC 8785 (JCS): sorted keys,
//! compact separators, deterministic output. Two parties that serialize the
//! same logical transaction therefore sign the same bytes.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// JCS-serialized bytes. Keys sorted, separators compact, integers only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Serialize `obj` canonically. A float anywhere in the value is
    /// `FloatRejected`.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        if let Some(f) = first_float(&value) {
            return Err(CanonicalizationError::FloatRejected(f));
        }
        Ok(Self(serde_jcs::to_string(&value)?.into_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn first_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) if n.is_f64() => n.as_f64(),
        Value::Object(map) => map.values().find_map(first_float),
        Value::Array(items) => items.iter().find_map(first_float),
        _ => None,
    }
}
