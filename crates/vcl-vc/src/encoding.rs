//! # Attribute Encoding
//!
//! Credentials sign encoded values, not raw strings. A raw value that is the
//! canonical decimal form of a 32-bit signed integer encodes to itself, so
//! predicates can compare it numerically. Anything else encodes to the
//! decimal form of SHA-256(raw) read as a big-endian unsigned integer.
//!
//! Non-canonical integer spellings (`"007"`, `"+5"`, `"-0"`) are hashed, so
//! two raw strings never share an encoding.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Encode a raw attribute value.
pub fn encode_attribute(raw: &str) -> String {
    if let Ok(n) = raw.parse::<i32>() {
        if n.to_string() == raw {
            return raw.to_string();
        }
    }
    let hash = Sha256::digest(raw.as_bytes());
    BigUint::from_bytes_be(&hash).to_str_radix(10)
}

/// A raw attribute value together with its encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    /// The value as presented to humans.
    pub raw: String,
    /// The value as signed by the issuer.
    pub encoded: String,
}

impl AttributeValue {
    /// Encode `raw`.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let encoded = encode_attribute(&raw);
        Self { raw, encoded }
    }

    /// True if `encoded` is the encoding of `raw`.
    pub fn is_consistent(&self) -> bool {
        encode_attribute(&self.raw) == self.encoded
    }

    /// The encoded value as an `i32`, if it is one. Predicates only apply to
    /// such values.
    pub fn as_i32(&self) -> Option<i32> {
        self.encoded.parse().ok()
    }
}
