//! # Digests
//!
//! Everything hashed in the stack is SHA-256 rendered as lowercase hex:
//! transaction ids, registry accumulators, tails hashes, attribute
//! commitments and proof challenges.
//!
//! Whole values go through [`sha256_hex`], which only takes
//! [`CanonicalBytes`]. Commitments built from several parts use
//! [`Sha256Accumulator`]: a domain tag first, then length-prefixed parts.

use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// SHA-256 of canonical bytes, lowercase hex.
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    hex(&Sha256::digest(data.as_bytes()))
}

/// Domain-separated SHA-256 over framed parts.
///
/// Each part is prefixed with its length as a big-endian `u64`, so
/// `("ab", "c")` and `("a", "bc")` never collide.
#[derive(Clone)]
pub struct Sha256Accumulator {
    hasher: Sha256,
}

impl Sha256Accumulator {
    pub fn with_domain(domain: &str) -> Self {
        let mut acc = Self {
            hasher: Sha256::new(),
        };
        acc.update_framed(domain.as_bytes());
        acc
    }

    pub fn update_framed(&mut self, part: &[u8]) {
        self.hasher.update((part.len() as u64).to_be_bytes());
        self.hasher.update(part);
    }

    pub fn finalize_hex(self) -> String {
        hex(&self.hasher.finalize())
    }
}

impl std::fmt::Debug for Sha256Accumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Sha256Accumulator")
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
