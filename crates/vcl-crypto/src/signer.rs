//! # Signer Capability
//!
//! Issuer and holder endorse ledger transactions through [`Signer`]. The
//! ledger only knows the public side, a [`Party`], and checks each required
//! signature against the party's verification key.

use serde::{Deserialize, Serialize};
use vcl_core::{CanonicalBytes, Did};

use crate::ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

/// Public identity of a protocol participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Party {
    /// Ledger DID.
    pub did: Did,
    /// Key that verifies this party's signatures.
    pub verkey: Ed25519PublicKey,
}

impl Party {
    /// The party whose DID is minted from `verkey`.
    pub fn from_verkey(verkey: Ed25519PublicKey) -> Self {
        Self {
            did: Did::from_verkey(verkey.as_bytes()),
            verkey,
        }
    }
}

/// Something that can sign canonical bytes on behalf of a party.
pub trait Signer: Send + Sync {
    /// The identity whose key produces the signatures.
    fn party(&self) -> Party;

    /// Sign canonical bytes.
    fn sign(&self, data: &CanonicalBytes) -> Ed25519Signature;
}

impl Signer for Ed25519KeyPair {
    fn party(&self) -> Party {
        Party::from_verkey(self.public_key())
    }

    fn sign(&self, data: &CanonicalBytes) -> Ed25519Signature {
        Ed25519KeyPair::sign(self, data)
    }
}
