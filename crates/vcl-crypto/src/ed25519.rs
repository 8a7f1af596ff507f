//! # Ed25519 Keys and Signatures
//!
//! Ledger transactions are endorsed with Ed25519, and the mock engine signs
//! credential commitments with the credential definition's key. Signing
//! input is always `&CanonicalBytes`. Keys and signatures travel as
//! lowercase hex; the key pair itself never serializes and its `Debug` is
//! redacted.

use ed25519_dalek::{Signer as _, Verifier as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use vcl_core::{CanonicalBytes, CryptoError};

/// Fixed-width byte newtype carried as hex on the wire.
macro_rules! hex_bytes {
    ($name:ident, $len:literal, $err:ident) => {
        impl $name {
            pub fn to_hex(&self) -> String {
                self.0.iter().map(|b| format!("{b:02x}")).collect()
            }

            pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
                decode_hex::<$len>(hex).map(Self).map_err(CryptoError::$err)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let hex = String::deserialize(deserializer)?;
                Self::from_hex(&hex).map_err(serde::de::Error::custom)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({}...)", stringify!($name), &self.to_hex()[..8])
            }
        }
    };
}

/// Verification key. Also the seed of a party's DID.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ed25519PublicKey(pub [u8; 32]);

/// Detached signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519Signature(pub [u8; 64]);

hex_bytes!(Ed25519PublicKey, 32, KeyError);
hex_bytes!(Ed25519Signature, 64, VerificationFailed);

impl Ed25519PublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check `signature` over `data`. A key that is not a valid curve point
    /// is a `KeyError`; a bad signature is `VerificationFailed`.
    pub fn verify(
        &self,
        data: &CanonicalBytes,
        signature: &Ed25519Signature,
    ) -> Result<(), CryptoError> {
        let vk = ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CryptoError::KeyError(format!("invalid public key: {e}")))?;
        vk.verify(
            data.as_bytes(),
            &ed25519_dalek::Signature::from_bytes(&signature.0),
        )
        .map_err(|e| CryptoError::VerificationFailed(format!("ed25519: {e}")))
    }
}

impl std::fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Signing key of an issuer, a holder, or a credential definition.
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

impl Ed25519KeyPair {
    pub fn generate() -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Key from a configured seed phrase: the UTF-8 bytes, right-padded with
    /// `'0'` or cut to 32. Same phrase, same DID.
    pub fn from_seed_str(seed: &str) -> Self {
        let mut buf = [b'0'; 32];
        buf.iter_mut()
            .zip(seed.as_bytes())
            .for_each(|(dst, src)| *dst = *src);
        Self::from_seed(&buf)
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, data: &CanonicalBytes) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(data.as_bytes()).to_bytes())
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Ed25519KeyPair(<private>)")
    }
}

fn decode_hex<const N: usize>(hex: &str) -> Result<[u8; N], String> {
    let hex = hex.trim();
    if hex.len() != N * 2 || !hex.is_ascii() {
        return Err(format!("expected {} hex chars, got {}", N * 2, hex.len()));
    }
    let mut out = [0u8; N];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16)
            .map_err(|e| format!("invalid hex at {}: {e}", 2 * i))?;
    }
    Ok(out)
}
