//! # vcl-crypto — Signing Capability
//!
//! - **Ed25519** keys and signatures. The signing input is always
//!   `&CanonicalBytes`; raw bytes cannot be signed.
//! - **`Signer`**, the capability a protocol party uses to endorse ledger
//!   transactions, and **`Party`**, the public identity (DID plus
//!   verification key) the ledger checks signatures against.
//!
//! ## Crate Policy
//!
//! - Depends only on `vcl-core` internally.
//! - Tests use real Ed25519 and real canonical bytes.

pub mod ed25519;
pub mod signer;

pub use ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use signer::{Party, Signer};
