//! # vcl-core — Foundational Types for the Credential Ledger Stack
//!
//! Every other crate in the workspace depends on `vcl-core`; it depends on
//! nothing internal.
//!
//! ## Contents
//!
//! 1. **Identifier codec** (`identifier.rs`). `Did`, `SchemaId`,
//!    `CredentialDefinitionId`, `RevocationRegistryId` and `CredentialId`.
//!    Compound ledger identifiers are parsed and formatted through `FromStr`
//!    and `Display`; equality is structural.
//!
//! 2. **`CanonicalBytes`** (`canonical.rs`). All bytes that are signed or
//!    hashed flow through `CanonicalBytes::new()` (RFC 8785 JCS).
//!
//! 3. **Digests** (`digest.rs`). SHA-256 hex, over `CanonicalBytes` or
//!    domain-tagged framed parts. Accumulator values and tails hashes are
//!    digests.
//!
//! 4. **Timestamps** (`temporal.rs`). UTC-only, seconds precision. Ledger
//!    commit times and non-revocation intervals use this type.
//!
//! 5. **Error taxonomy** (`error.rs`). `ErrorKind` classifies every failure
//!    of the issuance, revocation and verification protocols.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `vcl-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identifier;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_hex, Sha256Accumulator};
pub use error::{CanonicalizationError, CryptoError, ErrorKind, IdentifierError, VclError};
pub use identifier::{
    CredentialDefinitionId, CredentialId, Did, RevocationRegistryId, SchemaId,
    SignatureType,
};
pub use temporal::Timestamp;
