//! # vcl-zkp — Anonymous Credential Engine
//!
//! - **Traits** (`traits.rs`): `AnoncredsEngine`, the contract every engine
//!   satisfies: credential definitions, offers, requests, issuance, holder
//!   processing, proof creation and proof verification. Engines are pure
//!   functions over well-formed public data; malformed input yields
//!   `EngineError`.
//!
//! - **Mock** (`mock.rs`): `MockAnoncredsEngine`, a transparent engine built
//!   from SHA-256 commitments and Ed25519 signatures. Every protocol path is
//!   exercised end to end, including predicate refusal and non-revocation
//!   against a registry state at a timestamp.
//!
//! ## Security Notice
//!
//! The mock engine is **not private**: predicate proofs open the attribute
//! commitment and the link secret commitment is shared across sub-proofs.
//! It must be replaced by a real CL engine wherever privacy is required.
//!
//! ## Crate Policy
//!
//! - Depends on `vcl-core`, `vcl-crypto` and `vcl-vc` internally.
//! - The mock is behind the default `mock` feature.

#[cfg(feature = "mock")]
pub mod mock;
pub mod traits;

#[cfg(feature = "mock")]
pub use mock::MockAnoncredsEngine;
pub use traits::{AnoncredsEngine, EngineError, ProofPublicData};
