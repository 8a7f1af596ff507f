//! # vcl-vc — Credential Data Model
//!
//! - **Schema / CredentialDefinition** (`schema.rs`): published, never
//!   mutated ledger objects. Key material is engine-opaque JSON.
//!
//! - **Attribute encoding** (`encoding.rs`): the raw → encoded mapping that
//!   credentials sign and predicates compare.
//!
//! - **RevocationRegistryDefinition** (`revocation.rs`): the fixed-capacity
//!   accumulator. Mutators are pure and return the successor state plus the
//!   delta to publish with it.
//!
//! - **Credential exchange types** (`credential.rs`): offer, request, master
//!   secret, credential and the ledger credential record.
//!
//! - **Proof requests** (`request.rs`) and **proofs** (`proof.rs`).
//!
//! ## Crate Policy
//!
//! - Depends on `vcl-core` only. No I/O, no ledger access.
//! - Hashes go through `CanonicalBytes`.

pub mod credential;
pub mod encoding;
pub mod error;
pub mod proof;
pub mod request;
pub mod revocation;
pub mod schema;

pub use credential::{
    Credential, CredentialOffer, CredentialRecord, CredentialRequest, CredentialStatus,
    CredentialValues, MasterSecret,
};
pub use encoding::{encode_attribute, AttributeValue};
pub use error::VcError;
pub use proof::{
    Identifier, Proof, RequestedAttributeCredential, RequestedCredentials,
    RequestedPredicateCredential, RequestedProof, RevealedAttribute, SubProof, SubProofReferent,
};
pub use request::{
    build_proof_request, restrictions_satisfied, AttributeReference, NonRevokedInterval,
    PredicateReference, PredicateType, ProofRequest, ProofRequestBuilder, Restriction,
};
pub use revocation::{
    Accumulator, RegistryError, RevocationRegistryDefinition, RevocationRegistryDelta,
    DEFAULT_TAILS_LOCATION,
};
pub use schema::{CredentialDefinition, CredentialPrivateKey, Schema};
