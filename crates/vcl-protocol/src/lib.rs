//! # vcl-protocol — Credential Protocols
//!
//! Drives the engine, the ledger and the channel through the credential
//! lifecycle:
//!
//! - **Catalog** (`catalog.rs`): `CredentialDefinitionCatalog`, a read-mostly
//!   cache of published schemas and credential definitions over the ledger.
//! - **Issuance** (`issuer.rs`, `holder.rs`): the two sides of the
//!   offer → request → issue → acknowledge handshake. The registry index is
//!   reserved on a copy and becomes durable only in the same ledger commit
//!   that records the credential.
//! - **Revocation** (`revocation.rs`): issuer-only, one transaction that
//!   advances the registry and marks the record revoked.
//! - **Proofs** (`prover.rs`, `verifier.rs`): resolve public data from the
//!   ledger at the right timestamps and delegate the cryptography.
//! - **Channel** (`channel.rs`, `message.rs`): the typed message pipe the
//!   handshake runs over, with an in-memory implementation.
//!
//! ## Crate Policy
//!
//! - Ledger and channel calls are the only suspension points. No DashMap
//!   guard is held across an `.await`.
//! - Engine errors propagate unchanged inside the protocol error enums.
//! - Every failure that ends an issuance sends `Abort` to the counterparty,
//!   unless the channel itself failed.

pub mod catalog;
pub mod channel;
pub mod error;
pub mod holder;
pub mod issuer;
pub mod message;
pub mod prover;
pub mod revocation;
pub mod verifier;

pub use catalog::CredentialDefinitionCatalog;
pub use channel::{Channel, MemoryChannel};
pub use error::{
    CatalogError, ChannelError, IssuanceError, ProveError, RevocationError, VerifyError,
};
pub use holder::Holder;
pub use issuer::{IssuanceOutcome, Issuer};
pub use message::IssuanceMessage;
pub use prover::Prover;
pub use revocation::RevocationOutcome;
pub use verifier::ProofVerifier;
