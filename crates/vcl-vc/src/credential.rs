//! # Credential Exchange Types
//!
//! The messages of the issuance handshake and what it produces:
//!
//! ```text
//! issuer ── CredentialOffer ──▶ holder
//! issuer ◀── CredentialRequest ── holder   (nonce = offer nonce)
//! issuer ── Credential ──▶ holder           (inside the proposed transaction)
//! ```
//!
//! The authoritative copy of an issued credential is the ledger's
//! [`CredentialRecord`]. Its only permitted change is `Issued → Revoked`.

use std::collections::BTreeMap;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use vcl_core::{
    CredentialDefinitionId, CredentialId, Did, RevocationRegistryId, SchemaId, Timestamp,
};

use crate::encoding::AttributeValue;

/// Attribute name → value, ordered by name.
pub type CredentialValues = BTreeMap<String, AttributeValue>;

/// Issuer's offer to issue a credential under a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialOffer {
    /// Schema of the offered credential.
    pub schema_id: SchemaId,
    /// Definition the credential will be signed under.
    pub cred_def_id: CredentialDefinitionId,
    /// Decimal nonce the request must echo.
    pub nonce: String,
}

/// Holder's request, bound to one offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRequest {
    /// DID of the requesting holder.
    pub prover_did: Did,
    /// Definition being requested.
    pub cred_def_id: CredentialDefinitionId,
    /// Engine-specific blinded link secret.
    pub blinded_ms: serde_json::Value,
    /// Engine-specific proof of correct blinding, bound to the nonce.
    pub blinded_ms_correctness_proof: serde_json::Value,
    /// Echo of the offer nonce.
    pub nonce: String,
}

/// Holder link secret. Ties credentials of one holder together in proofs.
#[derive(Clone, PartialEq, Eq)]
pub struct MasterSecret([u8; 32]);

impl MasterSecret {
    /// Fresh random secret.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Secret from known bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw secret.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterSecret(<private>)")
    }
}

/// An issued credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Schema the values conform to.
    pub schema_id: SchemaId,
    /// Definition that signed the values.
    pub cred_def_id: CredentialDefinitionId,
    /// Registry holding this credential's index, for revocable credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev_reg_id: Option<RevocationRegistryId>,
    /// Index in the registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_rev_index: Option<u32>,
    /// Signed attribute values.
    pub values: CredentialValues,
    /// Engine-specific signature.
    pub signature: serde_json::Value,
}

impl Credential {
    /// Raw value of attribute `name`.
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|v| v.raw.as_str())
    }

    /// Registry id and index, if the credential is revocable.
    pub fn revocation_info(&self) -> Option<(&RevocationRegistryId, u32)> {
        match (&self.rev_reg_id, self.cred_rev_index) {
            (Some(id), Some(idx)) => Some((id, idx)),
            _ => None,
        }
    }
}

/// Status of a credential record on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialStatus {
    /// Committed and not revoked.
    Issued,
    /// Revoked. Terminal.
    Revoked,
}

impl CredentialStatus {
    /// Valid transitions: `Issued → Revoked` only.
    pub fn can_transition_to(&self, next: CredentialStatus) -> bool {
        matches!((self, next), (Self::Issued, Self::Revoked))
    }

    /// `Revoked` is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Revoked)
    }
}

impl std::fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Issued => "ISSUED",
            Self::Revoked => "REVOKED",
        })
    }
}

/// Ledger record of an issued credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Record key.
    pub id: CredentialId,
    /// The credential as issued.
    pub credential: Credential,
    /// Issuing party.
    pub issuer_did: Did,
    /// Holding party.
    pub holder_did: Did,
    /// Lifecycle status.
    pub status: CredentialStatus,
    /// When the issuance was proposed.
    pub issued_at: Timestamp,
    /// When the credential was revoked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<Timestamp>,
}

impl CredentialRecord {
    /// A freshly issued record.
    pub fn issued(
        credential: Credential,
        issuer_did: Did,
        holder_did: Did,
        issued_at: Timestamp,
    ) -> Self {
        Self {
            id: CredentialId::new(),
            credential,
            issuer_did,
            holder_did,
            status: CredentialStatus::Issued,
            issued_at,
            revoked_at: None,
        }
    }

    /// The same record marked revoked, or `None` if it already is.
    pub fn revoked(&self, at: Timestamp) -> Option<Self> {
        if !self.status.can_transition_to(CredentialStatus::Revoked) {
            return None;
        }
        let mut next = self.clone();
        next.status = CredentialStatus::Revoked;
        next.revoked_at = Some(at);
        Some(next)
    }

    /// True if `next` differs from `self` only by a legal status change.
    pub fn is_legal_update(&self, next: &Self) -> bool {
        if !self.status.can_transition_to(next.status) {
            return false;
        }
        let mut expected = self.clone();
        expected.status = next.status;
        expected.revoked_at = next.revoked_at;
        expected == *next && next.revoked_at.is_some()
    }
}
