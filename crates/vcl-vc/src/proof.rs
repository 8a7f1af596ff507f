//! # Proofs
//!
//! A proof answers a [`ProofRequest`](crate::ProofRequest) with one sub-proof
//! per credential used. `identifiers[i]` names the ledger objects sub-proof
//! `i` must be checked against, including the registry timestamp when
//! non-revocation is proven. The per-sub-proof payloads are engine-opaque.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vcl_core::{CredentialDefinitionId, CredentialId, RevocationRegistryId, SchemaId, Timestamp};

/// Engine payload for one credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubProof {
    /// Equality and predicate proof.
    pub primary_proof: serde_json::Value,
    /// Proof of non-membership in the revoked set, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revocation_proof: Option<serde_json::Value>,
}

/// A revealed attribute, bound to a sub-proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedAttribute {
    /// Index into [`Proof::proofs`].
    pub sub_proof_index: u32,
    /// Claimed raw value.
    pub raw: String,
    /// Claimed encoding of `raw`.
    pub encoded: String,
}

/// A referent answered without revealing a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubProofReferent {
    /// Index into [`Proof::proofs`].
    pub sub_proof_index: u32,
}

/// The verifier-facing summary of what was proven.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestedProof {
    /// Referent → revealed value.
    #[serde(default)]
    pub revealed_attrs: BTreeMap<String, RevealedAttribute>,
    /// Referent → sub-proof for attributes proven but not revealed.
    #[serde(default)]
    pub unrevealed_attrs: BTreeMap<String, SubProofReferent>,
    /// Referent → value asserted by the prover for unrestricted attributes.
    #[serde(default)]
    pub self_attested_attrs: BTreeMap<String, String>,
    /// Referent → sub-proof satisfying the predicate.
    #[serde(default)]
    pub predicates: BTreeMap<String, SubProofReferent>,
}

/// Ledger objects a sub-proof refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    /// Schema of the credential.
    pub schema_id: SchemaId,
    /// Definition that signed it.
    pub cred_def_id: CredentialDefinitionId,
    /// Registry, if non-revocation is proven.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev_reg_id: Option<RevocationRegistryId>,
    /// Registry timestamp the non-revocation proof was made at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

/// A presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// One entry per credential used.
    pub proofs: Vec<SubProof>,
    /// Binds the sub-proofs together and to the request nonce.
    pub aggregated_proof: serde_json::Value,
    /// What was revealed and which sub-proof answers which referent.
    pub requested_proof: RequestedProof,
    /// Parallel to `proofs`.
    pub identifiers: Vec<Identifier>,
}

impl Proof {
    /// Sub-proof indices referenced by `requested_proof`.
    pub fn referenced_sub_proofs(&self) -> impl Iterator<Item = u32> + '_ {
        let rp = &self.requested_proof;
        rp.revealed_attrs
            .values()
            .map(|a| a.sub_proof_index)
            .chain(rp.unrevealed_attrs.values().map(|r| r.sub_proof_index))
            .chain(rp.predicates.values().map(|r| r.sub_proof_index))
    }

    /// Sub-proof index answering `referent`, attribute or predicate.
    pub fn sub_proof_for(&self, referent: &str) -> Option<u32> {
        let rp = &self.requested_proof;
        rp.revealed_attrs
            .get(referent)
            .map(|a| a.sub_proof_index)
            .or_else(|| rp.unrevealed_attrs.get(referent).map(|r| r.sub_proof_index))
            .or_else(|| rp.predicates.get(referent).map(|r| r.sub_proof_index))
    }
}

/// Holder's choice of credential for an attribute referent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedAttributeCredential {
    /// Wallet credential answering the referent.
    pub cred_id: CredentialId,
    /// Reveal the raw value.
    pub revealed: bool,
    /// Registry timestamp to prove non-revocation at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

/// Holder's choice of credential for a predicate referent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedPredicateCredential {
    /// Wallet credential answering the referent.
    pub cred_id: CredentialId,
    /// Registry timestamp to prove non-revocation at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

/// Holder's mapping of request referents to wallet credentials.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestedCredentials {
    /// Referent → value for unrestricted self-attested attributes.
    #[serde(default)]
    pub self_attested_attributes: BTreeMap<String, String>,
    /// Referent → credential.
    #[serde(default)]
    pub requested_attributes: BTreeMap<String, RequestedAttributeCredential>,
    /// Referent → credential.
    #[serde(default)]
    pub requested_predicates: BTreeMap<String, RequestedPredicateCredential>,
}

impl RequestedCredentials {
    /// Answer an attribute referent.
    pub fn attribute(
        mut self,
        referent: impl Into<String>,
        cred_id: CredentialId,
        revealed: bool,
        timestamp: Option<Timestamp>,
    ) -> Self {
        self.requested_attributes.insert(
            referent.into(),
            RequestedAttributeCredential {
                cred_id,
                revealed,
                timestamp,
            },
        );
        self
    }

    /// Answer a predicate referent.
    pub fn predicate(
        mut self,
        referent: impl Into<String>,
        cred_id: CredentialId,
        timestamp: Option<Timestamp>,
    ) -> Self {
        self.requested_predicates.insert(
            referent.into(),
            RequestedPredicateCredential { cred_id, timestamp },
        );
        self
    }

    /// Self-attest an unrestricted attribute referent.
    pub fn self_attested(mut self, referent: impl Into<String>, value: impl Into<String>) -> Self {
        self.self_attested_attributes.insert(referent.into(), value.into());
        self
    }

    /// Distinct `(credential, timestamp)` pairs in first-use order. Each
    /// becomes one sub-proof.
    pub fn sub_proof_keys(&self) -> Vec<(CredentialId, Option<Timestamp>)> {
        let mut keys = Vec::new();
        let all = self
            .requested_attributes
            .values()
            .map(|a| (a.cred_id, a.timestamp))
            .chain(
                self.requested_predicates
                    .values()
                    .map(|p| (p.cred_id, p.timestamp)),
            );
        for key in all {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}
