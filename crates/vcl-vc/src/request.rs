//! # Proof Requests
//!
//! A verifier asks for revealed attributes and numeric predicates, each
//! optionally restricted to credentials from particular schemas, definitions
//! or issuers, and optionally bounded by a non-revocation interval. Requests
//! are immutable once built.

use std::collections::BTreeMap;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use vcl_core::{CredentialDefinitionId, Did, RevocationRegistryId, SchemaId, Timestamp};

use crate::error::VcError;

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredicateType {
    /// `>=`
    #[serde(rename = ">=")]
    GE,
    /// `>`
    #[serde(rename = ">")]
    GT,
    /// `<=`
    #[serde(rename = "<=")]
    LE,
    /// `<`
    #[serde(rename = "<")]
    LT,
}

impl PredicateType {
    /// Evaluate `value <op> threshold`.
    pub fn holds(&self, value: i32, threshold: i32) -> bool {
        match self {
            Self::GE => value >= threshold,
            Self::GT => value > threshold,
            Self::LE => value <= threshold,
            Self::LT => value < threshold,
        }
    }

    /// Operator symbol.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GE => ">=",
            Self::GT => ">",
            Self::LE => "<=",
            Self::LT => "<",
        }
    }
}

impl std::fmt::Display for PredicateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive time window for which non-revocation must be shown.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NonRevokedInterval {
    /// Earliest acceptable timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Timestamp>,
    /// Latest acceptable timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Timestamp>,
}

impl NonRevokedInterval {
    /// `[from, to]`.
    pub fn new(from: Option<Timestamp>, to: Option<Timestamp>) -> Self {
        Self { from, to }
    }

    /// The single instant `[t, t]`.
    pub fn at(t: Timestamp) -> Self {
        Self::new(Some(t), Some(t))
    }

    /// Inclusive containment; open ends are unbounded.
    pub fn contains(&self, ts: Timestamp) -> bool {
        self.from.map_or(true, |from| from <= ts) && self.to.map_or(true, |to| ts <= to)
    }

    /// Timestamp a prover should prove at: the upper bound if any.
    pub fn proving_timestamp(&self) -> Option<Timestamp> {
        self.to.or(self.from)
    }
}

/// Constraint on which credential may answer a referent. Every set field
/// must match.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Restriction {
    /// Required schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<SchemaId>,
    /// Required credential definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<CredentialDefinitionId>,
    /// Required issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_did: Option<Did>,
    /// Required registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev_reg_id: Option<RevocationRegistryId>,
}

impl Restriction {
    /// Restrict to one credential definition.
    pub fn cred_def(id: CredentialDefinitionId) -> Self {
        Self {
            cred_def_id: Some(id),
            ..Self::default()
        }
    }

    /// Restrict to one issuer.
    pub fn issuer(did: Did) -> Self {
        Self {
            issuer_did: Some(did),
            ..Self::default()
        }
    }

    /// Restrict to one schema.
    pub fn schema(id: SchemaId) -> Self {
        Self {
            schema_id: Some(id),
            ..Self::default()
        }
    }

    /// True if a credential with these identifiers satisfies this restriction.
    pub fn matches(
        &self,
        schema_id: &SchemaId,
        cred_def_id: &CredentialDefinitionId,
        rev_reg_id: Option<&RevocationRegistryId>,
    ) -> bool {
        self.schema_id.as_ref().map_or(true, |s| s == schema_id)
            && self.cred_def_id.as_ref().map_or(true, |c| c == cred_def_id)
            && self
                .issuer_did
                .as_ref()
                .map_or(true, |d| d == cred_def_id.issuer_did())
            && self
                .rev_reg_id
                .as_ref()
                .map_or(true, |r| Some(r) == rev_reg_id)
    }
}

/// True if the restriction list is empty or any entry matches.
pub fn restrictions_satisfied(
    restrictions: &[Restriction],
    schema_id: &SchemaId,
    cred_def_id: &CredentialDefinitionId,
    rev_reg_id: Option<&RevocationRegistryId>,
) -> bool {
    restrictions.is_empty()
        || restrictions
            .iter()
            .any(|r| r.matches(schema_id, cred_def_id, rev_reg_id))
}

/// A requested attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeReference {
    /// Attribute name.
    pub name: String,
    /// Alternatives; empty means unrestricted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restrictions: Vec<Restriction>,
    /// Overrides the request-level interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevokedInterval>,
}

impl AttributeReference {
    /// Unrestricted attribute.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            restrictions: Vec::new(),
            non_revoked: None,
        }
    }

    /// Add a restriction alternative.
    pub fn restrict(mut self, restriction: Restriction) -> Self {
        self.restrictions.push(restriction);
        self
    }

    /// Per-referent interval.
    pub fn non_revoked(mut self, interval: NonRevokedInterval) -> Self {
        self.non_revoked = Some(interval);
        self
    }
}

/// A requested predicate over an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateReference {
    /// Attribute name.
    pub name: String,
    /// Operator.
    pub p_type: PredicateType,
    /// Threshold.
    pub p_value: i32,
    /// Alternatives; empty means unrestricted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restrictions: Vec<Restriction>,
    /// Overrides the request-level interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevokedInterval>,
}

impl PredicateReference {
    /// Unrestricted predicate.
    pub fn new(name: impl Into<String>, p_type: PredicateType, p_value: i32) -> Self {
        Self {
            name: name.into(),
            p_type,
            p_value,
            restrictions: Vec::new(),
            non_revoked: None,
        }
    }

    /// Predicate with the same restrictions and interval as `attr`.
    pub fn from_attribute(attr: AttributeReference, p_type: PredicateType, p_value: i32) -> Self {
        Self {
            name: attr.name,
            p_type,
            p_value,
            restrictions: attr.restrictions,
            non_revoked: attr.non_revoked,
        }
    }

    /// Add a restriction alternative.
    pub fn restrict(mut self, restriction: Restriction) -> Self {
        self.restrictions.push(restriction);
        self
    }
}

/// A verifier's proof request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRequest {
    /// Human-readable name.
    pub name: String,
    /// Request version.
    pub version: String,
    /// Decimal nonce binding the proof to this request.
    pub nonce: String,
    /// Referent → attribute.
    pub requested_attributes: BTreeMap<String, AttributeReference>,
    /// Referent → predicate.
    pub requested_predicates: BTreeMap<String, PredicateReference>,
    /// Request-level interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevokedInterval>,
}

impl ProofRequest {
    /// An 80-bit random nonce in decimal.
    pub fn generate_nonce() -> String {
        let mut bytes = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut bytes[6..]);
        u128::from_be_bytes(bytes).to_string()
    }

    /// Interval that applies to a referent: its own, else the request's.
    pub fn effective_interval<'a>(
        &'a self,
        referent_interval: Option<&'a NonRevokedInterval>,
    ) -> Option<&'a NonRevokedInterval> {
        referent_interval.or(self.non_revoked.as_ref())
    }

    /// Structural checks shared by the builder and deserialized requests.
    pub fn validate(&self) -> Result<(), VcError> {
        for (field, value) in [
            ("name", &self.name),
            ("version", &self.version),
            ("nonce", &self.nonce),
        ] {
            if value.trim().is_empty() {
                return Err(VcError::Validation(format!("proof request {field} is empty")));
            }
        }
        if !self.nonce.chars().all(|c| c.is_ascii_digit()) {
            return Err(VcError::Validation(format!(
                "proof request nonce {:?} is not decimal",
                self.nonce
            )));
        }
        let names = self
            .requested_attributes
            .values()
            .map(|a| &a.name)
            .chain(self.requested_predicates.values().map(|p| &p.name));
        for name in names {
            if name.trim().is_empty() {
                return Err(VcError::Validation("requested attribute name is empty".into()));
            }
        }
        Ok(())
    }
}

/// Incremental construction of a [`ProofRequest`].
///
/// Referents are assigned in insertion order as `attr{n}_referent` and
/// `predicate{n}_referent` unless given explicitly.
#[derive(Debug, Clone)]
pub struct ProofRequestBuilder {
    request: ProofRequest,
}

impl ProofRequestBuilder {
    /// Start a request.
    pub fn new(name: impl Into<String>, version: impl Into<String>, nonce: impl Into<String>) -> Self {
        Self {
            request: ProofRequest {
                name: name.into(),
                version: version.into(),
                nonce: nonce.into(),
                requested_attributes: BTreeMap::new(),
                requested_predicates: BTreeMap::new(),
                non_revoked: None,
            },
        }
    }

    /// Request an attribute under the next generated referent.
    pub fn attribute(self, attr: AttributeReference) -> Self {
        let referent = format!("attr{}_referent", self.request.requested_attributes.len() + 1);
        self.attribute_as(referent, attr)
    }

    /// Request an attribute under an explicit referent.
    pub fn attribute_as(mut self, referent: impl Into<String>, attr: AttributeReference) -> Self {
        self.request.requested_attributes.insert(referent.into(), attr);
        self
    }

    /// Request a predicate under the next generated referent.
    pub fn predicate(self, pred: PredicateReference) -> Self {
        let referent = format!(
            "predicate{}_referent",
            self.request.requested_predicates.len() + 1
        );
        self.predicate_as(referent, pred)
    }

    /// Request a predicate under an explicit referent.
    pub fn predicate_as(mut self, referent: impl Into<String>, pred: PredicateReference) -> Self {
        self.request.requested_predicates.insert(referent.into(), pred);
        self
    }

    /// Request-level non-revocation interval.
    pub fn non_revoked(mut self, interval: NonRevokedInterval) -> Self {
        self.request.non_revoked = Some(interval);
        self
    }

    /// Validate and return the request.
    pub fn build(self) -> Result<ProofRequest, VcError> {
        self.request.validate()?;
        Ok(self.request)
    }
}

/// One-shot construction. Predicates are given as an attribute reference
/// plus operator and threshold.
pub fn build_proof_request(
    version: &str,
    name: &str,
    nonce: &str,
    attributes: Vec<AttributeReference>,
    predicates: Vec<(AttributeReference, PredicateType, i32)>,
    non_revoked: Option<NonRevokedInterval>,
) -> Result<ProofRequest, VcError> {
    let mut builder = ProofRequestBuilder::new(name, version, nonce);
    for attr in attributes {
        builder = builder.attribute(attr);
    }
    for (attr, p_type, p_value) in predicates {
        builder = builder.predicate(PredicateReference::from_attribute(attr, p_type, p_value));
    }
    if let Some(interval) = non_revoked {
        builder = builder.non_revoked(interval);
    }
    builder.build()
}
