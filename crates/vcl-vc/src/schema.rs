//! # Schemas and Credential Definitions
//!
//! A schema names an ordered set of attributes. A credential definition binds
//! a schema to an issuer's public key material and records whether
//! credentials under it can be revoked. Both are written once and never
//! mutated; the ledger rejects transactions that would overwrite them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use vcl_core::{CredentialDefinitionId, Did, SchemaId, SignatureType};

use crate::error::VcError;

/// A published attribute schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// `{did}:2:{name}:{version}`.
    pub id: SchemaId,
    /// Schema name.
    pub name: String,
    /// Schema version.
    pub version: String,
    /// Attribute names, ordered and unique.
    pub attr_names: BTreeSet<String>,
    /// Ledger sequence number, known once the schema is committed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq_no: Option<u64>,
}

impl Schema {
    /// Build a schema authored by `issuer_did`.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty or duplicated attribute list, or empty
    /// attribute names.
    pub fn new<I, S>(
        issuer_did: Did,
        name: &str,
        version: &str,
        attr_names: I,
    ) -> Result<Self, VcError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = SchemaId::new(issuer_did, name, version)?;
        let mut attrs = BTreeSet::new();
        for attr in attr_names {
            let attr = attr.into();
            if attr.trim().is_empty() {
                return Err(VcError::Validation("empty attribute name".into()));
            }
            if !attrs.insert(attr.clone()) {
                return Err(VcError::Validation(format!("duplicate attribute {attr:?}")));
            }
        }
        if attrs.is_empty() {
            return Err(VcError::Validation("schema has no attributes".into()));
        }
        Ok(Self {
            id,
            name: name.to_string(),
            version: version.to_string(),
            attr_names: attrs,
            seq_no: None,
        })
    }

    /// True if `name` is one of the schema's attributes.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attr_names.contains(name)
    }
}

/// Issuer-published public parameters for a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDefinition {
    /// `{did}:3:CL:{schema_seq_no}:{tag}`.
    pub id: CredentialDefinitionId,
    /// The schema this definition signs.
    pub schema_id: SchemaId,
    /// DID of the issuer.
    pub issuer_did: Did,
    /// Tag distinguishing multiple definitions over one schema.
    pub tag: String,
    /// Signature scheme.
    pub signature_type: SignatureType,
    /// Engine-specific public key material.
    pub public_key: serde_json::Value,
    /// Whether credentials under this definition carry a registry index.
    pub supports_revocation: bool,
}

impl CredentialDefinition {
    /// Structural consistency: the id's issuer and tag match the record.
    pub fn validate(&self) -> Result<(), VcError> {
        if self.id.issuer_did() != &self.issuer_did {
            return Err(VcError::Validation(format!(
                "credential definition {} is not owned by {}",
                self.id, self.issuer_did
            )));
        }
        if self.id.tag() != self.tag {
            return Err(VcError::Validation(format!(
                "credential definition tag {:?} does not match id {}",
                self.tag, self.id
            )));
        }
        Ok(())
    }
}

/// Issuer secret matching a credential definition's public key.
///
/// Engine-opaque bytes. Not serializable; `Debug` is redacted.
#[derive(Clone)]
pub struct CredentialPrivateKey(Vec<u8>);

impl CredentialPrivateKey {
    /// Wrap engine key material.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Engine key material.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for CredentialPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CredentialPrivateKey(<private>)")
    }
}
