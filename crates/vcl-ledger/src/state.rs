//! # Ledger States
//!
//! Everything the ledger stores is a [`LedgerState`]. The holder's
//! acceptance check and the commit-time rules match on the variant rather
//! than on open-ended type tags.

use serde::{Deserialize, Serialize};
use vcl_core::{
    CredentialDefinitionId, CredentialId, RevocationRegistryId, SchemaId, Timestamp,
};
use vcl_vc::{CredentialDefinition, CredentialRecord, RevocationRegistryDefinition, Schema};

/// Kind of object stored under a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// [`Schema`].
    Schema,
    /// [`CredentialDefinition`].
    CredentialDefinition,
    /// [`RevocationRegistryDefinition`].
    RevocationRegistry,
    /// [`CredentialRecord`].
    Credential,
}

impl std::fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Schema => "schema",
            Self::CredentialDefinition => "cred_def",
            Self::RevocationRegistry => "rev_reg",
            Self::Credential => "credential",
        })
    }
}

/// Ledger key: kind plus the object's identifier string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LedgerKey {
    /// Object kind.
    pub kind: LedgerKind,
    /// Identifier in string form.
    pub id: String,
}

impl LedgerKey {
    /// Key of a schema.
    pub fn schema(id: &SchemaId) -> Self {
        Self {
            kind: LedgerKind::Schema,
            id: id.to_string(),
        }
    }

    /// Key of a credential definition.
    pub fn cred_def(id: &CredentialDefinitionId) -> Self {
        Self {
            kind: LedgerKind::CredentialDefinition,
            id: id.to_string(),
        }
    }

    /// Key of a revocation registry.
    pub fn rev_reg(id: &RevocationRegistryId) -> Self {
        Self {
            kind: LedgerKind::RevocationRegistry,
            id: id.to_string(),
        }
    }

    /// Key of a credential record.
    pub fn credential(id: &CredentialId) -> Self {
        Self {
            kind: LedgerKind::Credential,
            id: id.to_string(),
        }
    }
}

impl std::fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// A state object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "state", rename_all = "snake_case")]
pub enum LedgerState {
    /// Published schema.
    Schema(Schema),
    /// Published credential definition.
    CredentialDefinition(CredentialDefinition),
    /// Revocation registry at some version.
    RevocationRegistry(RevocationRegistryDefinition),
    /// Credential record at some version.
    Credential(CredentialRecord),
}

impl LedgerState {
    /// Key this state is stored under.
    pub fn key(&self) -> LedgerKey {
        match self {
            Self::Schema(s) => LedgerKey::schema(&s.id),
            Self::CredentialDefinition(c) => LedgerKey::cred_def(&c.id),
            Self::RevocationRegistry(r) => LedgerKey::rev_reg(&r.id),
            Self::Credential(c) => LedgerKey::credential(&c.id),
        }
    }

    /// Variant kind.
    pub fn kind(&self) -> LedgerKind {
        match self {
            Self::Schema(_) => LedgerKind::Schema,
            Self::CredentialDefinition(_) => LedgerKind::CredentialDefinition,
            Self::RevocationRegistry(_) => LedgerKind::RevocationRegistry,
            Self::Credential(_) => LedgerKind::Credential,
        }
    }

    /// The schema, if this is one.
    pub fn as_schema(&self) -> Option<&Schema> {
        match self {
            Self::Schema(s) => Some(s),
            _ => None,
        }
    }

    /// The credential definition, if this is one.
    pub fn as_cred_def(&self) -> Option<&CredentialDefinition> {
        match self {
            Self::CredentialDefinition(c) => Some(c),
            _ => None,
        }
    }

    /// The registry, if this is one.
    pub fn as_registry(&self) -> Option<&RevocationRegistryDefinition> {
        match self {
            Self::RevocationRegistry(r) => Some(r),
            _ => None,
        }
    }

    /// The credential record, if this is one.
    pub fn as_credential(&self) -> Option<&CredentialRecord> {
        match self {
            Self::Credential(c) => Some(c),
            _ => None,
        }
    }
}

/// Pointer to one version of a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateRef {
    /// Key.
    pub key: LedgerKey,
    /// Version, starting at 1.
    pub version: u64,
}

/// A state as committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedState {
    /// Key.
    pub key: LedgerKey,
    /// Per-key version, starting at 1.
    pub version: u64,
    /// Ledger-wide sequence number of the committing transaction.
    pub seq_no: u64,
    /// Commit time.
    pub committed_at: Timestamp,
    /// Committing transaction id.
    pub tx_id: String,
    /// The state.
    pub state: LedgerState,
}

impl VersionedState {
    /// Reference to this version, for consumption or reference.
    pub fn state_ref(&self) -> StateRef {
        StateRef {
            key: self.key.clone(),
            version: self.version,
        }
    }
}
