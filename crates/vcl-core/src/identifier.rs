//! # Ledger Identifier Codec
//!
//! Compound identifiers for ledger objects. Each identifier encodes the
//! issuer DID, an object-type marker, and the object-specific segments:
//!
//! ```text
//! SchemaId               {did}:2:{name}:{version}
//! CredentialDefinitionId {did}:3:CL:{schema_seq_no}:{tag}
//! RevocationRegistryId   {did}:4:{cred_def_id}:CL_ACCUM:{tag}
//! ```
//!
//! Identifiers are immutable once minted and compare structurally. They
//! serialize as their string form; deserialization goes through `FromStr`,
//! so a malformed identifier can never enter the system through serde.
//!
//! Segments other than the DID may not contain `:`; constructors reject
//! such input instead of producing an identifier that would not parse back.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::IdentifierError;

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

const SCHEMA_MARKER: &str = "2";
const CRED_DEF_MARKER: &str = "3";
const REV_REG_MARKER: &str = "4";
const REV_REG_TYPE: &str = "CL_ACCUM";

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

fn check_segment(kind: &'static str, value: &str, segment: &str) -> Result<(), IdentifierError> {
    if segment.is_empty() || segment.contains(':') {
        return Err(IdentifierError::Malformed {
            kind,
            value: value.to_string(),
            reason: format!("segment {segment:?} must be non-empty and contain no ':'"),
        });
    }
    Ok(())
}

// ─── DID ─────────────────────────────────────────────────────────────

/// An unqualified ledger DID (base58, 16- or 32-byte key material).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Did(String);

impl Did {
    /// Validate and wrap a DID string.
    pub fn new(s: impl Into<String>) -> Result<Self, IdentifierError> {
        let s = s.into();
        let len_ok = matches!(s.len(), 21 | 22 | 43 | 44);
        if !len_ok || !s.chars().all(|c| BASE58_ALPHABET.contains(c)) {
            return Err(IdentifierError::InvalidDid(s));
        }
        Ok(Self(s))
    }

    /// Derive a DID from the first 16 bytes of a verification key, the way
    /// ledger nym DIDs are minted.
    pub fn from_verkey(verkey: &[u8; 32]) -> Self {
        let mut s = base58_encode(&verkey[..16]);
        // Keys with a run of small leading bytes encode short.
        while s.len() < 21 {
            s.insert(0, '1');
        }
        Self(s)
    }

    /// The DID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Did {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

string_serde!(Did);

/// Base58 (bitcoin alphabet) encoding of a short byte string.
fn base58_encode(input: &[u8]) -> String {
    let alphabet = BASE58_ALPHABET.as_bytes();
    let mut digits: Vec<u8> = Vec::with_capacity(input.len() * 2);
    for &byte in input {
        let mut carry = u32::from(byte);
        for digit in digits.iter_mut() {
            carry += u32::from(*digit) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }
    let zeros = input.iter().take_while(|b| **b == 0).count();
    std::iter::repeat('1')
        .take(zeros)
        .chain(digits.iter().rev().map(|d| alphabet[*d as usize] as char))
        .collect()
}

// ─── Signature type ──────────────────────────────────────────────────

/// Credential signature scheme carried in credential-definition ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignatureType {
    /// Camenisch-Lysyanskaya signatures.
    CL,
}

impl SignatureType {
    /// Identifier segment for this signature type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CL => "CL",
        }
    }
}

// ─── SchemaId ────────────────────────────────────────────────────────

/// Identifier of a published schema: `{did}:2:{name}:{version}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId {
    issuer_did: Did,
    name: String,
    version: String,
}

impl SchemaId {
    /// Mint a schema identifier.
    pub fn new(
        issuer_did: Did,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, IdentifierError> {
        let name = name.into();
        let version = version.into();
        let rendered = format!("{issuer_did}:{SCHEMA_MARKER}:{name}:{version}");
        check_segment("schema", &rendered, &name)?;
        check_segment("schema", &rendered, &version)?;
        Ok(Self {
            issuer_did,
            name,
            version,
        })
    }

    /// DID of the schema author.
    pub fn issuer_did(&self) -> &Did {
        &self.issuer_did
    }

    /// Schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema version.
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{SCHEMA_MARKER}:{}:{}",
            self.issuer_did, self.name, self.version
        )
    }
}

impl FromStr for SchemaId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 4 {
            return Err(IdentifierError::Malformed {
                kind: "schema",
                value: s.to_string(),
                reason: format!("expected 4 segments, got {}", parts.len()),
            });
        }
        if parts[1] != SCHEMA_MARKER {
            return Err(IdentifierError::UnknownMarker {
                expected: SCHEMA_MARKER,
                found: parts[1].to_string(),
            });
        }
        Self::new(Did::new(parts[0])?, parts[2], parts[3])
    }
}

string_serde!(SchemaId);

// ─── CredentialDefinitionId ──────────────────────────────────────────

/// Identifier of a credential definition: `{did}:3:CL:{schema_seq_no}:{tag}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CredentialDefinitionId {
    issuer_did: Did,
    signature_type: SignatureType,
    schema_seq_no: u64,
    tag: String,
}

impl CredentialDefinitionId {
    /// Mint a credential-definition identifier.
    pub fn new(
        issuer_did: Did,
        schema_seq_no: u64,
        tag: impl Into<String>,
    ) -> Result<Self, IdentifierError> {
        let tag = tag.into();
        if schema_seq_no == 0 {
            return Err(IdentifierError::InvalidSequence("0".to_string()));
        }
        let rendered = format!("{issuer_did}:{CRED_DEF_MARKER}:CL:{schema_seq_no}:{tag}");
        check_segment("cred_def", &rendered, &tag)?;
        Ok(Self {
            issuer_did,
            signature_type: SignatureType::CL,
            schema_seq_no,
            tag,
        })
    }

    /// DID of the issuer that owns the definition.
    pub fn issuer_did(&self) -> &Did {
        &self.issuer_did
    }

    /// Signature scheme.
    pub fn signature_type(&self) -> SignatureType {
        self.signature_type
    }

    /// Ledger sequence number of the schema the definition binds.
    pub fn schema_seq_no(&self) -> u64 {
        self.schema_seq_no
    }

    /// Issuer-chosen tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Display for CredentialDefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{CRED_DEF_MARKER}:{}:{}:{}",
            self.issuer_did,
            self.signature_type.as_str(),
            self.schema_seq_no,
            self.tag
        )
    }
}

impl FromStr for CredentialDefinitionId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 5 {
            return Err(IdentifierError::Malformed {
                kind: "cred_def",
                value: s.to_string(),
                reason: format!("expected 5 segments, got {}", parts.len()),
            });
        }
        if parts[1] != CRED_DEF_MARKER {
            return Err(IdentifierError::UnknownMarker {
                expected: CRED_DEF_MARKER,
                found: parts[1].to_string(),
            });
        }
        if parts[2] != SignatureType::CL.as_str() {
            return Err(IdentifierError::UnknownMarker {
                expected: "CL",
                found: parts[2].to_string(),
            });
        }
        let seq_no: u64 = parts[3]
            .parse()
            .map_err(|_| IdentifierError::InvalidSequence(parts[3].to_string()))?;
        Self::new(Did::new(parts[0])?, seq_no, parts[4])
    }
}

string_serde!(CredentialDefinitionId);

// ─── RevocationRegistryId ────────────────────────────────────────────

/// Identifier of a revocation registry:
/// `{did}:4:{cred_def_id}:CL_ACCUM:{tag}`.
///
/// The registry belongs to the issuer of its credential definition, so the
/// leading DID always equals the credential definition's DID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RevocationRegistryId {
    cred_def_id: CredentialDefinitionId,
    tag: String,
}

impl RevocationRegistryId {
    /// Mint a registry identifier under a credential definition.
    pub fn new(
        cred_def_id: CredentialDefinitionId,
        tag: impl Into<String>,
    ) -> Result<Self, IdentifierError> {
        let tag = tag.into();
        let rendered = format!(
            "{}:{REV_REG_MARKER}:{cred_def_id}:{REV_REG_TYPE}:{tag}",
            cred_def_id.issuer_did()
        );
        check_segment("rev_reg", &rendered, &tag)?;
        Ok(Self { cred_def_id, tag })
    }

    /// DID of the issuer that owns the registry.
    pub fn issuer_did(&self) -> &Did {
        self.cred_def_id.issuer_did()
    }

    /// Credential definition the registry serves.
    pub fn cred_def_id(&self) -> &CredentialDefinitionId {
        &self.cred_def_id
    }

    /// Issuer-chosen registry tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Display for RevocationRegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{REV_REG_MARKER}:{}:{REV_REG_TYPE}:{}",
            self.issuer_did(),
            self.cred_def_id,
            self.tag
        )
    }
}

impl FromStr for RevocationRegistryId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 9 {
            return Err(IdentifierError::Malformed {
                kind: "rev_reg",
                value: s.to_string(),
                reason: format!("expected 9 segments, got {}", parts.len()),
            });
        }
        if parts[1] != REV_REG_MARKER {
            return Err(IdentifierError::UnknownMarker {
                expected: REV_REG_MARKER,
                found: parts[1].to_string(),
            });
        }
        if parts[7] != REV_REG_TYPE {
            return Err(IdentifierError::UnknownMarker {
                expected: REV_REG_TYPE,
                found: parts[7].to_string(),
            });
        }
        let cred_def_id: CredentialDefinitionId = parts[2..7].join(":").parse()?;
        if cred_def_id.issuer_did().as_str() != parts[0] {
            return Err(IdentifierError::Malformed {
                kind: "rev_reg",
                value: s.to_string(),
                reason: "registry DID differs from credential definition DID".to_string(),
            });
        }
        Self::new(cred_def_id, parts[8])
    }
}

string_serde!(RevocationRegistryId);

// ─── CredentialId ────────────────────────────────────────────────────

/// Identifier of an issued credential record on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CredentialId(pub Uuid);

impl CredentialId {
    /// Generate a new random credential identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CredentialId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CredentialId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| IdentifierError::Malformed {
                kind: "credential",
                value: s.to_string(),
                reason: e.to_string(),
            })
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn did_strategy() -> impl Strategy<Value = Did> {
        "[1-9A-HJ-NP-Za-km-z]{22}".prop_map(|s| Did::new(s).unwrap())
    }

    proptest! {
        /// Every minted registry id parses back to an equal value, including
        /// the embedded credential definition.
        #[test]
        fn rev_reg_id_parse_inverts_display(
            did in did_strategy(),
            seq in 1u64..1_000_000,
            cd_tag in "[a-zA-Z0-9_.-]{1,12}",
            rr_tag in "[a-zA-Z0-9_.-]{1,12}",
        ) {
            let cd = CredentialDefinitionId::new(did, seq, cd_tag).unwrap();
            let rr = RevocationRegistryId::new(cd, rr_tag).unwrap();
            let parsed: RevocationRegistryId = rr.to_string().parse().unwrap();
            prop_assert_eq!(parsed, rr);
        }

        /// Parsing arbitrary text never panics.
        #[test]
        fn parse_never_panics(s in ".{0,80}") {
            let _ = s.parse::<SchemaId>();
            let _ = s.parse::<CredentialDefinitionId>();
            let _ = s.parse::<RevocationRegistryId>();
        }
    }
}
