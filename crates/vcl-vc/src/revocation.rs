//! # Revocation Registry
//!
//! A fixed-capacity accumulator over credential indices. Index `i` is
//! *issued* once `i < current_cred_num` and *revoked* once it is in
//! `revoked`. The accumulator is a digest of that pair, so it summarises
//! exactly the set of issued, non-revoked indices.
//!
//! ## Invariants
//!
//! - `current_cred_num <= max_cred_num`.
//! - `revoked ⊆ [0, current_cred_num)`.
//! - Indices are handed out in order and never reused; revocation marks an
//!   index, it does not free it.
//!
//! ## Purity
//!
//! [`RevocationRegistryDefinition::reserve_next_index`] and
//! [`RevocationRegistryDefinition::revoke`] take `&self` and return the
//! successor state. A reservation only exists once the successor is
//! committed to the ledger in the same transaction as the credential it
//! was reserved for.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vcl_core::{
    sha256_hex, CanonicalBytes, CanonicalizationError, CredentialDefinitionId, ErrorKind,
    IdentifierError, RevocationRegistryId,
};

/// Default tails location used when none is configured.
pub const DEFAULT_TAILS_LOCATION: &str = "memory://tails";

/// Registry failures.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// `max_cred_num` must be at least 1.
    #[error("registry capacity must be positive, got {0}")]
    CapacityInvalid(u32),

    /// Every index has been handed out.
    #[error("registry is full ({max} credentials)")]
    RegistryFull {
        /// Registry capacity.
        max: u32,
    },

    /// The index was never reserved.
    #[error("index {index} was never issued (current_cred_num = {current})")]
    IndexNotIssued {
        /// Requested index.
        index: u32,
        /// Number of issued indices.
        current: u32,
    },

    /// The index is already revoked. State is unchanged.
    #[error("index {0} is already revoked")]
    AlreadyRevoked(u32),

    /// A registry state breaks one of the registry invariants.
    #[error("registry invariant violated: {0}")]
    InvariantViolated(String),

    /// A proposed successor is not a legal next state of its predecessor.
    #[error("invalid registry successor: {0}")]
    InvalidSuccessor(String),

    /// The registry identifier could not be minted.
    #[error("identifier error: {0}")]
    Identifier(#[from] IdentifierError),

    /// Accumulator hashing failed.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

impl RegistryError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RegistryFull { .. } => ErrorKind::CapacityExhausted,
            Self::CapacityInvalid(_)
            | Self::IndexNotIssued { .. }
            | Self::AlreadyRevoked(_)
            | Self::InvariantViolated(_)
            | Self::InvalidSuccessor(_)
            | Self::Identifier(_) => ErrorKind::Validation,
            Self::Canonicalization(_) => ErrorKind::Internal,
        }
    }
}

/// Accumulator value: hex SHA-256 over the canonical issued/revoked summary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Accumulator(pub String);

impl Accumulator {
    fn compute(
        rev_reg_id: &RevocationRegistryId,
        issued: u32,
        revoked: &BTreeSet<u32>,
    ) -> Result<Self, CanonicalizationError> {
        let summary = serde_json::json!({
            "rev_reg_id": rev_reg_id,
            "issued": issued,
            "revoked": revoked,
        });
        Ok(Self(sha256_hex(&CanonicalBytes::new(&summary)?)))
    }

    /// Hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Accumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Change set published with every registry mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRegistryDelta {
    /// Accumulator before the mutation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_accum: Option<Accumulator>,
    /// Accumulator after the mutation.
    pub accum: Accumulator,
    /// Indices newly issued.
    pub issued: BTreeSet<u32>,
    /// Indices newly revoked.
    pub revoked: BTreeSet<u32>,
}

/// A revocation registry and its current accumulator state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRegistryDefinition {
    /// `{did}:4:{cred_def_id}:CL_ACCUM:{tag}`.
    pub id: RevocationRegistryId,
    /// Credential definition the registry serves.
    pub cred_def_id: CredentialDefinitionId,
    /// Capacity. Immutable.
    pub max_cred_num: u32,
    /// Number of indices handed out.
    pub current_cred_num: u32,
    /// Revoked indices.
    pub revoked: BTreeSet<u32>,
    /// Digest of `(id, current_cred_num, revoked)`.
    pub accumulator: Accumulator,
    /// Where the tails file is published.
    pub tails_location: String,
    /// Digest of the tails parameters.
    pub tails_hash: String,
    /// Delta that produced this state; absent on the initial state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_delta: Option<RevocationRegistryDelta>,
}

impl RevocationRegistryDefinition {
    /// Create an empty registry for `cred_def_id`.
    ///
    /// # Errors
    ///
    /// `CapacityInvalid` when `max_cred_num == 0`.
    pub fn create(
        cred_def_id: &CredentialDefinitionId,
        tag: &str,
        max_cred_num: u32,
    ) -> Result<Self, RegistryError> {
        if max_cred_num == 0 {
            return Err(RegistryError::CapacityInvalid(max_cred_num));
        }
        let id = RevocationRegistryId::new(cred_def_id.clone(), tag)?;
        let revoked = BTreeSet::new();
        let accumulator = Accumulator::compute(&id, 0, &revoked)?;
        let tails = serde_json::json!({ "rev_reg_id": id, "max_cred_num": max_cred_num });
        let tails_hash = sha256_hex(&CanonicalBytes::new(&tails)?);
        Ok(Self {
            id,
            cred_def_id: cred_def_id.clone(),
            max_cred_num,
            current_cred_num: 0,
            revoked,
            accumulator,
            tails_location: DEFAULT_TAILS_LOCATION.to_string(),
            tails_hash,
            last_delta: None,
        })
    }

    /// Override the tails location. Only meaningful before publication.
    pub fn with_tails_location(mut self, location: impl Into<String>) -> Self {
        self.tails_location = location.into();
        self
    }

    /// `current_cred_num < max_cred_num`.
    pub fn can_produce_credentials(&self) -> bool {
        self.current_cred_num < self.max_cred_num
    }

    /// Alias of [`Self::can_produce_credentials`].
    pub fn can_issue(&self) -> bool {
        self.can_produce_credentials()
    }

    /// Remaining capacity.
    pub fn remaining(&self) -> u32 {
        self.max_cred_num - self.current_cred_num.min(self.max_cred_num)
    }

    /// True if `index` has been issued and revoked.
    pub fn is_revoked(&self, index: u32) -> bool {
        self.revoked.contains(&index)
    }

    /// True if `index` has been issued.
    pub fn is_issued(&self, index: u32) -> bool {
        index < self.current_cred_num
    }

    /// Issued indices that are not revoked, ascending.
    pub fn non_revoked_indices(&self) -> Vec<u32> {
        (0..self.current_cred_num)
            .filter(|i| !self.revoked.contains(i))
            .collect()
    }

    /// Reserve the next index.
    ///
    /// Returns the successor state, the index, and the delta to publish.
    ///
    /// # Errors
    ///
    /// `RegistryFull` when no capacity remains.
    pub fn reserve_next_index(
        &self,
    ) -> Result<(Self, u32, RevocationRegistryDelta), RegistryError> {
        if !self.can_produce_credentials() {
            return Err(RegistryError::RegistryFull {
                max: self.max_cred_num,
            });
        }
        let index = self.current_cred_num;
        let mut next = self.clone();
        next.current_cred_num += 1;
        next.accumulator = Accumulator::compute(&next.id, next.current_cred_num, &next.revoked)?;
        let delta = RevocationRegistryDelta {
            prev_accum: Some(self.accumulator.clone()),
            accum: next.accumulator.clone(),
            issued: BTreeSet::from([index]),
            revoked: BTreeSet::new(),
        };
        next.last_delta = Some(delta.clone());
        Ok((next, index, delta))
    }

    /// Revoke `index`.
    ///
    /// # Errors
    ///
    /// `IndexNotIssued` if `index` was never reserved; `AlreadyRevoked` if it
    /// is already revoked, leaving `self` as it was.
    pub fn revoke(&self, index: u32) -> Result<(Self, RevocationRegistryDelta), RegistryError> {
        if !self.is_issued(index) {
            return Err(RegistryError::IndexNotIssued {
                index,
                current: self.current_cred_num,
            });
        }
        if self.is_revoked(index) {
            return Err(RegistryError::AlreadyRevoked(index));
        }
        let mut next = self.clone();
        next.revoked.insert(index);
        next.accumulator = Accumulator::compute(&next.id, next.current_cred_num, &next.revoked)?;
        let delta = RevocationRegistryDelta {
            prev_accum: Some(self.accumulator.clone()),
            accum: next.accumulator.clone(),
            issued: BTreeSet::new(),
            revoked: BTreeSet::from([index]),
        };
        next.last_delta = Some(delta.clone());
        Ok((next, delta))
    }

    /// Check the registry invariants and that the accumulator matches.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.max_cred_num == 0 {
            return Err(RegistryError::CapacityInvalid(0));
        }
        if self.current_cred_num > self.max_cred_num {
            return Err(RegistryError::InvariantViolated(format!(
                "current_cred_num {} exceeds max_cred_num {}",
                self.current_cred_num, self.max_cred_num
            )));
        }
        if let Some(bad) = self.revoked.iter().find(|i| **i >= self.current_cred_num) {
            return Err(RegistryError::InvariantViolated(format!(
                "revoked index {bad} was never issued"
            )));
        }
        if self.id.cred_def_id() != &self.cred_def_id {
            return Err(RegistryError::InvariantViolated(format!(
                "registry {} does not belong to {}",
                self.id, self.cred_def_id
            )));
        }
        let expected = Accumulator::compute(&self.id, self.current_cred_num, &self.revoked)?;
        if expected != self.accumulator {
            return Err(RegistryError::InvariantViolated(
                "accumulator does not match issued/revoked state".into(),
            ));
        }
        Ok(())
    }

    /// Check that `self` may replace `prev` on the ledger: same registry and
    /// parameters, issued count and revoked set only grow.
    pub fn check_successor_of(&self, prev: &Self) -> Result<(), RegistryError> {
        self.validate()?;
        if self.id != prev.id
            || self.cred_def_id != prev.cred_def_id
            || self.max_cred_num != prev.max_cred_num
            || self.tails_location != prev.tails_location
            || self.tails_hash != prev.tails_hash
        {
            return Err(RegistryError::InvalidSuccessor(
                "immutable registry parameters changed".into(),
            ));
        }
        if self.current_cred_num < prev.current_cred_num {
            return Err(RegistryError::InvalidSuccessor(format!(
                "current_cred_num went backwards ({} -> {})",
                prev.current_cred_num, self.current_cred_num
            )));
        }
        if !prev.revoked.is_subset(&self.revoked) {
            return Err(RegistryError::InvalidSuccessor(
                "a revoked index was un-revoked".into(),
            ));
        }
        Ok(())
    }
}
