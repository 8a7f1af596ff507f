//! Shared session vocabulary: runtime state, transition records, errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vcl_core::{Did, ErrorKind, Timestamp};
use vcl_ledger::LedgerError;

// ─── Runtime state ───────────────────────────────────────────────────

/// Runtime name of an issuance stage, for logs and records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssuanceState {
    /// Offer sent or received.
    Offered,
    /// Credential request sent or received.
    Requested,
    /// Credential and transaction proposed.
    Issued,
    /// Holder co-signed the transaction.
    Acknowledged,
    /// Transaction committed to the ledger (terminal).
    Finalized,
    /// Exchange abandoned (terminal).
    Aborted,
}

impl IssuanceState {
    /// Canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Offered => "OFFERED",
            Self::Requested => "REQUESTED",
            Self::Issued => "ISSUED",
            Self::Acknowledged => "ACKNOWLEDGED",
            Self::Finalized => "FINALIZED",
            Self::Aborted => "ABORTED",
        }
    }

    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized | Self::Aborted)
    }

    /// Whether `self → next` is an edge of the handshake. Any live state may
    /// abort.
    pub fn can_transition_to(&self, next: IssuanceState) -> bool {
        use IssuanceState::*;
        matches!(
            (self, next),
            (Offered, Requested)
                | (Requested, Issued)
                | (Issued, Acknowledged)
                | (Acknowledged, Finalized)
                | (Offered | Requested | Issued | Acknowledged, Aborted)
        )
    }
}

impl std::fmt::Display for IssuanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One recorded state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceTransition {
    /// State before.
    pub from_state: IssuanceState,
    /// State after.
    pub to_state: IssuanceState,
    /// When it happened.
    pub timestamp: Timestamp,
    /// Why, when there is more to say than the edge itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ─── Stage marker ────────────────────────────────────────────────────

pub(crate) mod private {
    pub trait Sealed {}
}

/// Implemented by the issuer and holder stage types only.
pub trait Stage: private::Sealed + std::fmt::Debug {
    /// Runtime name of this stage.
    const STATE: IssuanceState;
}

/// Identifies one exchange: `(issuer, holder, offer nonce)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    /// Issuer DID.
    pub issuer_did: Did,
    /// Holder DID, once known.
    pub holder_did: Option<Did>,
    /// Offer nonce.
    pub nonce: String,
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.holder_did {
            Some(holder) => write!(f, "{}→{}#{}", self.issuer_did, holder, self.nonce),
            None => write!(f, "{}→?#{}", self.issuer_did, self.nonce),
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// A message that does not fit the session it arrived in.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The request answers a different offer.
    #[error("stale offer: expected {expected}, got {found}")]
    StaleOffer {
        /// What the offer carries.
        expected: String,
        /// What the request carries.
        found: String,
    },

    /// The proposed credential or transaction is not what was requested.
    #[error("credential mismatch: {0}")]
    CredentialMismatch(String),

    /// Signing or verifying the transaction failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl SessionError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StaleOffer { .. } | Self::CredentialMismatch(_) => ErrorKind::ProtocolMismatch,
            Self::Ledger(e) => e.kind(),
        }
    }
}

pub(crate) fn mismatch(msg: impl Into<String>) -> SessionError {
    SessionError::CredentialMismatch(msg.into())
}

pub(crate) fn record(
    log: &mut Vec<IssuanceTransition>,
    from: IssuanceState,
    to: IssuanceState,
    reason: Option<String>,
) {
    log.push(IssuanceTransition {
        from_state: from,
        to_state: to,
        timestamp: Timestamp::now(),
        reason,
    });
}
