//! # Error Types — Structured Error Hierarchy
//!
//! All errors use `thiserror` for derive-based `Display` and `Error`
//! implementations. Each downstream crate owns its own error enum; the
//! shared [`ErrorKind`] taxonomy lets callers decide how to react to a
//! failure without matching on every crate's variants.
//!
//! ## Taxonomy
//!
//! | Kind                       | Meaning                                   | Retry |
//! |----------------------------|-------------------------------------------|-------|
//! | `CapacityExhausted`        | revocation registry is full               | no    |
//! | `ProtocolMismatch`         | offer/request/credential binding violated | no    |
//! | `NotFound`                 | referenced ledger record absent           | no    |
//! | `LedgerConflict`           | optimistic-concurrency loss at commit     | yes, from a fresh offer |
//! | `CryptoVerificationFailed` | engine or signature rejection             | no    |
//! | `ChannelError`             | counterparty unreachable                  | no    |

use thiserror::Error;

/// Classification of protocol failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The revocation registry cannot produce more credentials.
    CapacityExhausted,
    /// A nonce, request, offer or credential binding was violated.
    ProtocolMismatch,
    /// A referenced schema, credential definition, registry or credential
    /// does not exist on the ledger.
    NotFound,
    /// A consumed ledger state was already consumed by another transaction.
    LedgerConflict,
    /// A cryptographic check failed in the engine or in signature verification.
    CryptoVerificationFailed,
    /// The counterparty channel failed.
    ChannelError,
    /// Structurally invalid input.
    Validation,
    /// Unexpected internal failure (serialization, invariant breach).
    Internal,
}

impl ErrorKind {
    /// Only ledger conflicts are safe to retry, and only from a fresh offer.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LedgerConflict)
    }

    /// Stable lowercase label, used as a metrics/log field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CapacityExhausted => "capacity_exhausted",
            Self::ProtocolMismatch => "protocol_mismatch",
            Self::NotFound => "not_found",
            Self::LedgerConflict => "ledger_conflict",
            Self::CryptoVerificationFailed => "crypto_verification_failed",
            Self::ChannelError => "channel_error",
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for the foundational layer.
#[derive(Error, Debug)]
pub enum VclError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Identifier could not be parsed or constructed.
    #[error("identifier error: {0}")]
    Identifier(#[from] IdentifierError),

    /// Schema or structural validation failure.
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl VclError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Canonicalization(_) | Self::Serialization(_) => ErrorKind::Internal,
            Self::Identifier(_) | Self::Validation(_) => ErrorKind::Validation,
        }
    }
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error in cryptographic operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key generation or parsing failed.
    #[error("key error: {0}")]
    KeyError(String),
}

/// Error parsing or constructing a ledger identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// The identifier does not have the expected number of segments.
    #[error("malformed {kind} identifier {value:?}: {reason}")]
    Malformed {
        /// Identifier kind ("schema", "cred_def", "rev_reg", "did").
        kind: &'static str,
        /// The offending input.
        value: String,
        /// What was wrong.
        reason: String,
    },

    /// The DID segment is not a valid unqualified DID.
    #[error("invalid DID {0:?}")]
    InvalidDid(String),

    /// The object-type marker segment is not the one expected.
    #[error("unknown marker {found:?}, expected {expected:?}")]
    UnknownMarker {
        /// Marker that was expected for this identifier kind.
        expected: &'static str,
        /// Marker found in the input.
        found: String,
    },

    /// The sequence number segment is not a positive integer.
    #[error("invalid sequence number {0:?}")]
    InvalidSequence(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_conflicts_are_retryable() {
        assert!(ErrorKind::LedgerConflict.is_retryable());
        for kind in [
            ErrorKind::CapacityExhausted,
            ErrorKind::ProtocolMismatch,
            ErrorKind::NotFound,
            ErrorKind::CryptoVerificationFailed,
            ErrorKind::ChannelError,
            ErrorKind::Validation,
            ErrorKind::Internal,
        ] {
            assert!(!kind.is_retryable(), "{kind} must not be retryable");
        }
    }

    #[test]
    fn test_identifier_error_is_validation() {
        let err = VclError::from(IdentifierError::InvalidDid("x".into()));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::CapacityExhausted.to_string(), "capacity_exhausted");
        assert_eq!(ErrorKind::LedgerConflict.to_string(), "ledger_conflict");
    }
}
