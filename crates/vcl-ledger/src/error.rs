//! Ledger errors.

use thiserror::Error;
use vcl_core::{CanonicalizationError, ErrorKind};

/// Failures of ledger reads and commits.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// A produced state violates its contract, or a required signature is
    /// missing or invalid.
    #[error("transaction verification failed: {0}")]
    VerificationFailed(String),

    /// A consumed or referenced state is no longer the head version.
    #[error("notarization failed: {0}")]
    NotarizationFailed(String),

    /// A consumed or referenced key does not exist.
    #[error("ledger state not found: {0}")]
    NotFound(String),

    /// A state could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The transaction body could not be canonicalized for signing.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

impl LedgerError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::VerificationFailed(_) => ErrorKind::Validation,
            Self::NotarizationFailed(_) => ErrorKind::LedgerConflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Serialization(_) | Self::Canonicalization(_) => ErrorKind::Internal,
        }
    }

    /// Only notarization conflicts are retryable.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
