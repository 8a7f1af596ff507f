//! Errors for data-model construction and validation.

use thiserror::Error;
use vcl_core::{CanonicalizationError, ErrorKind, IdentifierError};

/// Structural errors in credential data.
#[derive(Error, Debug)]
pub enum VcError {
    /// An identifier could not be minted or parsed.
    #[error("identifier error: {0}")]
    Identifier(#[from] IdentifierError),

    /// Canonicalization of a hashed structure failed.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Structurally invalid input (empty names, duplicate attributes, bad nonce).
    #[error("validation failed: {0}")]
    Validation(String),
}

impl VcError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Canonicalization(_) => ErrorKind::Internal,
            Self::Identifier(_) | Self::Validation(_) => ErrorKind::Validation,
        }
    }
}
