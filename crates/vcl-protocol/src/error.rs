//! Protocol errors. Each enum classifies itself into `vcl_core::ErrorKind`.

use thiserror::Error;
use vcl_core::{CredentialId, ErrorKind, RevocationRegistryId};
use vcl_ledger::LedgerError;
use vcl_state::SessionError;
use vcl_vc::{RegistryError, VcError};
use vcl_zkp::EngineError;

/// Message transport failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The counterparty hung up.
    #[error("channel closed")]
    Closed,
}

impl ChannelError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ChannelError
    }
}

/// Publication and lookup failures.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// No such object on the ledger.
    #[error("not found: {0}")]
    NotFound(String),

    /// The object is not publishable.
    #[error("invalid: {0}")]
    Invalid(String),

    /// Registry construction failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Data model validation failed.
    #[error(transparent)]
    Model(#[from] VcError),

    /// Key or definition generation failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The ledger rejected a publication or a read failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl CatalogError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Invalid(_) => ErrorKind::Validation,
            Self::Registry(e) => e.kind(),
            Self::Model(e) => e.kind(),
            Self::Engine(e) => e.kind(),
            Self::Ledger(e) => e.kind(),
        }
    }
}

/// Why an issuance exchange ended without a committed credential.
#[derive(Error, Debug)]
pub enum IssuanceError {
    /// The request answers a different offer.
    #[error("stale offer: expected {expected}, got {found}")]
    StaleOffer {
        /// What the offer carries.
        expected: String,
        /// What the request carries.
        found: String,
    },

    /// The registry has no capacity left. No index was reserved.
    #[error("credential maximum reached for {rev_reg_id} (max {max})")]
    CredentialMaximumReached {
        /// Full registry.
        rev_reg_id: RevocationRegistryId,
        /// Its capacity.
        max: u32,
    },

    /// The proposed credential or transaction does not match what was
    /// requested.
    #[error("credential mismatch: {0}")]
    CredentialMismatch(String),

    /// A message arrived out of order.
    #[error("unexpected message: expected {expected}, got {found}")]
    UnexpectedMessage {
        /// Message the session was waiting for.
        expected: &'static str,
        /// Message that arrived.
        found: &'static str,
    },

    /// The counterparty aborted.
    #[error("aborted by counterparty: {0}")]
    Aborted(String),

    /// A definition, key or registry the exchange needs is missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Registry reservation failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Engine failure, unchanged.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Ledger failure. `NotarizationFailed` means another issuance won the
    /// registry head; retry from a fresh offer.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Transport failure.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl IssuanceError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StaleOffer { .. }
            | Self::CredentialMismatch(_)
            | Self::UnexpectedMessage { .. }
            | Self::Aborted(_) => ErrorKind::ProtocolMismatch,
            Self::CredentialMaximumReached { .. } => ErrorKind::CapacityExhausted,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Registry(e) => e.kind(),
            Self::Engine(e) => e.kind(),
            Self::Ledger(e) => e.kind(),
            Self::Channel(e) => e.kind(),
        }
    }

    /// Only ledger conflicts are worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Whether the counterparty should be told with an `Abort`.
    pub(crate) fn notifies_counterparty(&self) -> bool {
        !matches!(self, Self::Channel(_) | Self::Aborted(_))
    }
}

impl From<SessionError> for IssuanceError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::StaleOffer { expected, found } => Self::StaleOffer { expected, found },
            SessionError::CredentialMismatch(msg) => Self::CredentialMismatch(msg),
            SessionError::Ledger(e) => Self::Ledger(e),
        }
    }
}

impl From<CatalogError> for IssuanceError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound(what) => Self::NotFound(what),
            CatalogError::Invalid(msg) => Self::CredentialMismatch(msg),
            CatalogError::Registry(e) => Self::Registry(e),
            CatalogError::Model(e) => Self::CredentialMismatch(e.to_string()),
            CatalogError::Engine(e) => Self::Engine(e),
            CatalogError::Ledger(e) => Self::Ledger(e),
        }
    }
}

/// Revocation failures.
#[derive(Error, Debug)]
pub enum RevocationError {
    /// No credential record with this id.
    #[error("credential {0} not found")]
    NotFound(CredentialId),

    /// The credential was issued without a registry index.
    #[error("credential {0} is not revocable")]
    CredentialNotRevocable(CredentialId),

    /// Registry refused; `AlreadyRevoked` surfaces here unchanged.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Ledger failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Registry lookup failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl RevocationError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::CredentialNotRevocable(_) => ErrorKind::Validation,
            Self::Registry(e) => e.kind(),
            Self::Ledger(e) => e.kind(),
            Self::Catalog(e) => e.kind(),
        }
    }
}

/// Proof creation failures.
#[derive(Error, Debug)]
pub enum ProveError {
    /// A wallet credential or ledger object is missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Engine failure, including unsatisfied predicates.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Ledger or catalog lookup failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Ledger read failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ProveError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Engine(e) => e.kind(),
            Self::Catalog(e) => e.kind(),
            Self::Ledger(e) => e.kind(),
        }
    }
}

/// Verification could not reach a verdict. An invalid proof is `Ok(false)`,
/// never an error.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// A schema, definition or registry the proof names is not published.
    #[error("not found: {0}")]
    NotFound(String),

    /// Ledger read failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Engine failure.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl VerifyError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Ledger(e) => e.kind(),
            Self::Engine(e) => e.kind(),
        }
    }
}

impl From<CatalogError> for VerifyError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::Ledger(e) => Self::Ledger(e),
            CatalogError::Engine(e) => Self::Engine(e),
            other => Self::NotFound(other.to_string()),
        }
    }
}
