//! # Engine Trait
//!
//! The issuance and proof protocols never touch credential cryptography
//! directly; they call an [`AnoncredsEngine`]. Methods are synchronous and
//! side-effect free. Implementations must be `Send + Sync` so one engine can
//! serve concurrent sessions.

use std::collections::BTreeMap;

use thiserror::Error;
use vcl_core::{
    CanonicalizationError, CredentialDefinitionId, CredentialId, Did, ErrorKind,
    RevocationRegistryId, SchemaId, Timestamp,
};
use vcl_vc::{
    Credential, CredentialDefinition, CredentialOffer, CredentialPrivateKey, CredentialRequest,
    CredentialValues, MasterSecret, Proof, ProofRequest, RequestedCredentials,
    RevocationRegistryDefinition, Schema,
};

/// Engine failures. Propagated unchanged by the protocols.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Input is not shaped the way this engine expects.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// The credential does not satisfy a requested predicate, so no proof
    /// can be produced.
    #[error("predicate {referent} on {attribute:?} is not satisfied")]
    PredicateNotSatisfied {
        /// Predicate referent.
        referent: String,
        /// Attribute name.
        attribute: String,
    },

    /// The credential's index is revoked in the registry state it must be
    /// proven against.
    #[error("credential index {index} is revoked in {rev_reg_id}")]
    CredentialRevoked {
        /// Registry.
        rev_reg_id: RevocationRegistryId,
        /// Index.
        index: u32,
    },

    /// The blinded link secret or its correctness proof is invalid.
    #[error("invalid credential request: {0}")]
    InvalidCredentialRequest(String),

    /// The credential signature does not verify.
    #[error("invalid credential signature: {0}")]
    InvalidCredentialSignature(String),

    /// A schema, definition or registry state needed for the operation was
    /// not supplied.
    #[error("missing public data: {0}")]
    MissingPublicData(String),

    /// Hashing input could not be canonicalized.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

impl EngineError {
    /// Taxonomy classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Canonicalization(_) => ErrorKind::Internal,
            _ => ErrorKind::CryptoVerificationFailed,
        }
    }
}

/// Ledger-published data a proof is created or verified against.
#[derive(Debug, Clone, Default)]
pub struct ProofPublicData {
    /// Schemas by id.
    pub schemas: BTreeMap<SchemaId, Schema>,
    /// Credential definitions by id.
    pub cred_defs: BTreeMap<CredentialDefinitionId, CredentialDefinition>,
    /// Registry state in force at a timestamp.
    pub rev_reg_states: BTreeMap<(RevocationRegistryId, Timestamp), RevocationRegistryDefinition>,
}

impl ProofPublicData {
    /// Credential definition, or `MissingPublicData`.
    pub fn cred_def(&self, id: &CredentialDefinitionId) -> Result<&CredentialDefinition, EngineError> {
        self.cred_defs
            .get(id)
            .ok_or_else(|| EngineError::MissingPublicData(format!("credential definition {id}")))
    }

    /// Registry state at `timestamp`, or `MissingPublicData`.
    pub fn rev_reg_state(
        &self,
        id: &RevocationRegistryId,
        timestamp: Timestamp,
    ) -> Result<&RevocationRegistryDefinition, EngineError> {
        self.rev_reg_states
            .get(&(id.clone(), timestamp))
            .ok_or_else(|| EngineError::MissingPublicData(format!("registry {id} at {timestamp}")))
    }
}

/// Anonymous-credential cryptography.
pub trait AnoncredsEngine: Send + Sync {
    /// Generate key material for `schema` and mint the definition.
    ///
    /// The schema must carry its ledger sequence number.
    fn create_credential_definition(
        &self,
        issuer_did: &Did,
        schema: &Schema,
        tag: &str,
        supports_revocation: bool,
    ) -> Result<(CredentialDefinition, CredentialPrivateKey), EngineError>;

    /// Fresh offer with a new nonce.
    fn create_credential_offer(
        &self,
        cred_def: &CredentialDefinition,
    ) -> Result<CredentialOffer, EngineError>;

    /// Holder side: blind the link secret and bind the request to `offer`.
    fn create_credential_request(
        &self,
        prover_did: &Did,
        cred_def: &CredentialDefinition,
        offer: &CredentialOffer,
        master_secret: &MasterSecret,
    ) -> Result<CredentialRequest, EngineError>;

    /// Issuer side: check the blinded secret correctness proof against the
    /// offer nonce.
    fn verify_credential_request(
        &self,
        cred_def: &CredentialDefinition,
        offer: &CredentialOffer,
        request: &CredentialRequest,
    ) -> Result<(), EngineError>;

    /// Sign `values` for the requester. `revocation` is the registry and the
    /// index reserved for this credential.
    fn issue_credential(
        &self,
        cred_def: &CredentialDefinition,
        private_key: &CredentialPrivateKey,
        offer: &CredentialOffer,
        request: &CredentialRequest,
        values: &CredentialValues,
        revocation: Option<(&RevocationRegistryId, u32)>,
    ) -> Result<Credential, EngineError>;

    /// Holder side: check that `credential` is signed under `cred_def` and
    /// bound to this holder's link secret.
    fn process_credential(
        &self,
        credential: &Credential,
        cred_def: &CredentialDefinition,
        master_secret: &MasterSecret,
    ) -> Result<(), EngineError>;

    /// Build a proof for `request` from wallet credentials.
    fn create_proof(
        &self,
        request: &ProofRequest,
        requested: &RequestedCredentials,
        credentials: &BTreeMap<CredentialId, Credential>,
        master_secret: &MasterSecret,
        public: &ProofPublicData,
    ) -> Result<Proof, EngineError>;

    /// Check a proof against public data. `Ok(false)` means the proof is
    /// well-formed but invalid.
    fn verify_proof(
        &self,
        request: &ProofRequest,
        proof: &Proof,
        public: &ProofPublicData,
    ) -> Result<bool, EngineError>;
}
