//! # Issuer Session
//!
//! ```text
//! offer() ──▶ Offered ──receive_request()──▶ Requested ──propose()──▶ Issued
//!                                                                       │
//!                                          receive_acknowledgement() ◀──┘
//!                                                     │
//!                                                     ▼
//!                                               Acknowledged ──finalize()──▶ (commit)
//! ```
//!
//! Every stage can `abort()`, which consumes the session and returns its log.

use vcl_crypto::{Ed25519Signature, Party, Signer};
use vcl_ledger::{Commit, LedgerState, Transaction, TransactionBody};
use vcl_vc::{CredentialDefinition, CredentialOffer, CredentialRecord, CredentialRequest};

use crate::session::{
    mismatch, private::Sealed, record, IssuanceState, IssuanceTransition, SessionError,
    SessionKey, Stage,
};

// ─── Stages ──────────────────────────────────────────────────────────

/// Offer sent; waiting for a request.
#[derive(Debug, Clone)]
pub struct Offered;

/// Request accepted from `holder`.
#[derive(Debug, Clone)]
pub struct Requested {
    holder: Party,
    request: CredentialRequest,
}

/// Credential and issuer-signed transaction sent to the holder.
#[derive(Debug, Clone)]
pub struct Issued {
    holder: Party,
    record: CredentialRecord,
    transaction: Transaction,
}

/// Holder co-signed; the transaction is ready to commit.
#[derive(Debug, Clone)]
pub struct Acknowledged {
    record: CredentialRecord,
    transaction: Transaction,
}

impl Sealed for Offered {}
impl Sealed for Requested {}
impl Sealed for Issued {}
impl Sealed for Acknowledged {}

impl Stage for Offered {
    const STATE: IssuanceState = IssuanceState::Offered;
}
impl Stage for Requested {
    const STATE: IssuanceState = IssuanceState::Requested;
}
impl Stage for Issued {
    const STATE: IssuanceState = IssuanceState::Issued;
}
impl Stage for Acknowledged {
    const STATE: IssuanceState = IssuanceState::Acknowledged;
}

// ─── Session ─────────────────────────────────────────────────────────

/// Issuer side of one issuance exchange.
#[derive(Debug, Clone)]
pub struct IssuerSession<S: Stage> {
    issuer: Party,
    cred_def: CredentialDefinition,
    offer: CredentialOffer,
    log: Vec<IssuanceTransition>,
    stage: S,
}

impl<S: Stage> IssuerSession<S> {
    /// Current stage.
    pub fn state(&self) -> IssuanceState {
        S::STATE
    }

    /// The issuing party.
    pub fn issuer(&self) -> &Party {
        &self.issuer
    }

    /// Definition being issued under.
    pub fn cred_def(&self) -> &CredentialDefinition {
        &self.cred_def
    }

    /// The offer this session was opened with.
    pub fn offer(&self) -> &CredentialOffer {
        &self.offer
    }

    /// Transition log so far.
    pub fn log(&self) -> &[IssuanceTransition] {
        &self.log
    }

    /// Abandon the exchange.
    pub fn abort(mut self, reason: impl Into<String>) -> Vec<IssuanceTransition> {
        record(
            &mut self.log,
            S::STATE,
            IssuanceState::Aborted,
            Some(reason.into()),
        );
        self.log
    }

    fn advance<T: Stage>(mut self, stage: T, reason: Option<String>) -> IssuerSession<T> {
        record(&mut self.log, S::STATE, T::STATE, reason);
        IssuerSession {
            issuer: self.issuer,
            cred_def: self.cred_def,
            offer: self.offer,
            log: self.log,
            stage,
        }
    }

    fn key_with(&self, holder: Option<&Party>) -> SessionKey {
        SessionKey {
            issuer_did: self.issuer.did.clone(),
            holder_did: holder.map(|p| p.did.clone()),
            nonce: self.offer.nonce.clone(),
        }
    }
}

impl IssuerSession<Offered> {
    /// Open a session for an engine-created `offer` under `cred_def`.
    pub fn start(
        issuer: Party,
        cred_def: CredentialDefinition,
        offer: CredentialOffer,
    ) -> Result<Self, SessionError> {
        if issuer.did != cred_def.issuer_did {
            return Err(mismatch(format!(
                "{} does not own {}",
                issuer.did, cred_def.id
            )));
        }
        if offer.cred_def_id != cred_def.id || offer.schema_id != cred_def.schema_id {
            return Err(mismatch(format!("offer is not for {}", cred_def.id)));
        }
        Ok(Self {
            issuer,
            cred_def,
            offer,
            log: Vec::new(),
            stage: Offered,
        })
    }

    /// Session key; the holder is not yet known.
    pub fn key(&self) -> SessionKey {
        self.key_with(None)
    }

    /// Accept `request` from `holder` if it answers this offer.
    ///
    /// The engine's check of the blinded secret correctness proof happens
    /// before this call.
    pub fn receive_request(
        self,
        holder: Party,
        request: CredentialRequest,
    ) -> Result<IssuerSession<Requested>, SessionError> {
        if request.nonce != self.offer.nonce {
            return Err(SessionError::StaleOffer {
                expected: format!("nonce {}", self.offer.nonce),
                found: format!("nonce {}", request.nonce),
            });
        }
        if request.cred_def_id != self.offer.cred_def_id {
            return Err(SessionError::StaleOffer {
                expected: self.offer.cred_def_id.to_string(),
                found: request.cred_def_id.to_string(),
            });
        }
        if request.prover_did != holder.did {
            return Err(mismatch(format!(
                "request is from {}, sent by {}",
                request.prover_did, holder.did
            )));
        }
        Ok(self.advance(Requested { holder, request }, None))
    }
}

impl IssuerSession<Requested> {
    /// Session key.
    pub fn key(&self) -> SessionKey {
        self.key_with(Some(&self.stage.holder))
    }

    /// The requesting party.
    pub fn holder(&self) -> &Party {
        &self.stage.holder
    }

    /// The accepted request.
    pub fn request(&self) -> &CredentialRequest {
        &self.stage.request
    }

    /// Sign the issuance transaction that commits `record`.
    ///
    /// `body` must produce `record`, name the issuer and holder as signers,
    /// and is signed here by `signer`, who must be the issuer.
    pub fn propose(
        self,
        record: CredentialRecord,
        body: TransactionBody,
        signer: &dyn Signer,
    ) -> Result<IssuerSession<Issued>, SessionError> {
        if signer.party() != self.issuer {
            return Err(mismatch("proposal must be signed by the issuer"));
        }
        if record.holder_did != self.stage.holder.did || record.issuer_did != self.issuer.did {
            return Err(mismatch("record names the wrong parties"));
        }
        if !body
            .produced
            .iter()
            .any(|s| matches!(s, LedgerState::Credential(r) if *r == record))
        {
            return Err(mismatch("transaction does not produce the credential"));
        }
        if !body.signers.contains(&self.stage.holder) || !body.signers.contains(&self.issuer) {
            return Err(mismatch("issuer and holder must both sign"));
        }
        let transaction = Transaction::new(body).signed_by(signer)?;
        let holder = self.stage.holder.clone();
        Ok(self.advance(
            Issued {
                holder,
                record,
                transaction,
            },
            None,
        ))
    }
}

impl IssuerSession<Issued> {
    /// Session key.
    pub fn key(&self) -> SessionKey {
        self.key_with(Some(&self.stage.holder))
    }

    /// The proposed record.
    pub fn record(&self) -> &CredentialRecord {
        &self.stage.record
    }

    /// The issuer-signed transaction.
    pub fn transaction(&self) -> &Transaction {
        &self.stage.transaction
    }

    /// Attach the holder's signature, which must verify.
    pub fn receive_acknowledgement(
        self,
        signature: Ed25519Signature,
    ) -> Result<IssuerSession<Acknowledged>, SessionError> {
        let Issued {
            holder,
            record,
            mut transaction,
        } = self.stage.clone();
        transaction.add_signature(holder.did.clone(), signature);
        transaction
            .verify_signature_of(&holder)
            .map_err(|e| mismatch(e.to_string()))?;
        Ok(self.advance(
            Acknowledged {
                record,
                transaction,
            },
            None,
        ))
    }
}

impl IssuerSession<Acknowledged> {
    /// The record to commit.
    pub fn record(&self) -> &CredentialRecord {
        &self.stage.record
    }

    /// The fully signed transaction, for the ledger.
    pub fn transaction(&self) -> &Transaction {
        &self.stage.transaction
    }

    /// Close the session once `commit` is known. Returns the committed
    /// record and the full log.
    pub fn finalize(
        mut self,
        commit: &Commit,
    ) -> Result<(CredentialRecord, Vec<IssuanceTransition>), SessionError> {
        if commit.tx_id != self.stage.transaction.id()? {
            return Err(mismatch("commit is for a different transaction"));
        }
        record(
            &mut self.log,
            IssuanceState::Acknowledged,
            IssuanceState::Finalized,
            Some(format!("seq_no {}", commit.seq_no)),
        );
        Ok((self.stage.record, self.log))
    }
}
