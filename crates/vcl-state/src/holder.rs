//! # Holder Session
//!
//! ```text
//! receive_offer() ──▶ Offered ──request()──▶ Requested ──review_proposal()──▶ Issued
//!                                                                              │
//!                                                         acknowledge() ◀──────┘
//!                                                               │
//!                                                               ▼
//!                                                         Acknowledged ──finalize()──▶ credential
//! ```
//!
//! The holder keeps the credential only after `finalize` sees the commit of
//! the exact transaction it co-signed.

use vcl_crypto::{Ed25519Signature, Party, Signer};
use vcl_ledger::{Commit, LedgerKey, Transaction};
use vcl_vc::{
    CredentialDefinition, CredentialOffer, CredentialRecord, CredentialRequest, CredentialStatus,
    CredentialValues,
};

use crate::session::{
    mismatch, private::Sealed, record, IssuanceState, IssuanceTransition, SessionError,
    SessionKey, Stage,
};

// ─── Stages ──────────────────────────────────────────────────────────

/// Offer received and accepted for consideration.
#[derive(Debug, Clone)]
pub struct Offered;

/// Request sent.
#[derive(Debug, Clone)]
pub struct Requested {
    request: CredentialRequest,
}

/// Proposal reviewed and found to match.
#[derive(Debug, Clone)]
pub struct Issued {
    record: CredentialRecord,
    transaction: Transaction,
}

/// Transaction co-signed; waiting for the commit.
#[derive(Debug, Clone)]
pub struct Acknowledged {
    record: CredentialRecord,
    tx_id: String,
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

/// Holder side of one issuance exchange.
#[derive(Debug, Clone)]
pub struct HolderSession<S: Stage> {
    holder: Party,
    cred_def: CredentialDefinition,
    offer: CredentialOffer,
    log: Vec<IssuanceTransition>,
    stage: S,
}

impl<S: Stage> HolderSession<S> {
    /// Current stage.
    pub fn state(&self) -> IssuanceState {
        S::STATE
    }

    /// The holding party.
    pub fn holder(&self) -> &Party {
        &self.holder
    }

    /// Definition the offer is for.
    pub fn cred_def(&self) -> &CredentialDefinition {
        &self.cred_def
    }

    /// The offer.
    pub fn offer(&self) -> &CredentialOffer {
        &self.offer
    }

    /// Session key.
    pub fn key(&self) -> SessionKey {
        SessionKey {
            issuer_did: self.cred_def.issuer_did.clone(),
            holder_did: Some(self.holder.did.clone()),
            nonce: self.offer.nonce.clone(),
        }
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

    fn advance<T: Stage>(mut self, stage: T) -> HolderSession<T> {
        record(&mut self.log, S::STATE, T::STATE, None);
        HolderSession {
            holder: self.holder,
            cred_def: self.cred_def,
            offer: self.offer,
            log: self.log,
            stage,
        }
    }
}

impl HolderSession<Offered> {
    /// Open a session for `offer`, checked against the published `cred_def`.
    pub fn receive_offer(
        holder: Party,
        cred_def: CredentialDefinition,
        offer: CredentialOffer,
    ) -> Result<Self, SessionError> {
        if offer.cred_def_id != cred_def.id || offer.schema_id != cred_def.schema_id {
            return Err(mismatch(format!(
                "offer for {} does not match published {}",
                offer.cred_def_id, cred_def.id
            )));
        }
        Ok(Self {
            holder,
            cred_def,
            offer,
            log: Vec::new(),
            stage: Offered,
        })
    }

    /// Record the engine-built `request` as sent.
    pub fn request(self, request: CredentialRequest) -> Result<HolderSession<Requested>, SessionError> {
        if request.nonce != self.offer.nonce || request.cred_def_id != self.offer.cred_def_id {
            return Err(SessionError::StaleOffer {
                expected: format!("{}#{}", self.offer.cred_def_id, self.offer.nonce),
                found: format!("{}#{}", request.cred_def_id, request.nonce),
            });
        }
        if request.prover_did != self.holder.did {
            return Err(mismatch("request names another prover"));
        }
        Ok(self.advance(Requested { request }))
    }
}

impl HolderSession<Requested> {
    /// The request that was sent.
    pub fn request(&self) -> &CredentialRequest {
        &self.stage.request
    }

    /// Check the issuer's proposal against the offer and request.
    ///
    /// `expected` are the attribute values the holder agreed to, if it
    /// checks them. The engine's credential signature check runs after this
    /// call succeeds.
    pub fn review_proposal(
        self,
        record: CredentialRecord,
        transaction: Transaction,
        expected: Option<&CredentialValues>,
    ) -> Result<HolderSession<Issued>, SessionError> {
        let credential = &record.credential;
        if credential.cred_def_id != self.offer.cred_def_id
            || credential.schema_id != self.offer.schema_id
        {
            return Err(mismatch(format!(
                "credential is under {}, offer was for {}",
                credential.cred_def_id, self.offer.cred_def_id
            )));
        }
        if record.holder_did != self.holder.did || record.issuer_did != self.cred_def.issuer_did {
            return Err(mismatch("record names the wrong parties"));
        }
        if record.status != CredentialStatus::Issued {
            return Err(mismatch("proposed record is not ISSUED"));
        }
        if let Some(values) = expected {
            if &credential.values != values {
                return Err(mismatch("attribute values differ from the agreed ones"));
            }
        }
        if transaction.produced_credential() != Some(&record) {
            return Err(mismatch(
                "transaction does not produce the proposed credential",
            ));
        }
        if !transaction.body.signers.contains(&self.holder) {
            return Err(mismatch("holder is not a signer of the transaction"));
        }
        let cred_def_key = LedgerKey::cred_def(&self.cred_def.id);
        if !transaction
            .body
            .references
            .iter()
            .any(|r| r.key == cred_def_key)
        {
            return Err(mismatch(
                "transaction does not reference the credential definition",
            ));
        }
        let issuer = transaction
            .body
            .signers
            .iter()
            .find(|p| p.did == self.cred_def.issuer_did)
            .ok_or_else(|| mismatch("issuer is not a signer of the transaction"))?;
        transaction
            .verify_signature_of(issuer)
            .map_err(|e| mismatch(e.to_string()))?;
        Ok(self.advance(Issued {
            record,
            transaction,
        }))
    }
}

impl HolderSession<Issued> {
    /// The proposed record.
    pub fn record(&self) -> &CredentialRecord {
        &self.stage.record
    }

    /// Co-sign. Returns the signature to send back to the issuer.
    pub fn acknowledge(
        self,
        signer: &dyn Signer,
    ) -> Result<(HolderSession<Acknowledged>, Ed25519Signature), SessionError> {
        if signer.party() != self.holder {
            return Err(mismatch("acknowledgement must be signed by the holder"));
        }
        let transaction = &self.stage.transaction;
        let signature = signer.sign(&transaction.body.signing_bytes()?);
        let tx_id = transaction.id()?;
        let record = self.stage.record.clone();
        Ok((self.advance(Acknowledged { record, tx_id }), signature))
    }
}

impl HolderSession<Acknowledged> {
    /// Id of the co-signed transaction.
    pub fn tx_id(&self) -> &str {
        &self.stage.tx_id
    }

    /// The acknowledged record.
    pub fn record(&self) -> &CredentialRecord {
        &self.stage.record
    }

    /// Accept the credential once its transaction is committed.
    pub fn finalize(
        mut self,
        commit: &Commit,
    ) -> Result<(CredentialRecord, Vec<IssuanceTransition>), SessionError> {
        if commit.tx_id != self.stage.tx_id {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use vcl_vc::AttributeValue;

    fn requested(fx: &Fixture) -> HolderSession<Requested> {
        HolderSession::receive_offer(fx.holder.party(), fx.cred_def.clone(), fx.offer.clone())
            .unwrap()
            .request(fx.request.clone())
            .unwrap()
    }

    fn issuer_signed(fx: &Fixture) -> (CredentialRecord, Transaction) {
        let (record, body) = fx.proposal();
        let tx = Transaction::new(body).signed_by(&fx.issuer).unwrap();
        (record, tx)
    }

    #[test]
    fn test_full_holder_walk() {
        let fx = Fixture::new();
        let session = requested(&fx);
        let (record, tx) = issuer_signed(&fx);
        let session = session
            .review_proposal(record.clone(), tx.clone(), Some(&fx.values))
            .unwrap();
        let (session, signature) = session.acknowledge(&fx.holder).unwrap();
        assert_eq!(session.state(), IssuanceState::Acknowledged);

        let mut tx = tx;
        tx.add_signature(fx.holder.party().did, signature);
        tx.verify_signatures().unwrap();

        let (stored, log) = session.finalize(&fx.commit_for(&tx)).unwrap();
        assert_eq!(stored, record);
        assert_eq!(log.last().map(|t| t.to_state), Some(IssuanceState::Finalized));
    }

    #[test]
    fn test_offer_for_unpublished_cred_def_rejected() {
        let fx = Fixture::new();
        let mut offer = fx.offer.clone();
        offer.cred_def_id = fx.other_cred_def_id();
        assert!(HolderSession::receive_offer(fx.holder.party(), fx.cred_def.clone(), offer).is_err());
    }

    #[test]
    fn test_wrong_values_are_a_mismatch() {
        let fx = Fixture::new();
        let (record, tx) = issuer_signed(&fx);
        let mut agreed = fx.values.clone();
        agreed.insert("age".into(), AttributeValue::new("99"));
        let err = requested(&fx)
            .review_proposal(record, tx, Some(&agreed))
            .unwrap_err();
        assert!(err.to_string().contains("agreed"));
    }

    #[test]
    fn test_transaction_must_carry_the_proposed_record() {
        let fx = Fixture::new();
        let (record, _) = issuer_signed(&fx);
        let (_, other_tx) = issuer_signed(&fx);
        let err = requested(&fx)
            .review_proposal(record, other_tx, None)
            .unwrap_err();
        assert!(matches!(err, SessionError::CredentialMismatch(_)));
    }

    #[test]
    fn test_unsigned_proposal_rejected() {
        let fx = Fixture::new();
        let (record, body) = fx.proposal();
        let err = requested(&fx)
            .review_proposal(record, Transaction::new(body), None)
            .unwrap_err();
        assert!(err.to_string().contains("missing signature"));
    }

    #[test]
    fn test_commit_of_other_transaction_rejected() {
        let fx = Fixture::new();
        let (record, tx) = issuer_signed(&fx);
        let (session, _) = requested(&fx)
            .review_proposal(record, tx, None)
            .unwrap()
            .acknowledge(&fx.holder)
            .unwrap();
        let (_, other) = issuer_signed(&fx);
        assert!(session.finalize(&fx.commit_for(&other)).is_err());
    }
}
