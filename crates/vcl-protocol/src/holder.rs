//! # Holder
//!
//! Holds the link secret and the wallet, drives the holder side of the
//! handshake, and answers proof requests through a [`Prover`].

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use vcl_core::CredentialId;
use vcl_crypto::{Party, Signer};
use vcl_ledger::{Commit, LedgerKey};
use vcl_state::HolderSession;
use vcl_vc::{
    Credential, CredentialRecord, CredentialValues, MasterSecret, Proof, ProofRequest,
    RequestedCredentials,
};
use vcl_zkp::AnoncredsEngine;

use crate::catalog::CredentialDefinitionCatalog;
use crate::channel::Channel;
use crate::error::{IssuanceError, ProveError};
use crate::issuer::{unexpected, IssuanceOutcome};
use crate::message::IssuanceMessage;
use crate::prover::Prover;

/// The receiving party.
pub struct Holder {
    signer: Arc<dyn Signer>,
    engine: Arc<dyn AnoncredsEngine>,
    catalog: Arc<CredentialDefinitionCatalog>,
    master_secret: MasterSecret,
    wallet: DashMap<CredentialId, CredentialRecord>,
}

impl std::fmt::Debug for Holder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Holder")
            .field("party", &self.signer.party())
            .field("credentials", &self.wallet.len())
            .finish_non_exhaustive()
    }
}

impl Holder {
    /// Holder acting as `signer`, with a fresh link secret.
    pub fn new(
        signer: Arc<dyn Signer>,
        engine: Arc<dyn AnoncredsEngine>,
        catalog: Arc<CredentialDefinitionCatalog>,
    ) -> Self {
        Self::with_master_secret(signer, engine, catalog, MasterSecret::generate())
    }

    /// Holder with a known link secret.
    pub fn with_master_secret(
        signer: Arc<dyn Signer>,
        engine: Arc<dyn AnoncredsEngine>,
        catalog: Arc<CredentialDefinitionCatalog>,
        master_secret: MasterSecret,
    ) -> Self {
        Self {
            signer,
            engine,
            catalog,
            master_secret,
            wallet: DashMap::new(),
        }
    }

    /// Public identity.
    pub fn party(&self) -> Party {
        self.signer.party()
    }

    /// A stored credential record.
    pub fn credential(&self, id: &CredentialId) -> Option<CredentialRecord> {
        self.wallet.get(id).map(|r| r.value().clone())
    }

    /// Ids of all stored credentials.
    pub fn credential_ids(&self) -> Vec<CredentialId> {
        let mut ids: Vec<_> = self.wallet.iter().map(|r| *r.key()).collect();
        ids.sort();
        ids
    }

    /// Run the holder side of one exchange over `channel`.
    ///
    /// `expected` are the attribute values agreed out of band; when given,
    /// any other values are a `CredentialMismatch`. The credential is stored
    /// only after the issuer reports a commit that the ledger confirms.
    pub async fn receive_credential<C: Channel + ?Sized>(
        &self,
        channel: &mut C,
        expected: Option<&CredentialValues>,
    ) -> Result<IssuanceOutcome, IssuanceError> {
        match self.run_issuance(channel, expected).await {
            Ok(outcome) => {
                tracing::info!(
                    credential_id = %outcome.record.id,
                    issuer = %outcome.record.issuer_did,
                    "credential stored"
                );
                self.wallet
                    .insert(outcome.record.id, outcome.record.clone());
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!(kind = %e.kind(), error = %e, "holder abandoned issuance");
                if e.notifies_counterparty() {
                    let abort = IssuanceMessage::Abort {
                        reason: e.to_string(),
                    };
                    if let Err(send_err) = channel.send(abort).await {
                        tracing::debug!(error = %send_err, "could not deliver abort");
                    }
                }
                Err(e)
            }
        }
    }

    async fn run_issuance<C: Channel + ?Sized>(
        &self,
        channel: &mut C,
        expected: Option<&CredentialValues>,
    ) -> Result<IssuanceOutcome, IssuanceError> {
        let (issuer, offer) = match channel.receive().await? {
            IssuanceMessage::Offer { issuer, offer } => (issuer, offer),
            other => return Err(unexpected("offer", other)),
        };
        let cred_def = self.catalog.cred_def(&offer.cred_def_id).await?;
        if issuer.did != cred_def.issuer_did {
            return Err(IssuanceError::CredentialMismatch(format!(
                "{} offered a credential under {}",
                issuer.did, cred_def.id
            )));
        }
        let session = HolderSession::receive_offer(self.party(), cred_def.clone(), offer)?;

        let request = self.engine.create_credential_request(
            &self.party().did,
            &cred_def,
            session.offer(),
            &self.master_secret,
        )?;
        let session = session.request(request.clone())?;
        channel
            .send(IssuanceMessage::Request {
                holder: self.party(),
                request,
            })
            .await?;
        tracing::debug!(session = %session.key(), "request sent");

        let (record, transaction) = match channel.receive().await? {
            IssuanceMessage::Proposal {
                record,
                transaction,
            } => (record, transaction),
            other => return Err(unexpected("proposal", other)),
        };
        let session = session.review_proposal(record, transaction, expected)?;
        self.engine
            .process_credential(&session.record().credential, &cred_def, &self.master_secret)
            .map_err(|e| IssuanceError::CredentialMismatch(e.to_string()))?;

        let (session, signature) = session.acknowledge(self.signer.as_ref())?;
        channel
            .send(IssuanceMessage::Acknowledge { signature })
            .await?;
        tracing::debug!(session = %session.key(), "acknowledged");

        let commit = match channel.receive().await {
            Ok(IssuanceMessage::Finalized { commit }) => commit,
            Ok(other) => return Err(unexpected("finalized", other)),
            Err(e) => match self.commit_from_ledger(session.record(), session.tx_id()).await? {
                Some(commit) => {
                    tracing::warn!(tx_id = %commit.tx_id, error = %e, "finalized notice lost, commit found on ledger");
                    commit
                }
                None => return Err(e.into()),
            },
        };
        let (record, log) = session.finalize(&commit)?;
        let on_ledger = self
            .catalog
            .ledger()
            .read(&LedgerKey::credential(&record.id))
            .await?;
        if on_ledger.map(|v| v.tx_id) != Some(commit.tx_id.clone()) {
            return Err(IssuanceError::NotFound(format!(
                "credential {} is not on the ledger",
                record.id
            )));
        }
        Ok(IssuanceOutcome {
            record,
            commit,
            log,
        })
    }

    /// Rebuild the commit for `tx_id` from the credential's ledger entry.
    async fn commit_from_ledger(
        &self,
        record: &CredentialRecord,
        tx_id: &str,
    ) -> Result<Option<Commit>, IssuanceError> {
        let entry = self
            .catalog
            .ledger()
            .read(&LedgerKey::credential(&record.id))
            .await?;
        Ok(entry.filter(|v| v.tx_id == tx_id).map(|v| Commit {
            tx_id: v.tx_id.clone(),
            seq_no: v.seq_no,
            committed_at: v.committed_at,
            produced: vec![v.state_ref()],
        }))
    }

    // ── Proofs ────────────────────────────────────────────────────────

    /// Prover over this holder's ledger and engine.
    pub fn prover(&self) -> Prover {
        Prover::new(self.catalog.clone(), self.engine.clone())
    }

    /// Answer `request` with wallet credentials chosen in `requested`.
    pub async fn create_proof(
        &self,
        request: &ProofRequest,
        requested: &RequestedCredentials,
    ) -> Result<Proof, ProveError> {
        let credentials: BTreeMap<CredentialId, Credential> = self
            .wallet
            .iter()
            .map(|r| (*r.key(), r.value().credential.clone()))
            .collect();
        self.prover()
            .create_proof(request, requested, &credentials, &self.master_secret)
            .await
    }
}
