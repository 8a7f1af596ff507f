//! # Issuer
//!
//! Holds the issuer's signing key, credential private keys and active
//! registries, and drives the issuer side of the handshake.
//!
//! The registry index is reserved on a copy of the registry head. The
//! reservation becomes durable only when the transaction that also records
//! the credential commits; if any step fails first, the copy is dropped and
//! nothing is consumed.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use vcl_core::{CredentialDefinitionId, RevocationRegistryId};
use vcl_crypto::{Party, Signer};
use vcl_ledger::{Commit, Ledger, LedgerState, TransactionBody};
use vcl_state::{issuer, IssuanceTransition, IssuerSession};
use vcl_vc::{
    CredentialDefinition, CredentialPrivateKey, CredentialRecord, CredentialValues,
    RevocationRegistryDefinition, Schema,
};
use vcl_zkp::AnoncredsEngine;

use crate::catalog::CredentialDefinitionCatalog;
use crate::channel::Channel;
use crate::error::{CatalogError, IssuanceError};
use crate::message::IssuanceMessage;

/// Result of a committed issuance.
#[derive(Debug, Clone, Serialize)]
pub struct IssuanceOutcome {
    /// The committed record.
    pub record: CredentialRecord,
    /// Ledger receipt.
    pub commit: Commit,
    /// Session transition log.
    pub log: Vec<IssuanceTransition>,
}

/// The issuing party.
pub struct Issuer {
    signer: Arc<dyn Signer>,
    engine: Arc<dyn AnoncredsEngine>,
    catalog: Arc<CredentialDefinitionCatalog>,
    private_keys: DashMap<CredentialDefinitionId, CredentialPrivateKey>,
    registries: DashMap<CredentialDefinitionId, RevocationRegistryId>,
}

impl std::fmt::Debug for Issuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Issuer")
            .field("party", &self.signer.party())
            .field("cred_defs", &self.private_keys.len())
            .finish_non_exhaustive()
    }
}

impl Issuer {
    /// Issuer acting as `signer`.
    pub fn new(
        signer: Arc<dyn Signer>,
        engine: Arc<dyn AnoncredsEngine>,
        catalog: Arc<CredentialDefinitionCatalog>,
    ) -> Self {
        Self {
            signer,
            engine,
            catalog,
            private_keys: DashMap::new(),
            registries: DashMap::new(),
        }
    }

    /// Public identity.
    pub fn party(&self) -> Party {
        self.signer.party()
    }

    pub(crate) fn signer(&self) -> &dyn Signer {
        &*self.signer
    }

    pub(crate) fn catalog(&self) -> &CredentialDefinitionCatalog {
        &self.catalog
    }

    pub(crate) fn ledger(&self) -> &Arc<dyn Ledger> {
        self.catalog.ledger()
    }

    /// Registry new credentials under `cred_def_id` are issued into.
    pub fn active_registry(&self, cred_def_id: &CredentialDefinitionId) -> Option<RevocationRegistryId> {
        self.registries.get(cred_def_id).map(|r| r.value().clone())
    }

    // ── Setup ─────────────────────────────────────────────────────────

    /// Create and publish a schema owned by this issuer.
    pub async fn publish_schema<I, S>(
        &self,
        name: &str,
        version: &str,
        attr_names: I,
    ) -> Result<Schema, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let schema = Schema::new(self.party().did, name, version, attr_names)?;
        self.catalog.publish_schema(schema, self.signer()).await
    }

    /// Generate keys for `schema` and publish the definition. The private
    /// key stays with this issuer.
    pub async fn publish_cred_def(
        &self,
        schema: &Schema,
        tag: &str,
        supports_revocation: bool,
    ) -> Result<CredentialDefinition, CatalogError> {
        let (cred_def, private_key) = self.engine.create_credential_definition(
            &self.party().did,
            schema,
            tag,
            supports_revocation,
        )?;
        let cred_def = self.catalog.publish_cred_def(cred_def, self.signer()).await?;
        self.private_keys.insert(cred_def.id.clone(), private_key);
        Ok(cred_def)
    }

    /// Create and publish a registry for `cred_def_id` and make it the
    /// active one.
    pub async fn publish_registry(
        &self,
        cred_def_id: &CredentialDefinitionId,
        tag: &str,
        max_cred_num: u32,
        tails_location: Option<&str>,
    ) -> Result<RevocationRegistryDefinition, CatalogError> {
        let mut registry = RevocationRegistryDefinition::create(cred_def_id, tag, max_cred_num)?;
        if let Some(location) = tails_location {
            registry = registry.with_tails_location(location);
        }
        let registry = self.catalog.publish_registry(registry, self.signer()).await?;
        self.registries
            .insert(cred_def_id.clone(), registry.id.clone());
        Ok(registry)
    }

    // ── Issuance ──────────────────────────────────────────────────────

    /// Run the issuer side of one exchange over `channel`.
    ///
    /// On failure the holder is sent `Abort` and nothing is committed. A
    /// `LedgerConflict` means another issuance took the registry head first;
    /// start over with a fresh call.
    pub async fn issue_credential<C: Channel + ?Sized>(
        &self,
        channel: &mut C,
        cred_def_id: &CredentialDefinitionId,
        values: CredentialValues,
    ) -> Result<IssuanceOutcome, IssuanceError> {
        match self.run_issuance(channel, cred_def_id, values).await {
            Ok(outcome) => {
                metrics::counter!("vcl_issuance_committed_total").increment(1);
                tracing::info!(
                    credential_id = %outcome.record.id,
                    cred_def_id = %cred_def_id,
                    holder = %outcome.record.holder_did,
                    rev_idx = ?outcome.record.credential.cred_rev_index,
                    seq_no = outcome.commit.seq_no,
                    "credential issued"
                );
                Ok(outcome)
            }
            Err(e) => {
                metrics::counter!("vcl_issuance_aborted_total").increment(1);
                tracing::warn!(cred_def_id = %cred_def_id, kind = %e.kind(), error = %e, "issuance aborted");
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
        cred_def_id: &CredentialDefinitionId,
        values: CredentialValues,
    ) -> Result<IssuanceOutcome, IssuanceError> {
        let cred_def = self.catalog.cred_def(cred_def_id).await?;
        let private_key = self
            .private_keys
            .get(cred_def_id)
            .map(|k| k.value().clone())
            .ok_or_else(|| IssuanceError::NotFound(format!("private key for {cred_def_id}")))?;

        // Offered
        let offer = self.engine.create_credential_offer(&cred_def)?;
        let session = IssuerSession::start(self.party(), cred_def.clone(), offer.clone())?;
        channel
            .send(IssuanceMessage::Offer {
                issuer: self.party(),
                offer,
            })
            .await?;
        tracing::debug!(session = %session.key(), "offer sent");

        // Requested
        let (holder, request) = match channel.receive().await? {
            IssuanceMessage::Request { holder, request } => (holder, request),
            other => return Err(unexpected("request", other)),
        };
        let session = session.receive_request(holder, request)?;
        self.engine
            .verify_credential_request(&cred_def, session.offer(), session.request())?;
        tracing::debug!(session = %session.key(), "request accepted");

        // Issued
        let session = self.propose(session, &cred_def, &private_key, &values).await?;
        channel
            .send(IssuanceMessage::Proposal {
                record: session.record().clone(),
                transaction: session.transaction().clone(),
            })
            .await?;
        tracing::debug!(session = %session.key(), "proposal sent");

        // Acknowledged
        let signature = match channel.receive().await? {
            IssuanceMessage::Acknowledge { signature } => signature,
            other => return Err(unexpected("acknowledge", other)),
        };
        let session = session.receive_acknowledgement(signature)?;

        let commit = self
            .ledger()
            .propose_transaction(session.transaction().clone())
            .await?;
        let (record, log) = session.finalize(&commit)?;
        // Committed from here on; the holder can recover the commit from the ledger.
        if let Err(e) = channel
            .send(IssuanceMessage::Finalized {
                commit: commit.clone(),
            })
            .await
        {
            tracing::warn!(tx_id = %commit.tx_id, error = %e, "committed, finalized notice not delivered");
        }
        Ok(IssuanceOutcome {
            record,
            commit,
            log,
        })
    }

    /// Reserve an index on a copy of the registry head, issue, and sign the
    /// transaction that commits both.
    async fn propose(
        &self,
        session: IssuerSession<issuer::Requested>,
        cred_def: &CredentialDefinition,
        private_key: &CredentialPrivateKey,
        values: &CredentialValues,
    ) -> Result<IssuerSession<issuer::Issued>, IssuanceError> {
        let cred_def_state = self.catalog.cred_def_state(&cred_def.id).await?;
        let mut body = TransactionBody::new(vec![self.party(), session.holder().clone()])
            .reference(cred_def_state.state_ref());

        let reservation = if cred_def.supports_revocation {
            let rev_reg_id = self.active_registry(&cred_def.id).ok_or_else(|| {
                IssuanceError::NotFound(format!("active registry for {}", cred_def.id))
            })?;
            let (head, registry) = self.catalog.registry_head(&rev_reg_id).await?;
            if !registry.can_produce_credentials() {
                return Err(IssuanceError::CredentialMaximumReached {
                    rev_reg_id,
                    max: registry.max_cred_num,
                });
            }
            let (next, index, _delta) = registry.reserve_next_index()?;
            body = body
                .consume(head.state_ref())
                .produce(LedgerState::RevocationRegistry(next));
            Some((rev_reg_id, index))
        } else {
            None
        };

        let credential = self.engine.issue_credential(
            cred_def,
            private_key,
            session.offer(),
            session.request(),
            values,
            reservation.as_ref().map(|(id, index)| (id, *index)),
        )?;
        let record = CredentialRecord::issued(
            credential,
            self.party().did,
            session.holder().did.clone(),
            self.ledger().now(),
        );
        let body = body.produce(LedgerState::Credential(record.clone()));
        Ok(session.propose(record, body, self.signer())?)
    }
}

pub(crate) fn unexpected(expected: &'static str, found: IssuanceMessage) -> IssuanceError {
    match found {
        IssuanceMessage::Abort { reason } => IssuanceError::Aborted(reason),
        other => IssuanceError::UnexpectedMessage {
            expected,
            found: other.name(),
        },
    }
}
