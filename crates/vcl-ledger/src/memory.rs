//! # In-Memory Ledger
//!
//! Append-only history per key behind one `parking_lot::RwLock`. A commit
//! validates and applies under a single write-lock acquisition; the lock is
//! never held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use vcl_core::Timestamp;

use crate::clock::{Clock, SystemClock};
use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::rules::{self, StateView};
use crate::state::{LedgerKey, LedgerState, StateRef, VersionedState};
use crate::transaction::{Commit, Transaction};

#[derive(Debug, Default)]
struct LedgerInner {
    states: HashMap<LedgerKey, Vec<VersionedState>>,
    seq_no: u64,
    last_commit: Option<Timestamp>,
}

impl StateView for LedgerInner {
    fn head(&self, key: &LedgerKey) -> Option<&VersionedState> {
        self.states.get(key).and_then(|h| h.last())
    }
}

/// Thread-safe in-memory [`Ledger`]. Clones share state.
#[derive(Debug, Clone)]
pub struct InMemoryLedger {
    inner: Arc<RwLock<LedgerInner>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    /// Empty ledger on wall-clock time.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Empty ledger on `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(LedgerInner::default())),
            clock,
        }
    }

    /// Number of committed transactions.
    pub fn seq_no(&self) -> u64 {
        self.inner.read().seq_no
    }

    /// Number of keys with at least one version.
    pub fn key_count(&self) -> usize {
        self.inner.read().states.len()
    }

    fn commit(&self, tx: Transaction) -> Result<Commit, LedgerError> {
        let tx_id = tx.id()?;
        let mut inner = self.inner.write();
        rules::check_transaction(&tx, &*inner)?;

        inner.seq_no += 1;
        let seq_no = inner.seq_no;
        // Commit times never go backwards, even if the clock does.
        let committed_at = match inner.last_commit {
            Some(last) => last.max(self.clock.now()),
            None => self.clock.now(),
        };
        inner.last_commit = Some(committed_at);

        let mut produced = Vec::with_capacity(tx.body.produced.len());
        for mut state in tx.body.produced {
            if let LedgerState::Schema(schema) = &mut state {
                schema.seq_no = Some(seq_no);
            }
            let key = state.key();
            let history = inner.states.entry(key.clone()).or_default();
            let version = history.len() as u64 + 1;
            history.push(VersionedState {
                key: key.clone(),
                version,
                seq_no,
                committed_at,
                tx_id: tx_id.clone(),
                state,
            });
            produced.push(StateRef { key, version });
        }
        Ok(Commit {
            tx_id,
            seq_no,
            committed_at,
            produced,
        })
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn read(&self, key: &LedgerKey) -> Result<Option<VersionedState>, LedgerError> {
        Ok(self.inner.read().head(key).cloned())
    }

    async fn read_as_of(
        &self,
        key: &LedgerKey,
        at: Timestamp,
    ) -> Result<Option<VersionedState>, LedgerError> {
        let inner = self.inner.read();
        Ok(inner.states.get(key).and_then(|history| {
            history
                .iter()
                .rev()
                .find(|v| v.committed_at <= at)
                .cloned()
        }))
    }

    async fn history(&self, key: &LedgerKey) -> Result<Vec<VersionedState>, LedgerError> {
        Ok(self.inner.read().states.get(key).cloned().unwrap_or_default())
    }

    async fn propose_transaction(&self, tx: Transaction) -> Result<Commit, LedgerError> {
        match self.commit(tx) {
            Ok(commit) => {
                tracing::debug!(
                    tx_id = %commit.tx_id,
                    seq_no = commit.seq_no,
                    states = commit.produced.len(),
                    "transaction committed"
                );
                Ok(commit)
            }
            Err(e) => {
                if let LedgerError::NotarizationFailed(reason) = &e {
                    metrics::counter!("vcl_ledger_conflicts_total").increment(1);
                    tracing::warn!(%reason, "transaction lost a version race");
                } else {
                    tracing::warn!(error = %e, "transaction rejected");
                }
                Err(e)
            }
        }
    }

    fn now(&self) -> Timestamp {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::transaction::TransactionBody;
    use vcl_core::{CredentialDefinitionId, ErrorKind, SignatureType};
    use vcl_crypto::{Ed25519KeyPair, Signer};
    use vcl_vc::{
        AttributeValue, Credential, CredentialDefinition, CredentialRecord, CredentialValues,
        RevocationRegistryDefinition, Schema,
    };

    struct Fixture {
        ledger: InMemoryLedger,
        clock: Arc<ManualClock>,
        issuer: Ed25519KeyPair,
        holder: Ed25519KeyPair,
        schema: Schema,
        cred_def: CredentialDefinition,
        registry: RevocationRegistryDefinition,
    }

    fn start() -> Timestamp {
        Timestamp::parse("2026-03-01T09:00:00Z").unwrap()
    }

    async fn commit_one(
        ledger: &InMemoryLedger,
        signer: &Ed25519KeyPair,
        body: TransactionBody,
    ) -> Result<Commit, LedgerError> {
        let tx = Transaction::new(body).signed_by(signer)?;
        ledger.propose_transaction(tx).await
    }

    async fn fixture(max: u32) -> Fixture {
        let clock = Arc::new(ManualClock::new(start()));
        let ledger = InMemoryLedger::with_clock(clock.clone());
        let issuer = Ed25519KeyPair::from_seed_str("issuer");
        let holder = Ed25519KeyPair::from_seed_str("holder");
        let did = issuer.party().did;

        let schema = Schema::new(did.clone(), "gvt", "1.0", ["name", "age"]).unwrap();
        let commit = commit_one(
            &ledger,
            &issuer,
            TransactionBody::new(vec![issuer.party()]).produce(LedgerState::Schema(schema)),
        )
        .await
        .unwrap();
        let schema = ledger
            .read(&commit.produced[0].key)
            .await
            .unwrap()
            .unwrap()
            .state
            .as_schema()
            .cloned()
            .unwrap();

        let cred_def = CredentialDefinition {
            id: CredentialDefinitionId::new(did.clone(), schema.seq_no.unwrap(), "tag").unwrap(),
            schema_id: schema.id.clone(),
            issuer_did: did,
            tag: "tag".into(),
            signature_type: SignatureType::CL,
            public_key: serde_json::json!({"type": "test"}),
            supports_revocation: true,
        };
        let registry = RevocationRegistryDefinition::create(&cred_def.id, "reg", max).unwrap();
        commit_one(
            &ledger,
            &issuer,
            TransactionBody::new(vec![issuer.party()])
                .produce(LedgerState::CredentialDefinition(cred_def.clone())),
        )
        .await
        .unwrap();
        commit_one(
            &ledger,
            &issuer,
            TransactionBody::new(vec![issuer.party()])
                .produce(LedgerState::RevocationRegistry(registry.clone())),
        )
        .await
        .unwrap();
        Fixture {
            ledger,
            clock,
            issuer,
            holder,
            schema,
            cred_def,
            registry,
        }
    }

    fn credential(f: &Fixture, rev: Option<u32>) -> Credential {
        let mut values = CredentialValues::new();
        values.insert("name".into(), AttributeValue::new("Alex"));
        values.insert("age".into(), AttributeValue::new("28"));
        Credential {
            schema_id: f.schema.id.clone(),
            cred_def_id: f.cred_def.id.clone(),
            rev_reg_id: rev.map(|_| f.registry.id.clone()),
            cred_rev_index: rev,
            values,
            signature: serde_json::json!({}),
        }
    }

    /// Reserve the next index and build the issuance transaction, signed by
    /// both parties.
    async fn issuance_tx(f: &Fixture) -> (Transaction, CredentialRecord) {
        let head = f
            .ledger
            .read(&LedgerKey::rev_reg(&f.registry.id))
            .await
            .unwrap()
            .unwrap();
        let (next, index, _) = head.state.as_registry().unwrap().reserve_next_index().unwrap();
        let record = CredentialRecord::issued(
            credential(f, Some(index)),
            f.issuer.party().did,
            f.holder.party().did,
            f.ledger.now(),
        );
        let body = TransactionBody::new(vec![f.issuer.party(), f.holder.party()])
            .reference(StateRef {
                key: LedgerKey::cred_def(&f.cred_def.id),
                version: 1,
            })
            .consume(head.state_ref())
            .produce(LedgerState::RevocationRegistry(next))
            .produce(LedgerState::Credential(record.clone()));
        let tx = Transaction::new(body)
            .signed_by(&f.issuer)
            .unwrap()
            .signed_by(&f.holder)
            .unwrap();
        (tx, record)
    }

    // ── Publication ───────────────────────────────────────────────────

    #[tokio::test]
    async fn test_schema_gets_sequence_number() {
        let f = fixture(5).await;
        assert_eq!(f.schema.seq_no, Some(1));
        assert_eq!(f.ledger.seq_no(), 3);
        assert_eq!(f.ledger.key_count(), 3);
    }

    #[tokio::test]
    async fn test_schema_cannot_be_republished() {
        let f = fixture(5).await;
        let again = Schema::new(f.issuer.party().did, "gvt", "1.0", ["age"]).unwrap();
        let err = commit_one(
            &f.ledger,
            &f.issuer,
            TransactionBody::new(vec![f.issuer.party()]).produce(LedgerState::Schema(again)),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_cred_def_must_name_schema_seq_no() {
        let f = fixture(5).await;
        let mut bad = f.cred_def.clone();
        bad.id = CredentialDefinitionId::new(f.issuer.party().did, 99, "other").unwrap();
        bad.tag = "other".into();
        let err = commit_one(
            &f.ledger,
            &f.issuer,
            TransactionBody::new(vec![f.issuer.party()])
                .produce(LedgerState::CredentialDefinition(bad)),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("sequence number"));
    }

    // ── Issuance ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_issuance_commits_registry_and_record_atomically() {
        let f = fixture(5).await;
        let (tx, record) = issuance_tx(&f).await;
        let commit = f.ledger.propose_transaction(tx).await.unwrap();
        assert_eq!(commit.produced.len(), 2);

        let reg = f
            .ledger
            .read(&LedgerKey::rev_reg(&f.registry.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reg.version, 2);
        assert_eq!(reg.state.as_registry().unwrap().current_cred_num, 1);
        let stored = f
            .ledger
            .read(&LedgerKey::credential(&record.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.state.as_credential(), Some(&record));
        assert_eq!(stored.seq_no, reg.seq_no);
    }

    #[tokio::test]
    async fn test_missing_holder_signature_rejected() {
        let f = fixture(5).await;
        let (mut tx, _) = issuance_tx(&f).await;
        tx.signatures.remove(&f.holder.party().did);
        let err = f.ledger.propose_transaction(tx).await.unwrap_err();
        assert!(err.to_string().contains("missing signature"));
        assert_eq!(f.ledger.seq_no(), 3);
    }

    #[tokio::test]
    async fn test_stale_registry_version_conflicts() {
        let f = fixture(5).await;
        let (first, _) = issuance_tx(&f).await;
        let (second, _) = issuance_tx(&f).await;
        f.ledger.propose_transaction(first).await.unwrap();
        let err = f.ledger.propose_transaction(second).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LedgerConflict);
        assert!(err.is_retryable());

        let (retry, record) = issuance_tx(&f).await;
        f.ledger.propose_transaction(retry).await.unwrap();
        assert_eq!(record.credential.cred_rev_index, Some(1));
    }

    #[tokio::test]
    async fn test_index_without_credential_rejected() {
        let f = fixture(5).await;
        let head = f
            .ledger
            .read(&LedgerKey::rev_reg(&f.registry.id))
            .await
            .unwrap()
            .unwrap();
        let (next, _, _) = head.state.as_registry().unwrap().reserve_next_index().unwrap();
        let err = commit_one(
            &f.ledger,
            &f.issuer,
            TransactionBody::new(vec![f.issuer.party()])
                .consume(head.state_ref())
                .produce(LedgerState::RevocationRegistry(next)),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("without a credential"));
    }

    #[tokio::test]
    async fn test_revocable_credential_needs_index() {
        let f = fixture(5).await;
        let record = CredentialRecord::issued(
            credential(&f, None),
            f.issuer.party().did,
            f.holder.party().did,
            f.ledger.now(),
        );
        let tx = Transaction::new(
            TransactionBody::new(vec![f.issuer.party(), f.holder.party()])
                .produce(LedgerState::Credential(record)),
        )
        .signed_by(&f.issuer)
        .unwrap()
        .signed_by(&f.holder)
        .unwrap();
        let err = f.ledger.propose_transaction(tx).await.unwrap_err();
        assert!(err.to_string().contains("need a registry index"));
    }

    // ── Revocation ────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_revocation_updates_record_and_registry() {
        let f = fixture(5).await;
        let (tx, record) = issuance_tx(&f).await;
        f.ledger.propose_transaction(tx).await.unwrap();
        f.clock.advance(60);

        let reg_head = f
            .ledger
            .read(&LedgerKey::rev_reg(&f.registry.id))
            .await
            .unwrap()
            .unwrap();
        let rec_head = f
            .ledger
            .read(&LedgerKey::credential(&record.id))
            .await
            .unwrap()
            .unwrap();
        let (next, _) = reg_head.state.as_registry().unwrap().revoke(0).unwrap();
        let revoked = record.revoked(f.ledger.now()).unwrap();
        commit_one(
            &f.ledger,
            &f.issuer,
            TransactionBody::new(vec![f.issuer.party()])
                .consume(reg_head.state_ref())
                .consume(rec_head.state_ref())
                .produce(LedgerState::RevocationRegistry(next))
                .produce(LedgerState::Credential(revoked)),
        )
        .await
        .unwrap();

        let history = f
            .ledger
            .history(&LedgerKey::rev_reg(&f.registry.id))
            .await
            .unwrap();
        assert_eq!(history.len(), 3);
        let before = f
            .ledger
            .read_as_of(&LedgerKey::rev_reg(&f.registry.id), start())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(before.version, 2);
        assert!(!before.state.as_registry().unwrap().is_revoked(0));
    }

    #[tokio::test]
    async fn test_record_status_cannot_change_alone() {
        let f = fixture(5).await;
        let (tx, record) = issuance_tx(&f).await;
        f.ledger.propose_transaction(tx).await.unwrap();
        let rec_head = f
            .ledger
            .read(&LedgerKey::credential(&record.id))
            .await
            .unwrap()
            .unwrap();
        let revoked = record.revoked(f.ledger.now()).unwrap();
        let err = commit_one(
            &f.ledger,
            &f.issuer,
            TransactionBody::new(vec![f.issuer.party()])
                .consume(rec_head.state_ref())
                .produce(LedgerState::Credential(revoked)),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("must revoke index"));
    }

    // ── Reads ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_read_as_of_before_first_commit_is_none() {
        let f = fixture(5).await;
        let key = LedgerKey::rev_reg(&f.registry.id);
        let earlier = start().plus_secs(-1);
        assert!(f.ledger.read_as_of(&key, earlier).await.unwrap().is_none());
        assert!(f.ledger.read_as_of(&key, start()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_commit_time_is_monotonic() {
        let f = fixture(5).await;
        f.clock.set(start().plus_secs(-3600));
        let (tx, _) = issuance_tx(&f).await;
        let commit = f.ledger.propose_transaction(tx).await.unwrap();
        assert_eq!(commit.committed_at, start());
    }
}
