//! # Revocation
//!
//! Revoking is issuer-only and needs no holder round trip. The registry
//! successor and the REVOKED record commit in one transaction, so the ledger
//! never shows one without the other. Revocation is permanent: a second
//! attempt fails `AlreadyRevoked` and leaves the ledger unchanged.

use serde::Serialize;
use vcl_core::CredentialId;
use vcl_ledger::{Commit, LedgerKey, LedgerState, Transaction, TransactionBody};
use vcl_vc::{
    CredentialRecord, RegistryError, RevocationRegistryDefinition, RevocationRegistryDelta,
};

use crate::error::RevocationError;
use crate::issuer::Issuer;

/// Result of a committed revocation.
#[derive(Debug, Clone, Serialize)]
pub struct RevocationOutcome {
    /// The record, now REVOKED.
    pub record: CredentialRecord,
    /// Registry after the revocation.
    pub registry: RevocationRegistryDefinition,
    /// Accumulator change.
    pub delta: RevocationRegistryDelta,
    /// Ledger receipt.
    pub commit: Commit,
}

impl Issuer {
    /// Revoke the credential recorded under `id`.
    pub async fn revoke_credential(
        &self,
        id: &CredentialId,
    ) -> Result<RevocationOutcome, RevocationError> {
        let head = self
            .ledger()
            .read(&LedgerKey::credential(id))
            .await?
            .ok_or(RevocationError::NotFound(*id))?;
        let record = head
            .state
            .as_credential()
            .cloned()
            .ok_or(RevocationError::NotFound(*id))?;
        let (rev_reg_id, index) = record
            .credential
            .revocation_info()
            .map(|(reg, idx)| (reg.clone(), idx))
            .ok_or(RevocationError::CredentialNotRevocable(*id))?;

        let (registry_head, registry) = self.catalog().registry_head(&rev_reg_id).await?;
        let (registry, delta) = registry.revoke(index)?;
        let record = record
            .revoked(self.ledger().now())
            .ok_or(RegistryError::AlreadyRevoked(index))?;

        let body = TransactionBody::new(vec![self.party()])
            .consume(registry_head.state_ref())
            .consume(head.state_ref())
            .produce(LedgerState::RevocationRegistry(registry.clone()))
            .produce(LedgerState::Credential(record.clone()));
        let tx = Transaction::new(body).signed_by(self.signer())?;
        let commit = self.ledger().propose_transaction(tx).await?;

        metrics::counter!("vcl_revocations_total").increment(1);
        tracing::info!(
            credential_id = %id,
            rev_reg_id = %rev_reg_id,
            rev_idx = index,
            seq_no = commit.seq_no,
            "credential revoked"
        );
        Ok(RevocationOutcome {
            record,
            registry,
            delta,
            commit,
        })
    }
}
