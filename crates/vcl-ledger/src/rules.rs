//! # Contract Validity Rules
//!
//! Checked against the current head states, under the same lock that
//! applies the transaction, so a rule can never be satisfied by a state that
//! is replaced before commit.
//!
//! Order matters: signatures first, then version checks (which produce the
//! retryable `NotarizationFailed`), then per-state contracts.

use std::collections::BTreeSet;

use vcl_core::{Did, RevocationRegistryId};
use vcl_vc::{
    CredentialDefinition, CredentialRecord, CredentialStatus, RevocationRegistryDefinition, Schema,
};

use crate::error::LedgerError;
use crate::state::{LedgerKey, LedgerState, VersionedState};
use crate::transaction::{Transaction, TransactionBody};

/// Read access to head versions.
pub trait StateView {
    /// Latest committed version of `key`.
    fn head(&self, key: &LedgerKey) -> Option<&VersionedState>;
}

fn reject(msg: impl Into<String>) -> LedgerError {
    LedgerError::VerificationFailed(msg.into())
}

/// Check `tx` against `view`. Nothing is written.
pub fn check_transaction(tx: &Transaction, view: &dyn StateView) -> Result<(), LedgerError> {
    tx.verify_signatures()?;
    check_versions(&tx.body, view)?;
    check_shape(&tx.body)?;
    for state in &tx.body.produced {
        let prior = prior_version(&tx.body, &state.key(), view)?;
        match state {
            LedgerState::Schema(s) => check_schema(s, prior, &tx.body)?,
            LedgerState::CredentialDefinition(c) => check_cred_def(c, prior, &tx.body, view)?,
            LedgerState::RevocationRegistry(r) => check_registry(r, prior, &tx.body, view)?,
            LedgerState::Credential(c) => check_credential(c, prior, &tx.body, view)?,
        }
    }
    Ok(())
}

fn check_versions(body: &TransactionBody, view: &dyn StateView) -> Result<(), LedgerError> {
    for r in body.references.iter().chain(&body.consumed) {
        let head = view
            .head(&r.key)
            .ok_or_else(|| LedgerError::NotFound(r.key.to_string()))?;
        if head.version != r.version {
            return Err(LedgerError::NotarizationFailed(format!(
                "{} is at version {}, transaction expected {}",
                r.key, head.version, r.version
            )));
        }
    }
    Ok(())
}

fn check_shape(body: &TransactionBody) -> Result<(), LedgerError> {
    if body.produced.is_empty() {
        return Err(reject("transaction produces nothing"));
    }
    let produced: Vec<LedgerKey> = body.produced.iter().map(LedgerState::key).collect();
    let unique: BTreeSet<&LedgerKey> = produced.iter().collect();
    if unique.len() != produced.len() {
        return Err(reject("a key is produced twice"));
    }
    let mut consumed = BTreeSet::new();
    for r in &body.consumed {
        if !consumed.insert(&r.key) {
            return Err(reject(format!("{} is consumed twice", r.key)));
        }
        if !unique.contains(&r.key) {
            return Err(reject(format!("{} is consumed but not produced", r.key)));
        }
    }
    if let Some(r) = body.references.iter().find(|r| consumed.contains(&r.key)) {
        return Err(reject(format!("{} is both referenced and consumed", r.key)));
    }
    Ok(())
}

/// The head a produced state replaces. Existing keys must be consumed.
fn prior_version<'a>(
    body: &TransactionBody,
    key: &LedgerKey,
    view: &'a dyn StateView,
) -> Result<Option<&'a VersionedState>, LedgerError> {
    match view.head(key) {
        None => Ok(None),
        Some(head) if body.consumed.iter().any(|r| &r.key == key) => Ok(Some(head)),
        Some(_) => Err(reject(format!("{key} exists and is not consumed"))),
    }
}

fn require_signer(body: &TransactionBody, did: &Did, role: &str) -> Result<(), LedgerError> {
    if body.requires(did) {
        Ok(())
    } else {
        Err(reject(format!("{role} {did} must sign")))
    }
}

fn head_cred_def<'a>(
    view: &'a dyn StateView,
    id: &vcl_core::CredentialDefinitionId,
) -> Result<&'a CredentialDefinition, LedgerError> {
    view.head(&LedgerKey::cred_def(id))
        .and_then(|v| v.state.as_cred_def())
        .ok_or_else(|| reject(format!("unknown credential definition {id}")))
}

fn produced_registry<'a>(
    body: &'a TransactionBody,
    id: &RevocationRegistryId,
) -> Option<&'a RevocationRegistryDefinition> {
    body.produced
        .iter()
        .filter_map(LedgerState::as_registry)
        .find(|r| &r.id == id)
}

fn check_schema(
    schema: &Schema,
    prior: Option<&VersionedState>,
    body: &TransactionBody,
) -> Result<(), LedgerError> {
    if prior.is_some() {
        return Err(reject(format!("schema {} is immutable", schema.id)));
    }
    if schema.seq_no.is_some() {
        return Err(reject("schema sequence numbers are assigned by the ledger"));
    }
    require_signer(body, schema.id.issuer_did(), "schema issuer")
}

fn check_cred_def(
    cred_def: &CredentialDefinition,
    prior: Option<&VersionedState>,
    body: &TransactionBody,
    view: &dyn StateView,
) -> Result<(), LedgerError> {
    if prior.is_some() {
        return Err(reject(format!(
            "credential definition {} is immutable",
            cred_def.id
        )));
    }
    cred_def.validate().map_err(|e| reject(e.to_string()))?;
    require_signer(body, &cred_def.issuer_did, "credential definition issuer")?;
    let schema = view
        .head(&LedgerKey::schema(&cred_def.schema_id))
        .and_then(|v| v.state.as_schema())
        .ok_or_else(|| reject(format!("unknown schema {}", cred_def.schema_id)))?;
    if schema.seq_no != Some(cred_def.id.schema_seq_no()) {
        return Err(reject(format!(
            "{} does not name the sequence number of {}",
            cred_def.id, schema.id
        )));
    }
    Ok(())
}

fn check_registry(
    registry: &RevocationRegistryDefinition,
    prior: Option<&VersionedState>,
    body: &TransactionBody,
    view: &dyn StateView,
) -> Result<(), LedgerError> {
    let cred_def = head_cred_def(view, &registry.cred_def_id)?;
    require_signer(body, &cred_def.issuer_did, "registry issuer")?;
    let Some(prior) = prior else {
        if !cred_def.supports_revocation {
            return Err(reject(format!(
                "{} does not support revocation",
                cred_def.id
            )));
        }
        registry.validate().map_err(|e| reject(e.to_string()))?;
        if registry.current_cred_num != 0 || !registry.revoked.is_empty() {
            return Err(reject("a new registry must start empty"));
        }
        return Ok(());
    };
    let prev = prior
        .state
        .as_registry()
        .ok_or_else(|| reject(format!("{} is not a registry", prior.key)))?;
    registry
        .check_successor_of(prev)
        .map_err(|e| reject(e.to_string()))?;

    // Every index issued or revoked by this step must be matched by a
    // credential record produced alongside it.
    let records: Vec<&CredentialRecord> = body
        .produced
        .iter()
        .filter_map(LedgerState::as_credential)
        .collect();
    let covered = |index: u32, status: CredentialStatus| {
        records.iter().any(|rec| {
            rec.status == status
                && rec.credential.revocation_info() == Some((&registry.id, index))
        })
    };
    for index in prev.current_cred_num..registry.current_cred_num {
        if !covered(index, CredentialStatus::Issued) {
            return Err(reject(format!(
                "index {index} of {} is issued without a credential",
                registry.id
            )));
        }
    }
    for index in registry.revoked.difference(&prev.revoked) {
        if !covered(*index, CredentialStatus::Revoked) {
            return Err(reject(format!(
                "index {index} of {} is revoked without its credential",
                registry.id
            )));
        }
    }
    Ok(())
}

fn check_credential(
    record: &CredentialRecord,
    prior: Option<&VersionedState>,
    body: &TransactionBody,
    view: &dyn StateView,
) -> Result<(), LedgerError> {
    let cred_def = head_cred_def(view, &record.credential.cred_def_id)?;
    if record.issuer_did != cred_def.issuer_did {
        return Err(reject(format!(
            "{} is not the issuer of {}",
            record.issuer_did, cred_def.id
        )));
    }
    require_signer(body, &record.issuer_did, "issuer")?;

    if let Some(prior) = prior {
        let prev = prior
            .state
            .as_credential()
            .ok_or_else(|| reject(format!("{} is not a credential", prior.key)))?;
        if !prev.is_legal_update(record) {
            return Err(reject(format!(
                "illegal credential update {} -> {}",
                prev.status, record.status
            )));
        }
        if let Some((rev_reg_id, index)) = record.credential.revocation_info() {
            let revoked = produced_registry(body, rev_reg_id).is_some_and(|r| r.is_revoked(index));
            if !revoked {
                return Err(reject(format!(
                    "revoking {} must revoke index {index} of {rev_reg_id}",
                    record.id
                )));
            }
        }
        return Ok(());
    }

    if record.status != CredentialStatus::Issued {
        return Err(reject("a new credential record must be ISSUED"));
    }
    require_signer(body, &record.holder_did, "holder")?;
    if record.credential.schema_id != cred_def.schema_id {
        return Err(reject(format!(
            "credential schema {} does not match {}",
            record.credential.schema_id, cred_def.id
        )));
    }
    match (cred_def.supports_revocation, record.credential.revocation_info()) {
        (false, None) => Ok(()),
        (false, Some(_)) => Err(reject(format!(
            "{} does not support revocation",
            cred_def.id
        ))),
        (true, None) => Err(reject(format!(
            "credentials under {} need a registry index",
            cred_def.id
        ))),
        (true, Some((rev_reg_id, index))) => {
            if rev_reg_id.cred_def_id() != &cred_def.id {
                return Err(reject(format!(
                    "{rev_reg_id} does not serve {}",
                    cred_def.id
                )));
            }
            let prev = view
                .head(&LedgerKey::rev_reg(rev_reg_id))
                .and_then(|v| v.state.as_registry())
                .ok_or_else(|| reject(format!("unknown registry {rev_reg_id}")))?;
            let next = produced_registry(body, rev_reg_id).ok_or_else(|| {
                reject(format!("issuing under {rev_reg_id} must update the registry"))
            })?;
            if prev.is_issued(index) || !next.is_issued(index) {
                return Err(reject(format!(
                    "index {index} of {rev_reg_id} is not newly issued"
                )));
            }
            Ok(())
        }
    }
}
