//! Shared fixture: one in-memory ledger on a manual clock, the mock engine,
//! and helpers to run both sides of an issuance.

#![allow(dead_code)]

use std::sync::Arc;

use vcl_core::{CredentialDefinitionId, Timestamp};
use vcl_crypto::Ed25519KeyPair;
use vcl_ledger::{InMemoryLedger, ManualClock};
use vcl_protocol::{
    CredentialDefinitionCatalog, Holder, IssuanceError, IssuanceOutcome, Issuer, MemoryChannel,
    ProofVerifier,
};
use vcl_vc::{AttributeValue, CredentialDefinition, CredentialValues, RevocationRegistryDefinition};
use vcl_zkp::MockAnoncredsEngine;

pub const START: &str = "2026-03-01T09:00:00Z";

pub struct World {
    pub clock: Arc<ManualClock>,
    pub ledger: Arc<InMemoryLedger>,
    pub catalog: Arc<CredentialDefinitionCatalog>,
    pub engine: Arc<MockAnoncredsEngine>,
}

impl World {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(Timestamp::parse(START).unwrap()));
        let ledger = Arc::new(InMemoryLedger::with_clock(clock.clone()));
        let catalog = Arc::new(CredentialDefinitionCatalog::new(ledger.clone()));
        Self {
            clock,
            ledger,
            catalog,
            engine: Arc::new(MockAnoncredsEngine::new()),
        }
    }

    pub fn issuer(&self, seed: &str) -> Issuer {
        Issuer::new(
            Arc::new(Ed25519KeyPair::from_seed_str(seed)),
            self.engine.clone(),
            self.catalog.clone(),
        )
    }

    pub fn holder(&self, seed: &str) -> Holder {
        Holder::new(
            Arc::new(Ed25519KeyPair::from_seed_str(seed)),
            self.engine.clone(),
            self.catalog.clone(),
        )
    }

    pub fn verifier(&self) -> ProofVerifier {
        ProofVerifier::new(self.catalog.clone(), self.engine.clone())
    }
}

pub fn values(pairs: &[(&str, &str)]) -> CredentialValues {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), AttributeValue::new(*v)))
        .collect()
}

pub fn gvt(name: &str, age: &str) -> CredentialValues {
    values(&[("name", name), ("age", age), ("sex", "female"), ("height", "170")])
}

/// Publish the `gvt` schema and a definition; with `max_cred_num`, the
/// definition is revocable and gets a registry of that size.
pub async fn publish_gvt(
    issuer: &Issuer,
    max_cred_num: Option<u32>,
) -> (CredentialDefinition, Option<RevocationRegistryDefinition>) {
    let schema = issuer
        .publish_schema("gvt", "1.0", ["name", "age", "sex", "height"])
        .await
        .unwrap();
    let cred_def = issuer
        .publish_cred_def(&schema, "default", max_cred_num.is_some())
        .await
        .unwrap();
    let registry = match max_cred_num {
        Some(max) => Some(
            issuer
                .publish_registry(&cred_def.id, "r1", max, None)
                .await
                .unwrap(),
        ),
        None => None,
    };
    (cred_def, registry)
}

/// Run both sides of one issuance to completion.
pub async fn exchange(
    issuer: &Issuer,
    holder: &Holder,
    cred_def_id: &CredentialDefinitionId,
    values: CredentialValues,
) -> (
    Result<IssuanceOutcome, IssuanceError>,
    Result<IssuanceOutcome, IssuanceError>,
) {
    let (mut issuer_end, mut holder_end) = MemoryChannel::pair(8);
    let agreed = values.clone();
    tokio::join!(
        issuer.issue_credential(&mut issuer_end, cred_def_id, values),
        holder.receive_credential(&mut holder_end, Some(&agreed)),
    )
}

/// Issue and unwrap both sides.
pub async fn issue(
    issuer: &Issuer,
    holder: &Holder,
    cred_def_id: &CredentialDefinitionId,
    values: CredentialValues,
) -> IssuanceOutcome {
    let (issued, received) = exchange(issuer, holder, cred_def_id, values).await;
    let issued = issued.unwrap();
    assert_eq!(received.unwrap().record, issued.record);
    issued
}
