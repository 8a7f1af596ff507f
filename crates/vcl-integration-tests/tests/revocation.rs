//! # Revocation Across Crates

mod common;

use common::*;
use vcl_core::{CredentialId, ErrorKind};
use vcl_ledger::{Clock, Ledger, LedgerKey};
use vcl_protocol::RevocationError;
use vcl_vc::{CredentialStatus, RegistryError};

#[tokio::test]
async fn revocation_updates_record_and_registry_in_one_commit() {
    let world = World::new();
    let issuer = world.issuer("issuer");
    let holder = world.holder("holder");
    let (cred_def, registry) = publish_gvt(&issuer, Some(5)).await;
    let registry = registry.unwrap();
    let issued = issue(&issuer, &holder, &cred_def.id, gvt("Alex", "28")).await;

    world.clock.advance(60);
    let outcome = issuer.revoke_credential(&issued.record.id).await.unwrap();

    assert_eq!(outcome.record.status, CredentialStatus::Revoked);
    assert_eq!(outcome.record.revoked_at, Some(world.clock.now()));
    assert!(outcome.registry.is_revoked(0));
    assert_eq!(outcome.delta.revoked.iter().copied().collect::<Vec<_>>(), vec![0]);

    let record = world
        .ledger
        .read(&LedgerKey::credential(&issued.record.id))
        .await
        .unwrap()
        .unwrap();
    let (registry_head, _) = world.catalog.registry_head(&registry.id).await.unwrap();
    assert_eq!(record.tx_id, outcome.commit.tx_id);
    assert_eq!(registry_head.tx_id, outcome.commit.tx_id);

    let history = world
        .ledger
        .history(&LedgerKey::credential(&issued.record.id))
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn second_revocation_is_already_revoked_and_changes_nothing() {
    let world = World::new();
    let issuer = world.issuer("issuer");
    let holder = world.holder("holder");
    let (cred_def, registry) = publish_gvt(&issuer, Some(5)).await;
    let registry = registry.unwrap();
    issue(&issuer, &holder, &cred_def.id, gvt("Sam", "30")).await;
    let issued = issue(&issuer, &holder, &cred_def.id, gvt("Alex", "28")).await;

    issuer.revoke_credential(&issued.record.id).await.unwrap();
    let (_, after_first) = world.catalog.registry_head(&registry.id).await.unwrap();
    let seq = world.ledger.seq_no();

    let err = issuer
        .revoke_credential(&issued.record.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RevocationError::Registry(RegistryError::AlreadyRevoked(1))
    ));

    let (_, after_second) = world.catalog.registry_head(&registry.id).await.unwrap();
    assert_eq!(after_second.accumulator, after_first.accumulator);
    assert_eq!(world.ledger.seq_no(), seq);
}

#[tokio::test]
async fn non_revocable_credential_cannot_be_revoked() {
    let world = World::new();
    let issuer = world.issuer("issuer");
    let holder = world.holder("holder");
    let (cred_def, _) = publish_gvt(&issuer, None).await;
    let issued = issue(&issuer, &holder, &cred_def.id, gvt("Alex", "28")).await;

    let err = issuer
        .revoke_credential(&issued.record.id)
        .await
        .unwrap_err();
    assert!(matches!(err, RevocationError::CredentialNotRevocable(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn unknown_credential_is_not_found() {
    let world = World::new();
    let issuer = world.issuer("issuer");
    publish_gvt(&issuer, Some(5)).await;

    let err = issuer
        .revoke_credential(&CredentialId::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn only_the_issuer_can_revoke() {
    let world = World::new();
    let issuer = world.issuer("issuer");
    let impostor = world.issuer("impostor");
    let holder = world.holder("holder");
    let (cred_def, _) = publish_gvt(&issuer, Some(5)).await;
    let issued = issue(&issuer, &holder, &cred_def.id, gvt("Alex", "28")).await;

    let err = impostor
        .revoke_credential(&issued.record.id)
        .await
        .unwrap_err();
    assert!(matches!(err, RevocationError::Ledger(_)));
    let record = world
        .ledger
        .read(&LedgerKey::credential(&issued.record.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        record.state.as_credential().map(|r| r.status),
        Some(CredentialStatus::Issued)
    );
}
