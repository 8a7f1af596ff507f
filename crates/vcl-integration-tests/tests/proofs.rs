//! # Proofs Across Crates
//!
//! Holder wallets answering verifier requests against ledger state: revealed
//! attributes, predicates, multi-issuer proofs, and non-revocation at a
//! timestamp before and after a revocation commits.

mod common;

use common::*;
use vcl_core::{ErrorKind, Timestamp};
use vcl_ledger::Clock;
use vcl_protocol::{Holder, IssuanceOutcome, Issuer, ProveError};
use vcl_vc::{
    AttributeReference, CredentialDefinition, NonRevokedInterval, PredicateReference,
    PredicateType, ProofRequest, ProofRequestBuilder, RequestedCredentials, Restriction,
};
use vcl_zkp::EngineError;

fn age_request(cred_def: &CredentialDefinition, interval: Option<NonRevokedInterval>) -> ProofRequest {
    let builder = ProofRequestBuilder::new("age check", "1.0", ProofRequest::generate_nonce())
        .attribute_as(
            "name_referent",
            AttributeReference::new("name").restrict(Restriction::cred_def(cred_def.id.clone())),
        )
        .predicate_as(
            "age_predicate",
            PredicateReference::new("age", PredicateType::GE, 18)
                .restrict(Restriction::cred_def(cred_def.id.clone())),
        );
    match interval {
        Some(interval) => builder.non_revoked(interval).build().unwrap(),
        None => builder.build().unwrap(),
    }
}

fn answer(issued: &IssuanceOutcome, timestamp: Option<Timestamp>) -> RequestedCredentials {
    RequestedCredentials::default()
        .attribute("name_referent", issued.record.id, true, timestamp)
        .predicate("age_predicate", issued.record.id, timestamp)
}

async fn revocable_setup(world: &World) -> (Issuer, Holder, CredentialDefinition, IssuanceOutcome) {
    let issuer = world.issuer("issuer");
    let holder = world.holder("holder");
    let (cred_def, _) = publish_gvt(&issuer, Some(10)).await;
    let issued = issue(&issuer, &holder, &cred_def.id, gvt("Alex", "28")).await;
    (issuer, holder, cred_def, issued)
}

// =========================================================================
// Revealed attributes and predicates
// =========================================================================

#[tokio::test]
async fn predicate_proof_reveals_only_requested_values() {
    let world = World::new();
    let issuer = world.issuer("issuer");
    let holder = world.holder("holder");
    let (cred_def, _) = publish_gvt(&issuer, None).await;
    let issued = issue(&issuer, &holder, &cred_def.id, gvt("Alex", "28")).await;

    let request = age_request(&cred_def, None);
    let proof = holder
        .create_proof(&request, &answer(&issued, None))
        .await
        .unwrap();

    let revealed = &proof.requested_proof.revealed_attrs["name_referent"];
    assert_eq!(revealed.raw, "Alex");
    assert!(proof.requested_proof.predicates.contains_key("age_predicate"));
    assert!(!proof.requested_proof.revealed_attrs.contains_key("age_predicate"));
    assert!(world.verifier().verify_proof(&request, &proof).await.unwrap());
}

#[tokio::test]
async fn unsatisfied_predicate_cannot_be_proven() {
    let world = World::new();
    let issuer = world.issuer("issuer");
    let holder = world.holder("holder");
    let (cred_def, _) = publish_gvt(&issuer, None).await;
    let issued = issue(&issuer, &holder, &cred_def.id, gvt("Sam", "17")).await;

    let err = holder
        .create_proof(&age_request(&cred_def, None), &answer(&issued, None))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProveError::Engine(EngineError::PredicateNotSatisfied { .. })
    ));
    assert_eq!(err.kind(), ErrorKind::CryptoVerificationFailed);
}

#[tokio::test]
async fn tampered_revealed_value_is_invalid() {
    let world = World::new();
    let issuer = world.issuer("issuer");
    let holder = world.holder("holder");
    let (cred_def, _) = publish_gvt(&issuer, None).await;
    let issued = issue(&issuer, &holder, &cred_def.id, gvt("Alex", "28")).await;

    let request = age_request(&cred_def, None);
    let mut proof = holder
        .create_proof(&request, &answer(&issued, None))
        .await
        .unwrap();
    if let Some(revealed) = proof.requested_proof.revealed_attrs.get_mut("name_referent") {
        revealed.raw = "Mallory".to_string();
    }
    assert!(!world.verifier().verify_proof(&request, &proof).await.unwrap());
}

#[tokio::test]
async fn proof_against_another_nonce_is_invalid() {
    let world = World::new();
    let issuer = world.issuer("issuer");
    let holder = world.holder("holder");
    let (cred_def, _) = publish_gvt(&issuer, None).await;
    let issued = issue(&issuer, &holder, &cred_def.id, gvt("Alex", "28")).await;

    let proof = holder
        .create_proof(&age_request(&cred_def, None), &answer(&issued, None))
        .await
        .unwrap();
    let replayed_to = age_request(&cred_def, None);
    assert!(!world.verifier().verify_proof(&replayed_to, &proof).await.unwrap());
}

// =========================================================================
// Multiple issuers
// =========================================================================

#[tokio::test]
async fn proof_spanning_two_issuers_verifies() {
    let world = World::new();
    let registrar = world.issuer("registrar");
    let bank = world.issuer("bank");
    let holder = world.holder("holder");
    let (name_def, _) = publish_gvt(&registrar, None).await;
    let (age_def, _) = publish_gvt(&bank, None).await;
    let name_cred = issue(&registrar, &holder, &name_def.id, gvt("Alex", "28")).await;
    let age_cred = issue(&bank, &holder, &age_def.id, gvt("Alex", "28")).await;

    let request = ProofRequestBuilder::new("kyc", "1.0", ProofRequest::generate_nonce())
        .attribute_as(
            "name_referent",
            AttributeReference::new("name").restrict(Restriction::cred_def(name_def.id.clone())),
        )
        .predicate_as(
            "age_predicate",
            PredicateReference::new("age", PredicateType::GE, 18)
                .restrict(Restriction::cred_def(age_def.id.clone())),
        )
        .build()
        .unwrap();
    let requested = RequestedCredentials::default()
        .attribute("name_referent", name_cred.record.id, true, None)
        .predicate("age_predicate", age_cred.record.id, None);
    let proof = holder.create_proof(&request, &requested).await.unwrap();
    assert_eq!(proof.proofs.len(), 2);

    let verifier = world.verifier();
    assert!(verifier.verify_proof(&request, &proof).await.unwrap());

    // Swapping either definition's key breaks its sub-proof.
    for (victim, donor) in [(&name_def, &age_def), (&age_def, &name_def)] {
        let mut public = verifier.collect_public_data(&proof).await.unwrap();
        if let Some(cred_def) = public.cred_defs.get_mut(&victim.id) {
            cred_def.public_key = donor.public_key.clone();
        }
        assert!(!verifier.verify_with(&request, &proof, &public).unwrap());
    }
}

#[tokio::test]
async fn restriction_to_another_issuer_is_invalid() {
    let world = World::new();
    let registrar = world.issuer("registrar");
    let bank = world.issuer("bank");
    let holder = world.holder("holder");
    let (name_def, _) = publish_gvt(&registrar, None).await;
    let (age_def, _) = publish_gvt(&bank, None).await;
    let issued = issue(&registrar, &holder, &name_def.id, gvt("Alex", "28")).await;

    // The request wants the bank's definition; the holder answers with the
    // registrar's credential.
    let request = age_request(&age_def, None);
    let proof = holder
        .create_proof(&request, &answer(&issued, None))
        .await
        .unwrap();
    assert!(!world.verifier().verify_proof(&request, &proof).await.unwrap());
}

// =========================================================================
// Non-revocation
// =========================================================================

#[tokio::test]
async fn same_proof_fails_once_revoked_at_its_timestamp() {
    let world = World::new();
    let (issuer, holder, cred_def, issued) = revocable_setup(&world).await;
    let verifier = world.verifier();

    let t = world.clock.advance(5);
    let request = age_request(&cred_def, Some(NonRevokedInterval::at(t)));
    let proof = holder
        .create_proof(&request, &answer(&issued, Some(t)))
        .await
        .unwrap();
    assert!(verifier.verify_proof(&request, &proof).await.unwrap());

    // Clock still at t: the revocation lands inside the interval.
    let revoked = issuer.revoke_credential(&issued.record.id).await.unwrap();
    assert_eq!(world.clock.now(), t);
    assert!(revoked.commit.committed_at <= t);

    assert!(!verifier.verify_proof(&request, &proof).await.unwrap());
}

#[tokio::test]
async fn non_revocation_holds_at_past_timestamps_after_revocation() {
    let world = World::new();
    let (issuer, holder, cred_def, issued) = revocable_setup(&world).await;
    let verifier = world.verifier();

    let early = world.clock.advance(5);
    let early_request = age_request(&cred_def, Some(NonRevokedInterval::at(early)));
    let early_proof = holder
        .create_proof(&early_request, &answer(&issued, Some(early)))
        .await
        .unwrap();

    let t = world.clock.advance(95);
    let request = age_request(&cred_def, Some(NonRevokedInterval::at(t)));
    let proof = holder
        .create_proof(&request, &answer(&issued, Some(t)))
        .await
        .unwrap();
    assert!(proof.proofs[0].non_revocation_proof.is_some());
    assert_eq!(proof.identifiers[0].timestamp, Some(t));

    assert!(verifier.verify_proof(&early_request, &early_proof).await.unwrap());
    assert!(verifier.verify_proof(&request, &proof).await.unwrap());

    world.clock.advance(10);
    issuer.revoke_credential(&issued.record.id).await.unwrap();

    // History is immutable: both proofs still show non-revocation at the
    // instants they name.
    assert!(verifier.verify_proof(&early_request, &early_proof).await.unwrap());
    assert!(verifier.verify_proof(&request, &proof).await.unwrap());

    // A verifier asking about now rejects the old proof...
    let now = world.clock.now();
    let current = age_request(&cred_def, Some(NonRevokedInterval::at(now)));
    assert!(!verifier.verify_proof(&current, &proof).await.unwrap());

    // ...and the holder cannot produce a new one.
    let err = holder
        .create_proof(&current, &answer(&issued, Some(now)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProveError::Engine(EngineError::CredentialRevoked { index: 0, .. })
    ));
}

#[tokio::test]
async fn missing_non_revocation_proof_is_invalid() {
    let world = World::new();
    let (_, holder, cred_def, issued) = revocable_setup(&world).await;

    let t = world.clock.advance(30);
    let request = age_request(&cred_def, Some(NonRevokedInterval::at(t)));
    let proof = holder
        .create_proof(&request, &answer(&issued, None))
        .await
        .unwrap();
    assert!(proof.proofs[0].non_revocation_proof.is_none());
    assert!(!world.verifier().verify_proof(&request, &proof).await.unwrap());
}

#[tokio::test]
async fn non_revocation_outside_the_interval_is_invalid() {
    let world = World::new();
    let (_, holder, cred_def, issued) = revocable_setup(&world).await;

    let earlier = world.clock.advance(10);
    let t = world.clock.advance(50);
    let request = age_request(&cred_def, Some(NonRevokedInterval::at(t)));
    let proof = holder
        .create_proof(&request, &answer(&issued, Some(earlier)))
        .await
        .unwrap();
    assert!(!world.verifier().verify_proof(&request, &proof).await.unwrap());
}

#[tokio::test]
async fn interval_without_timestamp_accepts_non_revocable_credential() {
    let world = World::new();
    let issuer = world.issuer("issuer");
    let holder = world.holder("holder");
    let (cred_def, _) = publish_gvt(&issuer, None).await;
    let issued = issue(&issuer, &holder, &cred_def.id, gvt("Alex", "28")).await;

    let t = world.clock.advance(30);
    let request = age_request(&cred_def, Some(NonRevokedInterval::at(t)));
    let proof = holder
        .create_proof(&request, &answer(&issued, None))
        .await
        .unwrap();
    assert!(world.verifier().verify_proof(&request, &proof).await.unwrap());
}

// =========================================================================
// Missing public data
// =========================================================================

#[tokio::test]
async fn verifier_on_another_ledger_reports_not_found() {
    let world = World::new();
    let issuer = world.issuer("issuer");
    let holder = world.holder("holder");
    let (cred_def, _) = publish_gvt(&issuer, None).await;
    let issued = issue(&issuer, &holder, &cred_def.id, gvt("Alex", "28")).await;

    let request = age_request(&cred_def, None);
    let proof = holder
        .create_proof(&request, &answer(&issued, None))
        .await
        .unwrap();

    let elsewhere = World::new();
    let err = elsewhere
        .verifier()
        .verify_proof(&request, &proof)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
