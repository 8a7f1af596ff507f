//! # Demo Subcommand
//!
//! Runs the credential lifecycle against an in-memory ledger with the mock
//! engine and prints a JSON summary:
//!
//! 1. The issuer publishes a schema, a revocable credential definition and a
//!    registry.
//! 2. Issuer and holder run the issuance handshake over an in-memory channel.
//! 3. The holder proves the configured attributes and predicate,
//!    non-revoked at the current ledger time, and the verifier checks it.
//! 4. The issuer revokes the credential; the old proof is checked against a
//!    fresh request and the holder tries to prove again.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use vcl_core::{CredentialId, Timestamp};
use vcl_crypto::Ed25519KeyPair;
use vcl_ledger::{InMemoryLedger, Ledger};
use vcl_protocol::{CredentialDefinitionCatalog, Holder, Issuer, MemoryChannel, ProofVerifier};
use vcl_vc::{
    AttributeReference, AttributeValue, CredentialValues, NonRevokedInterval, PredicateReference,
    ProofRequest, ProofRequestBuilder, RequestedCredentials,
};
use vcl_zkp::MockAnoncredsEngine;

use crate::config::DemoConfig;

/// Arguments for the demo subcommand. Configuration comes from the global
/// `--config` file and the environment.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Print the summary on one line.
    #[arg(long)]
    pub compact: bool,
}

/// What the demo did.
#[derive(Debug, Clone, Serialize)]
pub struct DemoSummary {
    pub schema_id: String,
    pub cred_def_id: String,
    pub rev_reg_id: String,
    pub credential_id: CredentialId,
    pub rev_idx: Option<u32>,
    pub issued_seq_no: u64,
    pub proved_at: Timestamp,
    pub revealed: Vec<(String, String)>,
    pub verified: bool,
    pub revoked_seq_no: u64,
    pub verified_after_revocation: bool,
    /// Why the holder could not prove again, if it could not.
    pub reprove_error: Option<String>,
}

/// Execute the demo subcommand.
pub fn run_demo(args: &DemoArgs, config: &DemoConfig) -> Result<u8> {
    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    let summary = runtime.block_on(demo(config))?;
    let out = if args.compact {
        serde_json::to_string(&summary)?
    } else {
        serde_json::to_string_pretty(&summary)?
    };
    println!("{out}");
    Ok(if summary.verified && !summary.verified_after_revocation {
        0
    } else {
        2
    })
}

/// Run the lifecycle described by `config`.
pub async fn demo(config: &DemoConfig) -> Result<DemoSummary> {
    let ledger = Arc::new(InMemoryLedger::new());
    let catalog = Arc::new(CredentialDefinitionCatalog::new(ledger.clone()));
    let engine = Arc::new(MockAnoncredsEngine::new());

    let issuer = Issuer::new(
        Arc::new(Ed25519KeyPair::from_seed_str(&config.issuer_seed)),
        engine.clone(),
        catalog.clone(),
    );
    let holder = Holder::new(
        Arc::new(Ed25519KeyPair::from_seed_str(&config.holder_seed)),
        engine.clone(),
        catalog.clone(),
    );
    let verifier = ProofVerifier::new(catalog.clone(), engine);

    // Publication
    let schema = issuer
        .publish_schema(
            &config.schema.name,
            &config.schema.version,
            config.schema.attributes.iter().cloned(),
        )
        .await
        .context("publishing schema")?;
    let cred_def = issuer
        .publish_cred_def(&schema, &config.tag, true)
        .await
        .context("publishing credential definition")?;
    let registry = issuer
        .publish_registry(
            &cred_def.id,
            &config.tag,
            config.max_cred_num,
            config.tails_location.as_deref(),
        )
        .await
        .context("publishing registry")?;

    // Issuance
    let values: CredentialValues = config
        .values
        .iter()
        .map(|(name, raw)| (name.clone(), AttributeValue::new(raw.as_str())))
        .collect();
    let (mut issuer_end, mut holder_end) = MemoryChannel::pair(8);
    let (issued, received) = tokio::join!(
        issuer.issue_credential(&mut issuer_end, &cred_def.id, values.clone()),
        holder.receive_credential(&mut holder_end, Some(&values)),
    );
    let issued = issued.context("issuing credential")?;
    received.context("receiving credential")?;
    let credential_id = issued.record.id;

    // Proof
    let proved_at = ledger.now();
    let request = proof_request(config, proved_at)?;
    let requested = answer(config, &request, credential_id, proved_at);
    let proof = holder
        .create_proof(&request, &requested)
        .await
        .context("creating proof")?;
    let verified = verifier
        .verify_proof(&request, &proof)
        .await
        .context("verifying proof")?;
    let revealed = proof
        .requested_proof
        .revealed_attrs
        .iter()
        .map(|(referent, attr)| (referent.clone(), attr.raw.clone()))
        .collect();

    // Revocation
    let revoked = issuer
        .revoke_credential(&credential_id)
        .await
        .context("revoking credential")?;
    let now = ledger.now();
    let fresh = proof_request(config, now)?;
    let verified_after_revocation = verifier
        .verify_proof(&fresh, &proof)
        .await
        .context("verifying proof after revocation")?;
    let reprove_error = holder
        .create_proof(&fresh, &answer(config, &fresh, credential_id, now))
        .await
        .err()
        .map(|e| e.to_string());

    Ok(DemoSummary {
        schema_id: schema.id.to_string(),
        cred_def_id: cred_def.id.to_string(),
        rev_reg_id: registry.id.to_string(),
        credential_id,
        rev_idx: issued.record.credential.cred_rev_index,
        issued_seq_no: issued.commit.seq_no,
        proved_at,
        revealed,
        verified,
        revoked_seq_no: revoked.commit.seq_no,
        verified_after_revocation,
        reprove_error,
    })
}

fn proof_request(config: &DemoConfig, at: Timestamp) -> Result<ProofRequest> {
    let mut builder = ProofRequestBuilder::new("vcl-demo", "1.0", ProofRequest::generate_nonce())
        .non_revoked(NonRevokedInterval::at(at));
    for name in &config.reveal {
        builder = builder.attribute_as(format!("{name}_referent"), AttributeReference::new(name.as_str()));
    }
    if let Some(p) = &config.predicate {
        builder = builder.predicate_as(
            format!("{}_predicate", p.attribute),
            PredicateReference::new(p.attribute.as_str(), p.p_type, p.value),
        );
    }
    Ok(builder.build()?)
}

fn answer(
    config: &DemoConfig,
    request: &ProofRequest,
    credential_id: CredentialId,
    at: Timestamp,
) -> RequestedCredentials {
    let mut requested = RequestedCredentials::default();
    for referent in request.requested_attributes.keys() {
        requested = requested.attribute(referent.as_str(), credential_id, true, Some(at));
    }
    if config.predicate.is_some() {
        for referent in request.requested_predicates.keys() {
            requested = requested.predicate(referent.as_str(), credential_id, Some(at));
        }
    }
    requested
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_demo_runs_the_lifecycle() {
        let summary = demo(&DemoConfig::default()).await.unwrap();
        assert!(summary.verified);
        assert!(!summary.verified_after_revocation);
        assert!(summary.reprove_error.is_some());
        assert_eq!(summary.rev_idx, Some(0));
        assert!(summary.revoked_seq_no > summary.issued_seq_no);
        assert_eq!(
            summary.revealed,
            vec![("name_referent".to_string(), "Alex".to_string())]
        );
    }

    #[tokio::test]
    async fn test_unsatisfied_predicate_fails_the_demo() {
        let mut config = DemoConfig::default();
        config.values.insert("age".into(), "17".into());
        let err = demo(&config).await.unwrap_err();
        assert!(format!("{err:#}").contains("creating proof"));
    }
}
