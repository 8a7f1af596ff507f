//! # Proof Verifier
//!
//! Verification runs in two halves:
//!
//! 1. [`ProofVerifier::collect_public_data`] reads every schema, credential
//!    definition and registry state the proof's identifiers name. A missing
//!    schema, definition or registry is an error: the verifier is
//!    misconfigured or the ledger has not caught up.
//! 2. [`ProofVerifier::verify_with`] checks the proof against that data and
//!    the request, then asks the engine. Every way a proof can be wrong is
//!    `Ok(false)`.
//!
//! Registry state is looked up at-or-before each identifier's timestamp. A
//! timestamp earlier than the registry itself has no state; the proof is
//! then invalid rather than the lookup failing.

use std::sync::Arc;

use vcl_vc::{
    encode_attribute, restrictions_satisfied, NonRevokedInterval, Proof, ProofRequest, Restriction,
};
use vcl_zkp::{AnoncredsEngine, EngineError, ProofPublicData};

use crate::catalog::CredentialDefinitionCatalog;
use crate::error::VerifyError;

/// Checks proofs against ledger-published data.
#[derive(Clone)]
pub struct ProofVerifier {
    catalog: Arc<CredentialDefinitionCatalog>,
    engine: Arc<dyn AnoncredsEngine>,
}

impl std::fmt::Debug for ProofVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofVerifier").finish_non_exhaustive()
    }
}

impl ProofVerifier {
    pub fn new(catalog: Arc<CredentialDefinitionCatalog>, engine: Arc<dyn AnoncredsEngine>) -> Self {
        Self { catalog, engine }
    }

    /// Verify `proof` against `request` and the ledger.
    ///
    /// `Ok(false)` for an invalid proof; `Err` only when referenced ledger
    /// objects are missing or a collaborator fails.
    pub async fn verify_proof(
        &self,
        request: &ProofRequest,
        proof: &Proof,
    ) -> Result<bool, VerifyError> {
        let verdict = self.verify(request, proof).await;
        let result = match &verdict {
            Ok(true) => "valid",
            Ok(false) => "invalid",
            Err(_) => "error",
        };
        metrics::counter!("vcl_proof_verifications_total", "result" => result).increment(1);
        match &verdict {
            Ok(valid) => tracing::info!(request = %request.name, valid, "proof verified"),
            Err(e) => tracing::warn!(request = %request.name, kind = %e.kind(), error = %e, "proof verification failed"),
        }
        verdict
    }

    async fn verify(&self, request: &ProofRequest, proof: &Proof) -> Result<bool, VerifyError> {
        if let Err(reason) = check_structure(request, proof) {
            tracing::debug!(%reason, "proof rejected");
            return Ok(false);
        }
        let public = self.collect_public_data(proof).await?;
        self.verify_with(request, proof, &public)
    }

    /// Read the public data `proof` refers to.
    pub async fn collect_public_data(&self, proof: &Proof) -> Result<ProofPublicData, VerifyError> {
        let mut public = ProofPublicData::default();
        for ident in &proof.identifiers {
            if !public.schemas.contains_key(&ident.schema_id) {
                let schema = self.catalog.schema(&ident.schema_id).await?;
                public.schemas.insert(ident.schema_id.clone(), schema);
            }
            if !public.cred_defs.contains_key(&ident.cred_def_id) {
                let cred_def = self.catalog.cred_def(&ident.cred_def_id).await?;
                public.cred_defs.insert(ident.cred_def_id.clone(), cred_def);
            }
            let (Some(rev_reg_id), Some(ts)) = (&ident.rev_reg_id, ident.timestamp) else {
                continue;
            };
            let key = (rev_reg_id.clone(), ts);
            if public.rev_reg_states.contains_key(&key) {
                continue;
            }
            match self.catalog.registry_as_of(rev_reg_id, ts).await? {
                Some(state) => {
                    public.rev_reg_states.insert(key, state);
                }
                None => {
                    tracing::warn!(rev_reg_id = %rev_reg_id, timestamp = %ts, "no registry state at timestamp");
                }
            }
        }
        Ok(public)
    }

    /// Verify against already collected `public` data.
    pub fn verify_with(
        &self,
        request: &ProofRequest,
        proof: &Proof,
        public: &ProofPublicData,
    ) -> Result<bool, VerifyError> {
        let checked = check_structure(request, proof)
            .and_then(|()| check_identifiers(proof, public))
            .and_then(|()| check_referents(request, proof, public))
            .and_then(|()| check_encodings(proof));
        if let Err(reason) = checked {
            tracing::debug!(%reason, "proof rejected");
            return Ok(false);
        }
        match self.engine.verify_proof(request, proof, public) {
            Ok(valid) => Ok(valid),
            Err(EngineError::Malformed(reason)) => {
                tracing::debug!(%reason, "engine rejected malformed proof");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

type Check = Result<(), String>;

/// Every referent is answered by an existing sub-proof, and self-attested
/// values only answer unrestricted attributes.
fn check_structure(request: &ProofRequest, proof: &Proof) -> Check {
    if proof.proofs.len() != proof.identifiers.len() {
        return Err("sub-proofs and identifiers differ in length".into());
    }
    let count = proof.proofs.len();
    if let Some(index) = proof.referenced_sub_proofs().find(|i| *i as usize >= count) {
        return Err(format!("sub-proof {index} does not exist"));
    }
    let rp = &proof.requested_proof;
    for (referent, attr) in &request.requested_attributes {
        if proof.sub_proof_for(referent).is_some() {
            continue;
        }
        if !rp.self_attested_attrs.contains_key(referent) {
            return Err(format!("attribute {referent} is not answered"));
        }
        if !attr.restrictions.is_empty() {
            return Err(format!("restricted attribute {referent} is self-attested"));
        }
    }
    if let Some(referent) = request
        .requested_predicates
        .keys()
        .find(|r| !rp.predicates.contains_key(*r))
    {
        return Err(format!("predicate {referent} is not answered"));
    }
    Ok(())
}

/// Each identifier's definition signs its schema, and every claimed
/// registry state was found.
fn check_identifiers(proof: &Proof, public: &ProofPublicData) -> Check {
    for ident in &proof.identifiers {
        let cred_def = public
            .cred_defs
            .get(&ident.cred_def_id)
            .ok_or_else(|| format!("{} was not collected", ident.cred_def_id))?;
        if cred_def.schema_id != ident.schema_id {
            return Err(format!(
                "{} does not sign schema {}",
                ident.cred_def_id, ident.schema_id
            ));
        }
        if let Some(rev_reg_id) = &ident.rev_reg_id {
            if rev_reg_id.cred_def_id() != &ident.cred_def_id {
                return Err(format!("{rev_reg_id} belongs to another definition"));
            }
            let ts = ident
                .timestamp
                .ok_or_else(|| format!("{rev_reg_id} has no timestamp"))?;
            if !public.rev_reg_states.contains_key(&(rev_reg_id.clone(), ts)) {
                return Err(format!("{rev_reg_id} has no state at {ts}"));
            }
        }
    }
    Ok(())
}

/// Restrictions hold, and revocable credentials show non-revocation inside
/// the applicable interval.
fn check_referents(request: &ProofRequest, proof: &Proof, public: &ProofPublicData) -> Check {
    let attrs = request
        .requested_attributes
        .iter()
        .map(|(r, a)| (r, &a.restrictions, a.non_revoked.as_ref()));
    let preds = request
        .requested_predicates
        .iter()
        .map(|(r, p)| (r, &p.restrictions, p.non_revoked.as_ref()));
    for (referent, restrictions, interval) in attrs.chain(preds) {
        let Some(index) = proof.sub_proof_for(referent) else {
            continue;
        };
        check_referent(
            referent,
            index as usize,
            restrictions,
            request.effective_interval(interval),
            proof,
            public,
        )?;
    }
    Ok(())
}

fn check_referent(
    referent: &str,
    index: usize,
    restrictions: &[Restriction],
    interval: Option<&NonRevokedInterval>,
    proof: &Proof,
    public: &ProofPublicData,
) -> Check {
    let ident = &proof.identifiers[index];
    if !restrictions_satisfied(
        restrictions,
        &ident.schema_id,
        &ident.cred_def_id,
        ident.rev_reg_id.as_ref(),
    ) {
        return Err(format!("{referent} violates its restrictions"));
    }
    let Some(interval) = interval else {
        return Ok(());
    };
    let supports_revocation = public
        .cred_defs
        .get(&ident.cred_def_id)
        .is_some_and(|c| c.supports_revocation);
    if !supports_revocation {
        return Ok(());
    }
    let (Some(_), Some(ts)) = (&ident.rev_reg_id, ident.timestamp) else {
        return Err(format!("{referent} lacks a non-revocation proof"));
    };
    if !interval.contains(ts) {
        return Err(format!("{referent} proves non-revocation at {ts}, outside the interval"));
    }
    if proof.proofs[index].non_revocation_proof.is_none() {
        return Err(format!("{referent} lacks a non-revocation proof"));
    }
    Ok(())
}

/// Revealed raw values encode to the bound `encoded` value.
fn check_encodings(proof: &Proof) -> Check {
    for (referent, attr) in &proof.requested_proof.revealed_attrs {
        if encode_attribute(&attr.raw) != attr.encoded {
            return Err(format!("{referent} raw value does not match its encoding"));
        }
    }
    Ok(())
}
