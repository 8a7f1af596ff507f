//! # Prover
//!
//! Gathers the public data a proof is built against and hands it to the
//! engine. For a revocable credential answered at a timestamp, the registry
//! state in force at that timestamp is read from the ledger; the engine
//! refuses if the index is revoked there.

use std::collections::BTreeMap;
use std::sync::Arc;

use vcl_core::CredentialId;
use vcl_vc::{Credential, MasterSecret, Proof, ProofRequest, RequestedCredentials};
use vcl_zkp::{AnoncredsEngine, ProofPublicData};

use crate::catalog::CredentialDefinitionCatalog;
use crate::error::ProveError;

/// Builds proofs over ledger-published data.
#[derive(Clone)]
pub struct Prover {
    catalog: Arc<CredentialDefinitionCatalog>,
    engine: Arc<dyn AnoncredsEngine>,
}

impl std::fmt::Debug for Prover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prover").finish_non_exhaustive()
    }
}

impl Prover {
    pub fn new(catalog: Arc<CredentialDefinitionCatalog>, engine: Arc<dyn AnoncredsEngine>) -> Self {
        Self { catalog, engine }
    }

    /// Answer `request` with the credentials chosen in `requested`.
    ///
    /// Fails `NotFound` if a chosen credential is not in `credentials` or a
    /// registry has no state at the chosen timestamp.
    pub async fn create_proof(
        &self,
        request: &ProofRequest,
        requested: &RequestedCredentials,
        credentials: &BTreeMap<CredentialId, Credential>,
        master_secret: &MasterSecret,
    ) -> Result<Proof, ProveError> {
        let mut public = ProofPublicData::default();
        for (cred_id, timestamp) in requested.sub_proof_keys() {
            let credential = credentials
                .get(&cred_id)
                .ok_or_else(|| ProveError::NotFound(format!("credential {cred_id}")))?;
            if !public.schemas.contains_key(&credential.schema_id) {
                let schema = self.catalog.schema(&credential.schema_id).await?;
                public.schemas.insert(schema.id.clone(), schema);
            }
            if !public.cred_defs.contains_key(&credential.cred_def_id) {
                let cred_def = self.catalog.cred_def(&credential.cred_def_id).await?;
                public.cred_defs.insert(cred_def.id.clone(), cred_def);
            }
            if let (Some((rev_reg_id, _)), Some(ts)) = (credential.revocation_info(), timestamp) {
                let key = (rev_reg_id.clone(), ts);
                if public.rev_reg_states.contains_key(&key) {
                    continue;
                }
                let state = self
                    .catalog
                    .registry_as_of(rev_reg_id, ts)
                    .await?
                    .ok_or_else(|| {
                        ProveError::NotFound(format!("registry {rev_reg_id} has no state at {ts}"))
                    })?;
                public.rev_reg_states.insert(key, state);
            }
        }

        let proof = self
            .engine
            .create_proof(request, requested, credentials, master_secret, &public)?;
        tracing::debug!(
            request = %request.name,
            sub_proofs = proof.proofs.len(),
            "proof created"
        );
        Ok(proof)
    }
}
