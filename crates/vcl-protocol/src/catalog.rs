//! # Credential Definition Catalog
//!
//! Maps published schema and credential-definition ids to their ledger
//! objects. Both kinds are immutable once committed, so the catalog caches
//! them after the first read; registries are mutable and always read
//! through.

use std::sync::Arc;

use dashmap::DashMap;
use vcl_core::{CredentialDefinitionId, RevocationRegistryId, SchemaId, Timestamp};
use vcl_crypto::Signer;
use vcl_ledger::{
    Commit, Ledger, LedgerKey, LedgerState, Transaction, TransactionBody, VersionedState,
};
use vcl_vc::{CredentialDefinition, RevocationRegistryDefinition, Schema};

use crate::error::CatalogError;

/// Read-mostly, append-only view of published definitions.
pub struct CredentialDefinitionCatalog {
    ledger: Arc<dyn Ledger>,
    schemas: DashMap<SchemaId, Schema>,
    cred_defs: DashMap<CredentialDefinitionId, CredentialDefinition>,
}

impl std::fmt::Debug for CredentialDefinitionCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialDefinitionCatalog")
            .field("schemas", &self.schemas.len())
            .field("cred_defs", &self.cred_defs.len())
            .finish_non_exhaustive()
    }
}

impl CredentialDefinitionCatalog {
    /// Empty catalog over `ledger`.
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self {
            ledger,
            schemas: DashMap::new(),
            cred_defs: DashMap::new(),
        }
    }

    /// The ledger this catalog reads.
    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    /// Number of cached credential definitions.
    pub fn cached_cred_defs(&self) -> usize {
        self.cred_defs.len()
    }

    async fn publish(
        &self,
        state: LedgerState,
        signer: &dyn Signer,
    ) -> Result<Commit, CatalogError> {
        let body = TransactionBody::new(vec![signer.party()]).produce(state);
        let tx = Transaction::new(body).signed_by(signer)?;
        Ok(self.ledger.propose_transaction(tx).await?)
    }

    // ── Publication ───────────────────────────────────────────────────

    /// Publish `schema`. Returns it with the ledger-assigned sequence number.
    pub async fn publish_schema(
        &self,
        schema: Schema,
        signer: &dyn Signer,
    ) -> Result<Schema, CatalogError> {
        let id = schema.id.clone();
        let commit = self.publish(LedgerState::Schema(schema), signer).await?;
        tracing::info!(schema_id = %id, seq_no = commit.seq_no, "schema published");
        self.schema(&id).await
    }

    /// Publish a credential definition.
    pub async fn publish_cred_def(
        &self,
        cred_def: CredentialDefinition,
        signer: &dyn Signer,
    ) -> Result<CredentialDefinition, CatalogError> {
        cred_def.validate()?;
        self.publish(LedgerState::CredentialDefinition(cred_def.clone()), signer)
            .await?;
        tracing::info!(
            cred_def_id = %cred_def.id,
            supports_revocation = cred_def.supports_revocation,
            "credential definition published"
        );
        self.cred_defs.insert(cred_def.id.clone(), cred_def.clone());
        Ok(cred_def)
    }

    /// Publish an empty revocation registry.
    pub async fn publish_registry(
        &self,
        registry: RevocationRegistryDefinition,
        signer: &dyn Signer,
    ) -> Result<RevocationRegistryDefinition, CatalogError> {
        let cred_def = self.cred_def(&registry.cred_def_id).await?;
        if !cred_def.supports_revocation {
            return Err(CatalogError::Invalid(format!(
                "{} does not support revocation",
                cred_def.id
            )));
        }
        self.publish(LedgerState::RevocationRegistry(registry.clone()), signer)
            .await?;
        tracing::info!(
            rev_reg_id = %registry.id,
            max_cred_num = registry.max_cred_num,
            "revocation registry published"
        );
        Ok(registry)
    }

    // ── Lookup ────────────────────────────────────────────────────────

    async fn read_head(&self, key: LedgerKey) -> Result<VersionedState, CatalogError> {
        self.ledger
            .read(&key)
            .await?
            .ok_or_else(|| CatalogError::NotFound(key.to_string()))
    }

    /// Published schema, with its sequence number.
    pub async fn schema(&self, id: &SchemaId) -> Result<Schema, CatalogError> {
        if let Some(schema) = self.schemas.get(id) {
            return Ok(schema.clone());
        }
        let head = self.read_head(LedgerKey::schema(id)).await?;
        let schema = head
            .state
            .as_schema()
            .cloned()
            .ok_or_else(|| CatalogError::Invalid(format!("{} is not a schema", head.key)))?;
        self.schemas.insert(id.clone(), schema.clone());
        Ok(schema)
    }

    /// Published credential definition.
    pub async fn cred_def(
        &self,
        id: &CredentialDefinitionId,
    ) -> Result<CredentialDefinition, CatalogError> {
        if let Some(cred_def) = self.cred_defs.get(id) {
            return Ok(cred_def.clone());
        }
        let head = self.cred_def_state(id).await?;
        let cred_def = head.state.as_cred_def().cloned().ok_or_else(|| {
            CatalogError::Invalid(format!("{} is not a credential definition", head.key))
        })?;
        self.cred_defs.insert(id.clone(), cred_def.clone());
        Ok(cred_def)
    }

    /// Versioned ledger state of a credential definition, for transaction
    /// references.
    pub async fn cred_def_state(
        &self,
        id: &CredentialDefinitionId,
    ) -> Result<VersionedState, CatalogError> {
        self.read_head(LedgerKey::cred_def(id)).await
    }

    /// Current registry head.
    pub async fn registry_head(
        &self,
        id: &RevocationRegistryId,
    ) -> Result<(VersionedState, RevocationRegistryDefinition), CatalogError> {
        let head = self.read_head(LedgerKey::rev_reg(id)).await?;
        let registry = head
            .state
            .as_registry()
            .cloned()
            .ok_or_else(|| CatalogError::Invalid(format!("{} is not a registry", head.key)))?;
        Ok((head, registry))
    }

    /// Registry state in force at `at`, or `None` if the registry was
    /// published after `at`. Fails `NotFound` if it was never published.
    pub async fn registry_as_of(
        &self,
        id: &RevocationRegistryId,
        at: Timestamp,
    ) -> Result<Option<RevocationRegistryDefinition>, CatalogError> {
        let key = LedgerKey::rev_reg(id);
        if self.ledger.read(&key).await?.is_none() {
            return Err(CatalogError::NotFound(key.to_string()));
        }
        Ok(self
            .ledger
            .read_as_of(&key, at)
            .await?
            .and_then(|v| v.state.as_registry().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcl_core::ErrorKind;
    use vcl_crypto::Ed25519KeyPair;
    use vcl_ledger::InMemoryLedger;
    use vcl_zkp::{AnoncredsEngine, MockAnoncredsEngine};

    async fn published() -> (CredentialDefinitionCatalog, Ed25519KeyPair, CredentialDefinition) {
        let catalog = CredentialDefinitionCatalog::new(Arc::new(InMemoryLedger::new()));
        let issuer = Ed25519KeyPair::from_seed_str("issuer");
        let schema = Schema::new(issuer.party().did, "gvt", "1.0", ["name", "age"]).unwrap();
        let schema = catalog.publish_schema(schema, &issuer).await.unwrap();
        let (cred_def, _) = MockAnoncredsEngine::new()
            .create_credential_definition(&issuer.party().did, &schema, "tag", true)
            .unwrap();
        let cred_def = catalog.publish_cred_def(cred_def, &issuer).await.unwrap();
        (catalog, issuer, cred_def)
    }

    #[tokio::test]
    async fn test_schema_comes_back_with_seq_no() {
        let (catalog, issuer, cred_def) = published().await;
        let schema = catalog.schema(&cred_def.schema_id).await.unwrap();
        assert_eq!(schema.seq_no, Some(cred_def.id.schema_seq_no()));
        assert_eq!(schema.id.issuer_did(), &issuer.party().did);
    }

    #[tokio::test]
    async fn test_cred_def_lookup_is_cached() {
        let (catalog, _, cred_def) = published().await;
        assert_eq!(catalog.cached_cred_defs(), 1);
        assert_eq!(catalog.cred_def(&cred_def.id).await.unwrap(), cred_def);
        assert_eq!(catalog.cred_def_state(&cred_def.id).await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_unknown_cred_def_is_not_found() {
        let (catalog, issuer, _) = published().await;
        let missing = CredentialDefinitionId::new(issuer.party().did, 42, "nope").unwrap();
        let err = catalog.cred_def(&missing).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_registry_publication_and_time_travel() {
        let (catalog, issuer, cred_def) = published().await;
        let registry = RevocationRegistryDefinition::create(&cred_def.id, "r1", 10).unwrap();
        catalog
            .publish_registry(registry.clone(), &issuer)
            .await
            .unwrap();
        let (head, current) = catalog.registry_head(&registry.id).await.unwrap();
        assert_eq!(head.version, 1);
        assert_eq!(current, registry);

        let before = head.committed_at.plus_secs(-60);
        assert!(catalog
            .registry_as_of(&registry.id, before)
            .await
            .unwrap()
            .is_none());
        assert!(catalog
            .registry_as_of(&registry.id, head.committed_at)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_registry_needs_revocation_support() {
        let (catalog, issuer, _) = published().await;
        let schema = catalog
            .publish_schema(
                Schema::new(issuer.party().did, "plain", "1.0", ["x"]).unwrap(),
                &issuer,
            )
            .await
            .unwrap();
        let (plain, _) = MockAnoncredsEngine::new()
            .create_credential_definition(&issuer.party().did, &schema, "tag", false)
            .unwrap();
        let plain = catalog.publish_cred_def(plain, &issuer).await.unwrap();
        let registry = RevocationRegistryDefinition::create(&plain.id, "r1", 10).unwrap();
        let err = catalog
            .publish_registry(registry, &issuer)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(_)));
    }
}
