//! # Transactions
//!
//! A [`Transaction`] is a [`TransactionBody`] plus one Ed25519 signature per
//! required signer. Signatures cover `CanonicalBytes` of the body only, so
//! the body is fixed before the first signature is collected.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vcl_core::{sha256_hex, CanonicalBytes, Did, Timestamp};
use vcl_crypto::{Ed25519Signature, Party, Signer};
use vcl_vc::{CredentialRecord, RevocationRegistryDefinition};

use crate::error::LedgerError;
use crate::state::{LedgerState, StateRef};

/// What a transaction reads, consumes, and produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    /// States that must still be at these versions, but are not replaced.
    #[serde(default)]
    pub references: Vec<StateRef>,
    /// States replaced by this transaction. Each must be the head version.
    #[serde(default)]
    pub consumed: Vec<StateRef>,
    /// New states. A consumed key must be produced again.
    pub produced: Vec<LedgerState>,
    /// Parties whose signatures are required.
    pub signers: Vec<Party>,
}

impl TransactionBody {
    /// Empty body for the given signers.
    pub fn new(signers: Vec<Party>) -> Self {
        Self {
            references: Vec::new(),
            consumed: Vec::new(),
            produced: Vec::new(),
            signers,
        }
    }

    /// Add a read-only reference.
    pub fn reference(mut self, state: StateRef) -> Self {
        self.references.push(state);
        self
    }

    /// Consume a state.
    pub fn consume(mut self, state: StateRef) -> Self {
        self.consumed.push(state);
        self
    }

    /// Produce a state.
    pub fn produce(mut self, state: LedgerState) -> Self {
        self.produced.push(state);
        self
    }

    /// Bytes every signer signs.
    pub fn signing_bytes(&self) -> Result<CanonicalBytes, LedgerError> {
        Ok(CanonicalBytes::new(self)?)
    }

    /// Hex SHA-256 of the signing bytes.
    pub fn id(&self) -> Result<String, LedgerError> {
        Ok(sha256_hex(&self.signing_bytes()?))
    }

    /// True if `did` is a required signer.
    pub fn requires(&self, did: &Did) -> bool {
        self.signers.iter().any(|p| &p.did == did)
    }
}

/// A body with the signatures collected so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Signed content.
    pub body: TransactionBody,
    /// Signer DID → signature over `body`.
    #[serde(default)]
    pub signatures: BTreeMap<Did, Ed25519Signature>,
}

impl Transaction {
    /// Unsigned transaction.
    pub fn new(body: TransactionBody) -> Self {
        Self {
            body,
            signatures: BTreeMap::new(),
        }
    }

    /// Transaction id.
    pub fn id(&self) -> Result<String, LedgerError> {
        self.body.id()
    }

    /// Sign as `signer`, who must be a required signer.
    pub fn sign(&mut self, signer: &dyn Signer) -> Result<(), LedgerError> {
        let party = signer.party();
        if !self.body.signers.contains(&party) {
            return Err(LedgerError::VerificationFailed(format!(
                "{} is not a required signer",
                party.did
            )));
        }
        let bytes = self.body.signing_bytes()?;
        self.signatures.insert(party.did, signer.sign(&bytes));
        Ok(())
    }

    /// Sign and return, for chaining.
    pub fn signed_by(mut self, signer: &dyn Signer) -> Result<Self, LedgerError> {
        self.sign(signer)?;
        Ok(self)
    }

    /// Attach a signature produced elsewhere. It is checked at commit.
    pub fn add_signature(&mut self, did: Did, signature: Ed25519Signature) {
        self.signatures.insert(did, signature);
    }

    /// Signature of `party` over this body, if present and valid.
    pub fn verify_signature_of(&self, party: &Party) -> Result<(), LedgerError> {
        let signature = self.signatures.get(&party.did).ok_or_else(|| {
            LedgerError::VerificationFailed(format!("missing signature from {}", party.did))
        })?;
        let bytes = self.body.signing_bytes()?;
        party.verkey.verify(&bytes, signature).map_err(|e| {
            LedgerError::VerificationFailed(format!("bad signature from {}: {e}", party.did))
        })
    }

    /// Every required signer has signed.
    pub fn verify_signatures(&self) -> Result<(), LedgerError> {
        if self.body.signers.is_empty() {
            return Err(LedgerError::VerificationFailed(
                "transaction names no signers".into(),
            ));
        }
        self.body
            .signers
            .iter()
            .try_for_each(|party| self.verify_signature_of(party))
    }

    /// First produced credential record.
    pub fn produced_credential(&self) -> Option<&CredentialRecord> {
        self.body.produced.iter().find_map(LedgerState::as_credential)
    }

    /// First produced registry state.
    pub fn produced_registry(&self) -> Option<&RevocationRegistryDefinition> {
        self.body.produced.iter().find_map(LedgerState::as_registry)
    }
}

/// Result of a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Transaction id.
    pub tx_id: String,
    /// Ledger-wide sequence number.
    pub seq_no: u64,
    /// Commit time.
    pub committed_at: Timestamp,
    /// New head versions, in `produced` order.
    pub produced: Vec<StateRef>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcl_crypto::Ed25519KeyPair;
    use vcl_vc::Schema;

    fn body(signers: Vec<Party>) -> TransactionBody {
        let issuer = signers[0].did.clone();
        let schema = Schema::new(issuer, "gvt", "1.0", ["age"]).unwrap();
        TransactionBody::new(signers).produce(LedgerState::Schema(schema))
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = Ed25519KeyPair::from_seed_str("issuer");
        let tx = Transaction::new(body(vec![kp.party()]))
            .signed_by(&kp)
            .unwrap();
        tx.verify_signatures().unwrap();
    }

    #[test]
    fn test_missing_signature_rejected() {
        let issuer = Ed25519KeyPair::from_seed_str("issuer");
        let holder = Ed25519KeyPair::from_seed_str("holder");
        let tx = Transaction::new(body(vec![issuer.party(), holder.party()]))
            .signed_by(&issuer)
            .unwrap();
        let err = tx.verify_signatures().unwrap_err();
        assert!(err.to_string().contains("missing signature"));
    }

    #[test]
    fn test_non_signer_cannot_sign() {
        let issuer = Ed25519KeyPair::from_seed_str("issuer");
        let other = Ed25519KeyPair::from_seed_str("other");
        let mut tx = Transaction::new(body(vec![issuer.party()]));
        assert!(tx.sign(&other).is_err());
    }

    #[test]
    fn test_tampered_body_fails_verification() {
        let kp = Ed25519KeyPair::from_seed_str("issuer");
        let mut tx = Transaction::new(body(vec![kp.party()]))
            .signed_by(&kp)
            .unwrap();
        tx.body.references.push(StateRef {
            key: tx.body.produced[0].key(),
            version: 1,
        });
        assert!(tx.verify_signatures().is_err());
    }

    #[test]
    fn test_id_is_stable() {
        let kp = Ed25519KeyPair::from_seed_str("issuer");
        let b = body(vec![kp.party()]);
        assert_eq!(b.id().unwrap(), b.clone().id().unwrap());
        assert_eq!(b.id().unwrap().len(), 64);
    }
}
