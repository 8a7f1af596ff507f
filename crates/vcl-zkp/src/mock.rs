//! # Mock Anoncreds Engine
//!
//! A transparent engine for development and testing. It follows the shape
//! of a CL engine (blinded link secret, signed attribute commitments,
//! sub-proofs bound by an aggregate challenge) using only SHA-256 and
//! Ed25519:
//!
//! ```text
//! ms_commitment  = H("vcl/ms" | master_secret)
//! attr_commit(a) = H("vcl/attr" | name | encoded | salt)
//! signature      = Ed25519(cred_def_key, JCS{schema_id, cred_def_id,
//!                  rev_reg_id, rev_idx, ms_commitment, attributes})
//! c_hash         = H("vcl/aggregate" | nonce | JCS(proofs) | JCS(identifiers))
//! ```
//!
//! A sub-proof carries every attribute commitment plus the signature, opens
//! the commitments of revealed and predicate attributes, and for
//! non-revocation names the accumulator and index it was made against.
//!
//! ## Security Warning
//!
//! **NOT PRIVATE.** Predicate proofs open the committed value, the index is
//! visible and `ms_commitment` links sub-proofs across verifiers. The engine
//! exists so that every protocol path runs end to end.

use std::collections::BTreeMap;

use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use vcl_core::{
    CanonicalBytes, CredentialDefinitionId, CredentialId, Did, RevocationRegistryId, SchemaId,
    Sha256Accumulator, SignatureType, Timestamp,
};
use vcl_crypto::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
use vcl_vc::{
    Accumulator, Credential, CredentialDefinition, CredentialOffer, CredentialPrivateKey,
    CredentialRequest, CredentialValues, Identifier, MasterSecret, PredicateType, Proof,
    ProofRequest, RequestedCredentials, RequestedProof, RevealedAttribute, Schema, SubProof,
    SubProofReferent,
};

use crate::traits::{AnoncredsEngine, EngineError, ProofPublicData};

const KEY_TYPE: &str = "mock-ed25519";

#[derive(Debug, Serialize, Deserialize)]
struct MockPublicKey {
    #[serde(rename = "type")]
    key_type: String,
    verkey: Ed25519PublicKey,
}

#[derive(Debug, Serialize, Deserialize)]
struct BlindedSecret {
    ms_commitment: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct BlindingProof {
    c: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct MockSignature {
    ms_commitment: String,
    salts: BTreeMap<String, String>,
    signature: Ed25519Signature,
}

#[derive(Serialize)]
struct SignedBody<'a> {
    schema_id: &'a SchemaId,
    cred_def_id: &'a CredentialDefinitionId,
    rev_reg_id: Option<&'a RevocationRegistryId>,
    rev_idx: Option<u32>,
    ms_commitment: &'a str,
    attributes: &'a BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Opening {
    encoded: String,
    salt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PredicateOpening {
    attr: String,
    p_type: PredicateType,
    p_value: i32,
    encoded: String,
    salt: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct PrimaryProof {
    ms_commitment: String,
    #[serde(default)]
    rev_reg_id: Option<RevocationRegistryId>,
    #[serde(default)]
    rev_idx: Option<u32>,
    attributes: BTreeMap<String, String>,
    revealed: BTreeMap<String, Opening>,
    predicates: Vec<PredicateOpening>,
    signature: Ed25519Signature,
}

#[derive(Debug, Serialize, Deserialize)]
struct NonRevocationProof {
    rev_reg_id: RevocationRegistryId,
    timestamp: Timestamp,
    accumulator: Accumulator,
    rev_idx: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct AggregatedProof {
    c_hash: String,
}

/// Transparent SHA-256 + Ed25519 engine. **NOT PRIVATE.**
#[derive(Debug, Clone, Copy, Default)]
pub struct MockAnoncredsEngine;

impl MockAnoncredsEngine {
    /// A new engine. Stateless.
    pub fn new() -> Self {
        Self
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn ms_commitment(ms: &MasterSecret) -> String {
    let mut acc = Sha256Accumulator::with_domain("vcl/ms");
    acc.update_framed(ms.as_bytes());
    acc.finalize_hex()
}

fn blinding_proof(
    ms_commitment: &str,
    nonce: &str,
    prover_did: &Did,
    cred_def_id: &CredentialDefinitionId,
) -> String {
    let mut acc = Sha256Accumulator::with_domain("vcl/blinding");
    acc.update_framed(ms_commitment.as_bytes());
    acc.update_framed(nonce.as_bytes());
    acc.update_framed(prover_did.as_str().as_bytes());
    acc.update_framed(cred_def_id.to_string().as_bytes());
    acc.finalize_hex()
}

fn attr_commitment(name: &str, encoded: &str, salt: &str) -> String {
    let mut acc = Sha256Accumulator::with_domain("vcl/attr");
    acc.update_framed(name.as_bytes());
    acc.update_framed(encoded.as_bytes());
    acc.update_framed(salt.as_bytes());
    acc.finalize_hex()
}

fn aggregate_hash(
    nonce: &str,
    proofs: &[SubProof],
    identifiers: &[Identifier],
) -> Result<String, EngineError> {
    let mut acc = Sha256Accumulator::with_domain("vcl/aggregate");
    acc.update_framed(nonce.as_bytes());
    acc.update_framed(CanonicalBytes::new(&proofs)?.as_bytes());
    acc.update_framed(CanonicalBytes::new(&identifiers)?.as_bytes());
    Ok(acc.finalize_hex())
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn to_value<T: Serialize>(value: &T) -> Result<serde_json::Value, EngineError> {
    serde_json::to_value(value).map_err(|e| EngineError::Malformed(e.to_string()))
}

fn from_value<T: DeserializeOwned>(value: &serde_json::Value, what: &str) -> Result<T, EngineError> {
    serde_json::from_value(value.clone())
        .map_err(|e| EngineError::Malformed(format!("{what}: {e}")))
}

fn verkey(cred_def: &CredentialDefinition) -> Result<Ed25519PublicKey, EngineError> {
    let key: MockPublicKey = from_value(&cred_def.public_key, "credential definition key")?;
    if key.key_type != KEY_TYPE {
        return Err(EngineError::Malformed(format!(
            "unsupported key type {:?}",
            key.key_type
        )));
    }
    Ok(key.verkey)
}

fn signing_key(private_key: &CredentialPrivateKey) -> Result<Ed25519KeyPair, EngineError> {
    let seed: [u8; 32] = private_key
        .as_bytes()
        .try_into()
        .map_err(|_| EngineError::Malformed("private key must be 32 bytes".into()))?;
    Ok(Ed25519KeyPair::from_seed(&seed))
}

fn commitments(
    values: &CredentialValues,
    salts: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, EngineError> {
    if values.len() != salts.len() {
        return Err(EngineError::InvalidCredentialSignature(
            "salts do not cover the credential values".into(),
        ));
    }
    values
        .iter()
        .map(|(name, value)| {
            let salt = salts.get(name).ok_or_else(|| {
                EngineError::InvalidCredentialSignature(format!("no salt for {name:?}"))
            })?;
            Ok((name.clone(), attr_commitment(name, &value.encoded, salt)))
        })
        .collect()
}

fn signature_valid(
    verkey: &Ed25519PublicKey,
    body: &SignedBody<'_>,
    sig: &Ed25519Signature,
) -> Result<bool, EngineError> {
    let bytes = CanonicalBytes::new(body)?;
    Ok(verkey.verify(&bytes, sig).is_ok())
}

// ── Engine ──────────────────────────────────────────────────────────

impl AnoncredsEngine for MockAnoncredsEngine {
    fn create_credential_definition(
        &self,
        issuer_did: &Did,
        schema: &Schema,
        tag: &str,
        supports_revocation: bool,
    ) -> Result<(CredentialDefinition, CredentialPrivateKey), EngineError> {
        let seq_no = schema.seq_no.ok_or_else(|| {
            EngineError::Malformed(format!("schema {} has no ledger sequence number", schema.id))
        })?;
        let id = CredentialDefinitionId::new(issuer_did.clone(), seq_no, tag)
            .map_err(|e| EngineError::Malformed(e.to_string()))?;
        let mut seed = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut seed);
        let key = Ed25519KeyPair::from_seed(&seed);
        let public_key = to_value(&MockPublicKey {
            key_type: KEY_TYPE.to_string(),
            verkey: key.public_key(),
        })?;
        let cred_def = CredentialDefinition {
            id,
            schema_id: schema.id.clone(),
            issuer_did: issuer_did.clone(),
            tag: tag.to_string(),
            signature_type: SignatureType::CL,
            public_key,
            supports_revocation,
        };
        Ok((cred_def, CredentialPrivateKey::from_bytes(seed.to_vec())))
    }

    fn create_credential_offer(
        &self,
        cred_def: &CredentialDefinition,
    ) -> Result<CredentialOffer, EngineError> {
        Ok(CredentialOffer {
            schema_id: cred_def.schema_id.clone(),
            cred_def_id: cred_def.id.clone(),
            nonce: ProofRequest::generate_nonce(),
        })
    }

    fn create_credential_request(
        &self,
        prover_did: &Did,
        cred_def: &CredentialDefinition,
        offer: &CredentialOffer,
        master_secret: &MasterSecret,
    ) -> Result<CredentialRequest, EngineError> {
        if offer.cred_def_id != cred_def.id {
            return Err(EngineError::Malformed(format!(
                "offer is for {}, not {}",
                offer.cred_def_id, cred_def.id
            )));
        }
        let commitment = ms_commitment(master_secret);
        let c = blinding_proof(&commitment, &offer.nonce, prover_did, &cred_def.id);
        Ok(CredentialRequest {
            prover_did: prover_did.clone(),
            cred_def_id: cred_def.id.clone(),
            blinded_ms: to_value(&BlindedSecret {
                ms_commitment: commitment,
            })?,
            blinded_ms_correctness_proof: to_value(&BlindingProof { c })?,
            nonce: offer.nonce.clone(),
        })
    }

    fn verify_credential_request(
        &self,
        cred_def: &CredentialDefinition,
        offer: &CredentialOffer,
        request: &CredentialRequest,
    ) -> Result<(), EngineError> {
        if request.cred_def_id != cred_def.id || offer.cred_def_id != cred_def.id {
            return Err(EngineError::InvalidCredentialRequest(
                "request, offer and definition disagree".into(),
            ));
        }
        let blinded: BlindedSecret = from_value(&request.blinded_ms, "blinded secret")?;
        let proof: BlindingProof =
            from_value(&request.blinded_ms_correctness_proof, "blinding proof")?;
        let expected = blinding_proof(
            &blinded.ms_commitment,
            &offer.nonce,
            &request.prover_did,
            &cred_def.id,
        );
        if proof.c != expected {
            return Err(EngineError::InvalidCredentialRequest(
                "blinded secret correctness proof does not match the offer".into(),
            ));
        }
        Ok(())
    }

    fn issue_credential(
        &self,
        cred_def: &CredentialDefinition,
        private_key: &CredentialPrivateKey,
        offer: &CredentialOffer,
        request: &CredentialRequest,
        values: &CredentialValues,
        revocation: Option<(&RevocationRegistryId, u32)>,
    ) -> Result<Credential, EngineError> {
        if offer.cred_def_id != cred_def.id || request.cred_def_id != cred_def.id {
            return Err(EngineError::Malformed(
                "offer, request and definition disagree".into(),
            ));
        }
        match (cred_def.supports_revocation, revocation) {
            (true, None) => {
                return Err(EngineError::Malformed(
                    "revocable definition requires a registry index".into(),
                ))
            }
            (false, Some(_)) => {
                return Err(EngineError::Malformed(
                    "definition does not support revocation".into(),
                ))
            }
            (true, Some((rev_reg_id, _))) if rev_reg_id.cred_def_id() != &cred_def.id => {
                return Err(EngineError::Malformed(format!(
                    "registry {rev_reg_id} belongs to another definition"
                )))
            }
            _ => {}
        }
        if values.is_empty() {
            return Err(EngineError::Malformed("no attribute values".into()));
        }
        if let Some((name, _)) = values.iter().find(|(_, v)| !v.is_consistent()) {
            return Err(EngineError::Malformed(format!(
                "attribute {name:?} is not correctly encoded"
            )));
        }
        let key = signing_key(private_key)?;
        if key.public_key() != verkey(cred_def)? {
            return Err(EngineError::Malformed(
                "private key does not match the definition".into(),
            ));
        }
        let blinded: BlindedSecret = from_value(&request.blinded_ms, "blinded secret")?;

        let salts: BTreeMap<String, String> =
            values.keys().map(|name| (name.clone(), random_hex(16))).collect();
        let attributes = commitments(values, &salts)?;
        let rev_reg_id = revocation.map(|(id, _)| id);
        let rev_idx = revocation.map(|(_, idx)| idx);
        let body = SignedBody {
            schema_id: &offer.schema_id,
            cred_def_id: &cred_def.id,
            rev_reg_id,
            rev_idx,
            ms_commitment: &blinded.ms_commitment,
            attributes: &attributes,
        };
        let signature = key.sign(&CanonicalBytes::new(&body)?);

        Ok(Credential {
            schema_id: offer.schema_id.clone(),
            cred_def_id: cred_def.id.clone(),
            rev_reg_id: rev_reg_id.cloned(),
            cred_rev_index: rev_idx,
            values: values.clone(),
            signature: to_value(&MockSignature {
                ms_commitment: blinded.ms_commitment,
                salts,
                signature,
            })?,
        })
    }

    fn process_credential(
        &self,
        credential: &Credential,
        cred_def: &CredentialDefinition,
        master_secret: &MasterSecret,
    ) -> Result<(), EngineError> {
        if credential.cred_def_id != cred_def.id {
            return Err(EngineError::InvalidCredentialSignature(format!(
                "credential is signed under {}, not {}",
                credential.cred_def_id, cred_def.id
            )));
        }
        if let Some((name, _)) = credential.values.iter().find(|(_, v)| !v.is_consistent()) {
            return Err(EngineError::InvalidCredentialSignature(format!(
                "attribute {name:?} is not correctly encoded"
            )));
        }
        let sig: MockSignature = from_value(&credential.signature, "credential signature")?;
        if sig.ms_commitment != ms_commitment(master_secret) {
            return Err(EngineError::InvalidCredentialSignature(
                "credential is not bound to this link secret".into(),
            ));
        }
        let attributes = commitments(&credential.values, &sig.salts)?;
        let body = SignedBody {
            schema_id: &credential.schema_id,
            cred_def_id: &credential.cred_def_id,
            rev_reg_id: credential.rev_reg_id.as_ref(),
            rev_idx: credential.cred_rev_index,
            ms_commitment: &sig.ms_commitment,
            attributes: &attributes,
        };
        if !signature_valid(&verkey(cred_def)?, &body, &sig.signature)? {
            return Err(EngineError::InvalidCredentialSignature(
                "signature does not verify under the definition key".into(),
            ));
        }
        Ok(())
    }

    fn create_proof(
        &self,
        request: &ProofRequest,
        requested: &RequestedCredentials,
        credentials: &BTreeMap<CredentialId, Credential>,
        master_secret: &MasterSecret,
        public: &ProofPublicData,
    ) -> Result<Proof, EngineError> {
        let mut requested_proof = RequestedProof::default();
        for (referent, attr) in &request.requested_attributes {
            if requested.requested_attributes.contains_key(referent) {
                continue;
            }
            match requested.self_attested_attributes.get(referent) {
                Some(value) if attr.restrictions.is_empty() => {
                    requested_proof
                        .self_attested_attrs
                        .insert(referent.clone(), value.clone());
                }
                _ => {
                    return Err(EngineError::Malformed(format!(
                        "attribute referent {referent} is not answered"
                    )))
                }
            }
        }
        if let Some(referent) = request
            .requested_predicates
            .keys()
            .find(|r| !requested.requested_predicates.contains_key(*r))
        {
            return Err(EngineError::Malformed(format!(
                "predicate referent {referent} is not answered"
            )));
        }

        let ms_c = ms_commitment(master_secret);
        let mut proofs = Vec::new();
        let mut identifiers = Vec::new();

        for (index, key) in requested.sub_proof_keys().into_iter().enumerate() {
            let (cred_id, timestamp) = key;
            let sub_proof_index = index as u32;
            let credential = credentials.get(&cred_id).ok_or_else(|| {
                EngineError::Malformed(format!("credential {cred_id} is not in the wallet"))
            })?;
            let sig: MockSignature = from_value(&credential.signature, "credential signature")?;
            if sig.ms_commitment != ms_c {
                return Err(EngineError::Malformed(format!(
                    "credential {cred_id} is bound to a different link secret"
                )));
            }
            let attributes = commitments(&credential.values, &sig.salts)?;
            let opening = |name: &str| -> Result<(String, String), EngineError> {
                let value = credential.values.get(name).ok_or_else(|| {
                    EngineError::Malformed(format!("credential {cred_id} has no attribute {name:?}"))
                })?;
                let salt = sig.salts.get(name).cloned().unwrap_or_default();
                Ok((value.encoded.clone(), salt))
            };

            let mut revealed = BTreeMap::new();
            let mut predicates = Vec::new();
            let mut needs_non_revocation = false;

            for (referent, choice) in &requested.requested_attributes {
                if (choice.cred_id, choice.timestamp) != key {
                    continue;
                }
                let attr = request.requested_attributes.get(referent).ok_or_else(|| {
                    EngineError::Malformed(format!("unknown attribute referent {referent}"))
                })?;
                needs_non_revocation |= request
                    .effective_interval(attr.non_revoked.as_ref())
                    .is_some();
                let (encoded, salt) = opening(&attr.name)?;
                if choice.revealed {
                    let raw = credential.raw(&attr.name).unwrap_or_default().to_string();
                    requested_proof.revealed_attrs.insert(
                        referent.clone(),
                        RevealedAttribute {
                            sub_proof_index,
                            raw,
                            encoded: encoded.clone(),
                        },
                    );
                    revealed.insert(attr.name.clone(), Opening { encoded, salt });
                } else {
                    requested_proof
                        .unrevealed_attrs
                        .insert(referent.clone(), SubProofReferent { sub_proof_index });
                }
            }

            for (referent, choice) in &requested.requested_predicates {
                if (choice.cred_id, choice.timestamp) != key {
                    continue;
                }
                let pred = request.requested_predicates.get(referent).ok_or_else(|| {
                    EngineError::Malformed(format!("unknown predicate referent {referent}"))
                })?;
                needs_non_revocation |= request
                    .effective_interval(pred.non_revoked.as_ref())
                    .is_some();
                let (encoded, salt) = opening(&pred.name)?;
                let satisfied = encoded
                    .parse::<i32>()
                    .map_or(false, |v| pred.p_type.holds(v, pred.p_value));
                if !satisfied {
                    return Err(EngineError::PredicateNotSatisfied {
                        referent: referent.clone(),
                        attribute: pred.name.clone(),
                    });
                }
                predicates.push(PredicateOpening {
                    attr: pred.name.clone(),
                    p_type: pred.p_type,
                    p_value: pred.p_value,
                    encoded,
                    salt,
                });
                requested_proof
                    .predicates
                    .insert(referent.clone(), SubProofReferent { sub_proof_index });
            }

            let non_revocation = match (credential.revocation_info(), timestamp) {
                (Some((rev_reg_id, rev_idx)), Some(ts)) if needs_non_revocation => {
                    let state = public.rev_reg_state(rev_reg_id, ts)?;
                    if !state.is_issued(rev_idx) {
                        return Err(EngineError::Malformed(format!(
                            "index {rev_idx} is not issued in {rev_reg_id} at {ts}"
                        )));
                    }
                    if state.is_revoked(rev_idx) {
                        return Err(EngineError::CredentialRevoked {
                            rev_reg_id: rev_reg_id.clone(),
                            index: rev_idx,
                        });
                    }
                    Some((
                        rev_reg_id.clone(),
                        ts,
                        to_value(&NonRevocationProof {
                            rev_reg_id: rev_reg_id.clone(),
                            timestamp: ts,
                            accumulator: state.accumulator.clone(),
                            rev_idx,
                        })?,
                    ))
                }
                _ => None,
            };

            let primary = PrimaryProof {
                ms_commitment: ms_c.clone(),
                rev_reg_id: credential.rev_reg_id.clone(),
                rev_idx: credential.cred_rev_index,
                attributes,
                revealed,
                predicates,
                signature: sig.signature,
            };
            identifiers.push(Identifier {
                schema_id: credential.schema_id.clone(),
                cred_def_id: credential.cred_def_id.clone(),
                rev_reg_id: non_revocation.as_ref().map(|(id, _, _)| id.clone()),
                timestamp: non_revocation.as_ref().map(|(_, ts, _)| *ts),
            });
            proofs.push(SubProof {
                primary_proof: to_value(&primary)?,
                non_revocation_proof: non_revocation.map(|(_, _, proof)| proof),
            });
        }

        let c_hash = aggregate_hash(&request.nonce, &proofs, &identifiers)?;
        Ok(Proof {
            proofs,
            aggregated_proof: to_value(&AggregatedProof { c_hash })?,
            requested_proof,
            identifiers,
        })
    }

    fn verify_proof(
        &self,
        request: &ProofRequest,
        proof: &Proof,
        public: &ProofPublicData,
    ) -> Result<bool, EngineError> {
        if proof.proofs.len() != proof.identifiers.len() {
            return Ok(false);
        }
        let aggregated: AggregatedProof = from_value(&proof.aggregated_proof, "aggregated proof")?;
        if aggregated.c_hash != aggregate_hash(&request.nonce, &proof.proofs, &proof.identifiers)? {
            return Ok(false);
        }

        let rp = &proof.requested_proof;
        let mut link: Option<String> = None;

        for (i, (sub, ident)) in proof.proofs.iter().zip(&proof.identifiers).enumerate() {
            let i = i as u32;
            let primary: PrimaryProof = from_value(&sub.primary_proof, "primary proof")?;
            match &link {
                None => link = Some(primary.ms_commitment.clone()),
                Some(m) if *m != primary.ms_commitment => return Ok(false),
                Some(_) => {}
            }

            let cred_def = public.cred_def(&ident.cred_def_id)?;
            let body = SignedBody {
                schema_id: &ident.schema_id,
                cred_def_id: &ident.cred_def_id,
                rev_reg_id: primary.rev_reg_id.as_ref(),
                rev_idx: primary.rev_idx,
                ms_commitment: &primary.ms_commitment,
                attributes: &primary.attributes,
            };
            if !signature_valid(&verkey(cred_def)?, &body, &primary.signature)? {
                return Ok(false);
            }

            let opens = |name: &str, encoded: &str, salt: &str| {
                primary.attributes.get(name).map(String::as_str)
                    == Some(attr_commitment(name, encoded, salt).as_str())
            };

            let revealed_here = rp.revealed_attrs.iter().filter(|(_, a)| a.sub_proof_index == i);
            for (referent, revealed) in revealed_here {
                let Some(attr) = request.requested_attributes.get(referent) else {
                    return Ok(false);
                };
                let Some(opening) = primary.revealed.get(&attr.name) else {
                    return Ok(false);
                };
                if opening.encoded != revealed.encoded
                    || !opens(&attr.name, &opening.encoded, &opening.salt)
                {
                    return Ok(false);
                }
            }

            let unrevealed_here = rp.unrevealed_attrs.iter().filter(|(_, r)| r.sub_proof_index == i);
            for (referent, _) in unrevealed_here {
                let Some(attr) = request.requested_attributes.get(referent) else {
                    return Ok(false);
                };
                if !primary.attributes.contains_key(&attr.name) {
                    return Ok(false);
                }
            }

            let predicates_here = rp.predicates.iter().filter(|(_, r)| r.sub_proof_index == i);
            for (referent, _) in predicates_here {
                let Some(pred) = request.requested_predicates.get(referent) else {
                    return Ok(false);
                };
                let Some(opening) = primary.predicates.iter().find(|p| {
                    p.attr == pred.name && p.p_type == pred.p_type && p.p_value == pred.p_value
                }) else {
                    return Ok(false);
                };
                let holds = opening
                    .encoded
                    .parse::<i32>()
                    .map_or(false, |v| pred.p_type.holds(v, pred.p_value));
                if !holds || !opens(&pred.name, &opening.encoded, &opening.salt) {
                    return Ok(false);
                }
            }

            if let Some(rev_reg_id) = &ident.rev_reg_id {
                let (Some(nrp), Some(ts)) = (&sub.non_revocation_proof, ident.timestamp) else {
                    return Ok(false);
                };
                let nrp: NonRevocationProof = from_value(nrp, "non-revocation proof")?;
                if &nrp.rev_reg_id != rev_reg_id
                    || primary.rev_reg_id.as_ref() != Some(rev_reg_id)
                    || nrp.timestamp != ts
                    || primary.rev_idx != Some(nrp.rev_idx)
                {
                    return Ok(false);
                }
                let state = public.rev_reg_state(rev_reg_id, ts)?;
                if state.accumulator != nrp.accumulator
                    || !state.is_issued(nrp.rev_idx)
                    || state.is_revoked(nrp.rev_idx)
                {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcl_vc::{
        AttributeReference, NonRevokedInterval, PredicateReference, ProofRequestBuilder,
        RevocationRegistryDefinition,
    };

    const ISSUER: &str = "NcYxiDXkpYi6ov5FcYDi1e";
    const HOLDER: &str = "VsKV7grR1BUE29mG2Fm2kX";

    struct Fixture {
        engine: MockAnoncredsEngine,
        cred_def: CredentialDefinition,
        key: CredentialPrivateKey,
        registry: RevocationRegistryDefinition,
        ms: MasterSecret,
    }

    fn fixture(revocable: bool) -> Fixture {
        let engine = MockAnoncredsEngine::new();
        let issuer = Did::new(ISSUER).unwrap();
        let mut schema = Schema::new(issuer.clone(), "gvt", "1.0", ["name", "age"]).unwrap();
        schema.seq_no = Some(14);
        let (cred_def, key) = engine
            .create_credential_definition(&issuer, &schema, "default", revocable)
            .unwrap();
        let registry = RevocationRegistryDefinition::create(&cred_def.id, "r1", 5).unwrap();
        Fixture {
            engine,
            cred_def,
            key,
            registry,
            ms: MasterSecret::generate(),
        }
    }

    fn values(age: &str) -> CredentialValues {
        let mut v = CredentialValues::new();
        v.insert("name".into(), vcl_vc::AttributeValue::new("Alex"));
        v.insert("age".into(), vcl_vc::AttributeValue::new(age));
        v
    }

    fn issue(f: &mut Fixture, age: &str) -> Credential {
        let holder = Did::new(HOLDER).unwrap();
        let offer = f.engine.create_credential_offer(&f.cred_def).unwrap();
        let req = f
            .engine
            .create_credential_request(&holder, &f.cred_def, &offer, &f.ms)
            .unwrap();
        f.engine
            .verify_credential_request(&f.cred_def, &offer, &req)
            .unwrap();
        let revocation = if f.cred_def.supports_revocation {
            let (next, idx, _) = f.registry.reserve_next_index().unwrap();
            f.registry = next;
            Some(idx)
        } else {
            None
        };
        let cred = f
            .engine
            .issue_credential(
                &f.cred_def,
                &f.key,
                &offer,
                &req,
                &values(age),
                revocation.map(|i| (&f.registry.id, i)),
            )
            .unwrap();
        f.engine.process_credential(&cred, &f.cred_def, &f.ms).unwrap();
        cred
    }

    fn public(f: &Fixture, ts: Timestamp) -> ProofPublicData {
        let mut p = ProofPublicData::default();
        p.cred_defs.insert(f.cred_def.id.clone(), f.cred_def.clone());
        p.rev_reg_states
            .insert((f.registry.id.clone(), ts), f.registry.clone());
        p
    }

    fn age_request(interval: Option<NonRevokedInterval>) -> ProofRequest {
        let mut b = ProofRequestBuilder::new("kyc", "1.0", "1234567890")
            .attribute(AttributeReference::new("name"))
            .predicate(PredicateReference::new("age", PredicateType::GE, 18));
        if let Some(i) = interval {
            b = b.non_revoked(i);
        }
        b.build().unwrap()
    }

    fn wallet(cred: Credential) -> (CredentialId, BTreeMap<CredentialId, Credential>) {
        let id = CredentialId::new();
        (id, BTreeMap::from([(id, cred)]))
    }

    fn ts() -> Timestamp {
        Timestamp::parse("2026-03-01T00:00:00Z").unwrap()
    }

    // ── Issuance ────────────────────────────────────────────────────

    #[test]
    fn test_request_bound_to_offer_nonce() {
        let f = fixture(false);
        let holder = Did::new(HOLDER).unwrap();
        let offer = f.engine.create_credential_offer(&f.cred_def).unwrap();
        let req = f
            .engine
            .create_credential_request(&holder, &f.cred_def, &offer, &f.ms)
            .unwrap();
        assert_eq!(req.nonce, offer.nonce);
        let other = f.engine.create_credential_offer(&f.cred_def).unwrap();
        assert!(matches!(
            f.engine.verify_credential_request(&f.cred_def, &other, &req),
            Err(EngineError::InvalidCredentialRequest(_))
        ));
    }

    #[test]
    fn test_process_rejects_foreign_link_secret() {
        let mut f = fixture(false);
        let cred = issue(&mut f, "28");
        assert!(matches!(
            f.engine
                .process_credential(&cred, &f.cred_def, &MasterSecret::generate()),
            Err(EngineError::InvalidCredentialSignature(_))
        ));
    }

    #[test]
    fn test_process_rejects_tampered_value() {
        let mut f = fixture(false);
        let mut cred = issue(&mut f, "28");
        cred.values
            .insert("age".into(), vcl_vc::AttributeValue::new("99"));
        assert!(f.engine.process_credential(&cred, &f.cred_def, &f.ms).is_err());
    }

    #[test]
    fn test_issue_requires_index_for_revocable_definition() {
        let f = fixture(true);
        let holder = Did::new(HOLDER).unwrap();
        let offer = f.engine.create_credential_offer(&f.cred_def).unwrap();
        let req = f
            .engine
            .create_credential_request(&holder, &f.cred_def, &offer, &f.ms)
            .unwrap();
        assert!(f
            .engine
            .issue_credential(&f.cred_def, &f.key, &offer, &req, &values("1"), None)
            .is_err());
    }

    #[test]
    fn test_cred_def_requires_seq_no() {
        let engine = MockAnoncredsEngine::new();
        let issuer = Did::new(ISSUER).unwrap();
        let schema = Schema::new(issuer.clone(), "gvt", "1.0", ["age"]).unwrap();
        assert!(engine
            .create_credential_definition(&issuer, &schema, "t", false)
            .is_err());
    }

    // ── Proofs ──────────────────────────────────────────────────────

    #[test]
    fn test_proof_roundtrip_with_predicate() {
        let mut f = fixture(false);
        let cred = issue(&mut f, "28");
        let (id, creds) = wallet(cred);
        let req = age_request(None);
        let rc = RequestedCredentials::default()
            .attribute("attr1_referent", id, true, None)
            .predicate("predicate1_referent", id, None);
        let proof = f
            .engine
            .create_proof(&req, &rc, &creds, &f.ms, &ProofPublicData::default())
            .unwrap();
        assert_eq!(proof.proofs.len(), 1);
        assert_eq!(proof.requested_proof.revealed_attrs["attr1_referent"].raw, "Alex");
        assert!(f.engine.verify_proof(&req, &proof, &public(&f, ts())).unwrap());
    }

    #[test]
    fn test_unsatisfied_predicate_is_engine_error() {
        let mut f = fixture(false);
        let (id, creds) = wallet(issue(&mut f, "17"));
        let rc = RequestedCredentials::default()
            .attribute("attr1_referent", id, true, None)
            .predicate("predicate1_referent", id, None);
        let err = f
            .engine
            .create_proof(&age_request(None), &rc, &creds, &f.ms, &ProofPublicData::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::PredicateNotSatisfied { .. }));
    }

    #[test]
    fn test_tampered_revealed_value_fails() {
        let mut f = fixture(false);
        let (id, creds) = wallet(issue(&mut f, "28"));
        let req = age_request(None);
        let rc = RequestedCredentials::default()
            .attribute("attr1_referent", id, true, None)
            .predicate("predicate1_referent", id, None);
        let mut proof = f
            .engine
            .create_proof(&req, &rc, &creds, &f.ms, &ProofPublicData::default())
            .unwrap();
        let forged = vcl_vc::AttributeValue::new("Mallory");
        let entry = proof
            .requested_proof
            .revealed_attrs
            .get_mut("attr1_referent")
            .unwrap();
        entry.raw = forged.raw;
        entry.encoded = forged.encoded;
        assert!(!f.engine.verify_proof(&req, &proof, &public(&f, ts())).unwrap());
    }

    #[test]
    fn test_proof_bound_to_request_nonce() {
        let mut f = fixture(false);
        let (id, creds) = wallet(issue(&mut f, "28"));
        let req = age_request(None);
        let rc = RequestedCredentials::default()
            .attribute("attr1_referent", id, true, None)
            .predicate("predicate1_referent", id, None);
        let proof = f
            .engine
            .create_proof(&req, &rc, &creds, &f.ms, &ProofPublicData::default())
            .unwrap();
        let mut replay = req.clone();
        replay.nonce = "999".into();
        assert!(!f.engine.verify_proof(&replay, &proof, &public(&f, ts())).unwrap());
    }

    #[test]
    fn test_wrong_cred_def_key_fails() {
        let mut f = fixture(false);
        let (id, creds) = wallet(issue(&mut f, "28"));
        let req = age_request(None);
        let rc = RequestedCredentials::default()
            .attribute("attr1_referent", id, true, None)
            .predicate("predicate1_referent", id, None);
        let proof = f
            .engine
            .create_proof(&req, &rc, &creds, &f.ms, &ProofPublicData::default())
            .unwrap();
        let mut data = public(&f, ts());
        let other = fixture(false);
        data.cred_defs.get_mut(&f.cred_def.id).unwrap().public_key = other.cred_def.public_key;
        assert!(!f.engine.verify_proof(&req, &proof, &data).unwrap());
    }

    // ── Non-revocation ──────────────────────────────────────────────

    #[test]
    fn test_non_revocation_against_registry_state() {
        let mut f = fixture(true);
        let (id, creds) = wallet(issue(&mut f, "28"));
        let req = age_request(Some(NonRevokedInterval::at(ts())));
        let rc = RequestedCredentials::default()
            .attribute("attr1_referent", id, true, Some(ts()))
            .predicate("predicate1_referent", id, Some(ts()));
        let proof = f
            .engine
            .create_proof(&req, &rc, &creds, &f.ms, &public(&f, ts()))
            .unwrap();
        assert!(proof.proofs[0].non_revocation_proof.is_some());
        assert_eq!(proof.identifiers[0].timestamp, Some(ts()));
        assert!(f.engine.verify_proof(&req, &proof, &public(&f, ts())).unwrap());

        // Same proof against a registry state where the index is revoked.
        let (revoked, _) = f.registry.revoke(0).unwrap();
        f.registry = revoked;
        assert!(!f.engine.verify_proof(&req, &proof, &public(&f, ts())).unwrap());

        // And no new proof can be made.
        assert!(matches!(
            f.engine.create_proof(&req, &rc, &creds, &f.ms, &public(&f, ts())),
            Err(EngineError::CredentialRevoked { index: 0, .. })
        ));
    }

    #[test]
    fn test_missing_registry_state_is_error() {
        let mut f = fixture(true);
        let (id, creds) = wallet(issue(&mut f, "28"));
        let req = age_request(Some(NonRevokedInterval::at(ts())));
        let rc = RequestedCredentials::default()
            .attribute("attr1_referent", id, true, Some(ts()))
            .predicate("predicate1_referent", id, Some(ts()));
        assert!(matches!(
            f.engine
                .create_proof(&req, &rc, &creds, &f.ms, &ProofPublicData::default()),
            Err(EngineError::MissingPublicData(_))
        ));
    }

    #[test]
    fn test_unanswered_referent_is_malformed() {
        let mut f = fixture(false);
        let (id, creds) = wallet(issue(&mut f, "28"));
        let rc = RequestedCredentials::default().attribute("attr1_referent", id, true, None);
        assert!(matches!(
            f.engine.create_proof(
                &age_request(None),
                &rc,
                &creds,
                &f.ms,
                &ProofPublicData::default()
            ),
            Err(EngineError::Malformed(_))
        ));
    }
}
