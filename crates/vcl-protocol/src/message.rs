//! Messages of the issuance handshake.

use serde::{Deserialize, Serialize};
use vcl_crypto::{Ed25519Signature, Party};
use vcl_ledger::{Commit, Transaction};
use vcl_vc::{CredentialOffer, CredentialRecord, CredentialRequest};

/// One step of the exchange, in either direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IssuanceMessage {
    /// Issuer → holder.
    Offer {
        /// Who offers.
        issuer: Party,
        /// The offer.
        offer: CredentialOffer,
    },
    /// Holder → issuer.
    Request {
        /// Who requests; its key co-signs the transaction.
        holder: Party,
        /// The request.
        request: CredentialRequest,
    },
    /// Issuer → holder: the credential and the issuer-signed transaction.
    Proposal {
        /// Record to commit.
        record: CredentialRecord,
        /// Transaction committing it.
        transaction: Transaction,
    },
    /// Holder → issuer: co-signature over the transaction body.
    Acknowledge {
        /// Holder signature.
        signature: Ed25519Signature,
    },
    /// Issuer → holder: the ledger accepted the transaction.
    Finalized {
        /// Commit receipt.
        commit: Commit,
    },
    /// Either direction: the exchange is over.
    Abort {
        /// Why.
        reason: String,
    },
}

impl IssuanceMessage {
    /// Message name, for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Offer { .. } => "offer",
            Self::Request { .. } => "request",
            Self::Proposal { .. } => "proposal",
            Self::Acknowledge { .. } => "acknowledge",
            Self::Finalized { .. } => "finalized",
            Self::Abort { .. } => "abort",
        }
    }
}
