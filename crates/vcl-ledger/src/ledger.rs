//! The ledger seam.

use async_trait::async_trait;
use vcl_core::Timestamp;

use crate::error::LedgerError;
use crate::state::{LedgerKey, VersionedState};
use crate::transaction::{Commit, Transaction};

/// A shared ledger of versioned states.
///
/// Reads never block on commits for longer than a copy. Implementations must
/// apply `propose_transaction` atomically: either every produced state is
/// committed with the same sequence number, or none is.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Head version of `key`.
    async fn read(&self, key: &LedgerKey) -> Result<Option<VersionedState>, LedgerError>;

    /// Version of `key` in force at `at`: the last one committed at or
    /// before `at`.
    async fn read_as_of(
        &self,
        key: &LedgerKey,
        at: Timestamp,
    ) -> Result<Option<VersionedState>, LedgerError>;

    /// Every version of `key`, oldest first.
    async fn history(&self, key: &LedgerKey) -> Result<Vec<VersionedState>, LedgerError>;

    /// Validate and commit.
    async fn propose_transaction(&self, tx: Transaction) -> Result<Commit, LedgerError>;

    /// Ledger time.
    fn now(&self) -> Timestamp;
}
