//! # vcl-ledger — Ledger Collaborator
//!
//! The shared ledger stores one versioned state object per key. States are
//! never updated in place: a transaction *consumes* the current version of
//! some keys and *produces* new versions, atomically, or not at all.
//!
//! - **States** (`state.rs`): `LedgerState`, the tagged union of schema,
//!   credential definition, revocation registry and credential record.
//! - **Transactions** (`transaction.rs`): a canonical body plus Ed25519
//!   signatures from every required party.
//! - **Rules** (`rules.rs`): contract-level validity checks applied at
//!   commit time.
//! - **`Ledger`** (`ledger.rs`): the async trait the protocols use, and
//!   `InMemoryLedger` (`memory.rs`), its reference implementation.
//! - **Clocks** (`clock.rs`): commit timestamps come from a `Clock`, so tests
//!   can pin time.
//!
//! ## Concurrency
//!
//! A transaction is accepted only if every consumed state is still the head
//! version of its key. Two transactions consuming the same registry head
//! therefore serialize: the loser fails with `NotarizationFailed` and must
//! start over from fresh reads.

pub mod clock;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod rules;
pub mod state;
pub mod transaction;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::LedgerError;
pub use ledger::Ledger;
pub use memory::InMemoryLedger;
pub use state::{LedgerKey, LedgerKind, LedgerState, StateRef, VersionedState};
pub use transaction::{Commit, Transaction, TransactionBody};
