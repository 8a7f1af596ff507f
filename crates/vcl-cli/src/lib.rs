//! # vcl-cli — Credential Ledger Command-Line Interface
//!
//! ## Subcommands
//!
//! - `id`: parse ledger identifiers into their parts, or format parts into
//!   an identifier
//! - `encode`: attribute encoding as signed by issuers
//! - `demo`: the whole credential lifecycle against an in-memory ledger
//!
//! ## Crate Policy
//!
//! - Argument parsing lives in `main.rs`; handlers live in their modules and
//!   return an exit code.
//! - Handlers delegate to the domain crates. No protocol logic here.
//! - Tracing is initialised only in the binary.

pub mod config;
pub mod demo;
pub mod encode;
pub mod id;
