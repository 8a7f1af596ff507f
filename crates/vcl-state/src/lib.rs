//! # vcl-state — Typestate Issuance Sessions
//!
//! The issuance handshake `Offered → Requested → Issued → Acknowledged`
//! is encoded twice, once per role. Each stage is a distinct Rust type and
//! carries exactly the data that exists at that point of the exchange;
//! transitions consume the session and return the next stage.
//!
//! - **Issuer** (`issuer.rs`): `IssuerSession<issuer::Offered>` through
//!   `IssuerSession<issuer::Acknowledged>`, whose transaction is ready to
//!   commit.
//! - **Holder** (`holder.rs`): `HolderSession<holder::Offered>` through
//!   `HolderSession<holder::Acknowledged>`, which accepts the credential
//!   only once the matching commit is seen.
//! - **Session** (`session.rs`): the runtime `IssuanceState`, transition log,
//!   session key, and `SessionError`.
//!
//! No I/O happens here. The engine, the ledger, and the channel are driven by
//! `vcl-protocol`, which feeds their results into these transitions.
//!
//! ```compile_fail
//! use vcl_state::{IssuerSession, issuer};
//!
//! fn skip(session: IssuerSession<issuer::Offered>) {
//!     // ERROR: no method named `receive_acknowledgement` on an offered session
//!     let _ = session.receive_acknowledgement(todo!());
//! }
//! ```

pub mod holder;
pub mod issuer;
pub mod session;

pub use holder::HolderSession;
pub use issuer::IssuerSession;
pub use session::{IssuanceState, IssuanceTransition, SessionError, SessionKey, Stage};
