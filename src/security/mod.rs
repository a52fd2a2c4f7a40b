//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming tool call:
//!     → allowlist.rs (is the namespace in the tenancy allowlist?)
//!     → [capability runs]
//!     → redaction.rs (scrub secret-shaped fields)
//!     → limits.rs (bound serialized output size)
//!     → Response to caller
//! ```
//!
//! # Design Decisions
//! - Fail closed on authorization: empty allowlist denies all
//! - Fail open on post-processing: redaction and truncation never error
//! - No trust in caller-supplied arguments

pub mod allowlist;
pub mod limits;
pub mod redaction;

pub use allowlist::AllowedNamespaces;
pub use limits::{bound, Bounded};
pub use redaction::{redact, REDACTED};
