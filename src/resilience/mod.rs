//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Capability call:
//!     → timeouts.rs (derive deadline + cancellation token from timeout_ms)
//!     → capability runs, observing the token cooperatively
//!     → deadline wins: token cancelled, call reported as `timeout`
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every capability call has a deadline
//! - No retries: a failed call is reported once

pub mod timeouts;

pub use timeouts::{run_with_deadline, DeadlineExceeded, ToolContext};
