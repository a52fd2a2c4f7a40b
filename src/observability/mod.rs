//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Each tool call produces:
//!     → tracing.rs (one `tool.call` span, continued from the caller's trace)
//!     → audit.rs (tool_call / tool_result JSON lines)
//!     → metrics.rs (counters, latency histogram)
//!
//! Sinks:
//!     → logging.rs (JSON to stdout + rotation.rs)
//!     → rotation.rs (one file per local calendar day)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - A single rotating file handle per process, shared by reference
//! - Trace, span, session and run ids flow into every audit record
//! - Metrics are cheap (atomic increments)

pub mod audit;
pub mod logging;
pub mod metrics;
pub mod rotation;
pub mod tracing;

pub use audit::{AuditError, AuditEvent, AuditLog, Correlation, SERVICE_NAME};
pub use rotation::{Clock, RotatingFile, SystemClock};
pub use self::tracing::{start_span, FinishedSpan, ToolSpan, TraceContext};
