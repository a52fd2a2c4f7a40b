//! Tool registry and dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! JSON envelope
//!     → types.rs (ToolCall → ToolRequest, instrumentation stripped)
//!     → dispatcher.rs (resolve, authorize, acquire client)
//!     → registry.rs (ToolSpec lookup)
//!     → handlers.rs (capability) → cluster.rs (ClusterClient)
//!     → dispatcher.rs (redact, bound, end span, audit)
//!     → ToolResponse
//! ```

pub mod cluster;
pub mod dispatcher;
pub mod handlers;
pub mod registry;
pub mod types;

pub use cluster::{ClientFactory, ClusterClient, ClusterError, SnapshotClient, SnapshotClientFactory};
pub use dispatcher::{Dispatched, Dispatcher};
pub use registry::{Scope, ToolRegistry, ToolSpec};
pub use types::{ErrorKind, ToolCall, ToolError, ToolResponse};
