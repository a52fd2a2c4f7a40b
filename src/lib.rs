//! Guarded tool-execution gateway.
//!
//! Exposes a fixed set of read-only Kubernetes tools over HTTP and MCP,
//! with namespace allowlisting, secret redaction, output bounding,
//! per-call deadlines, trace continuation and daily-rotated audit logs.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;
pub mod tools;

pub use config::schema::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use tools::{Dispatcher, ToolRegistry};
