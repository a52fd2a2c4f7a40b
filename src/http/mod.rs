//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers)
//!     → request.rs (request ID, trace span)
//!     → POST /tools/execute → Dispatcher
//!     → POST /mcp → mcp.rs (JSON-RPC) → Dispatcher
//!     → JSON response with mapped status
//! ```

pub mod mcp;
pub mod request;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::GatewayServer;
