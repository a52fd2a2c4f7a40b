//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, overlay environment)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc<ArcSwap<_>> to the dispatcher and server
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the Arc<GatewayConfig>
//!     → next tool call sees the new allowlist and output bound
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - The tool registry is not part of config and never reloads

use std::sync::Arc;

use arc_swap::ArcSwap;

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ClusterConfig, GatewayConfig, ListenerConfig, ObservabilityConfig, SecurityConfig,
    TimeoutConfig, ToolsConfig,
};

/// Live configuration, swapped atomically on reload.
pub type SharedConfig = Arc<ArcSwap<GatewayConfig>>;

pub fn shared(config: GatewayConfig) -> SharedConfig {
    Arc::new(ArcSwap::from_pointee(config))
}
