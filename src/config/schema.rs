//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the tool gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Tool execution policy: allowlist, output bound, default deadline.
    pub tools: ToolsConfig,

    /// Where the backing cluster client gets its data.
    pub cluster: ClusterConfig,

    /// Timeout configuration for the HTTP surface.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Request hardening.
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Tool execution policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Comma-separated namespace allowlist. Empty denies every namespace.
    pub allowed_namespaces: String,

    /// Maximum serialized result size in bytes (0 = unbounded).
    pub max_output_bytes: usize,

    /// Deadline for calls that do not specify `timeout_ms`.
    pub default_timeout_ms: u64,
}

impl ToolsConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            allowed_namespaces: String::new(),
            max_output_bytes: 0,
            default_timeout_ms: 1000,
        }
    }
}

/// Backing cluster source.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClusterConfig {
    /// Path to a JSON inventory snapshot, re-read for every call.
    pub snapshot_path: Option<String>,
}

/// Timeout configuration for the HTTP surface.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Hard ceiling on a whole HTTP request in seconds.
    pub request_secs: u64,
}

impl TimeoutConfig {
    /// Longest deadline a tool call may run under: 90% of `request_secs`,
    /// so the call's own timeout fires before the HTTP layer's.
    pub fn tool_ceiling(&self) -> Duration {
        Duration::from_millis(self.request_secs.saturating_mul(900))
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Base path of the daily rotating log file. Required.
    pub log_file: String,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_file: String::new(),
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}
