//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides, and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay recognized environment variables onto `config`.
///
/// Numeric values that do not parse leave the current value in place.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = lookup("TOOL_SERVER_ADDR").filter(|v| !v.is_empty()) {
        config.listener.bind_address = normalize_addr(&addr);
    }
    if let Some(raw) = lookup("K8S_ALLOWED_NAMESPACES") {
        config.tools.allowed_namespaces = raw;
    }
    if let Some(bytes) = lookup("TOOL_MAX_OUTPUT_BYTES").and_then(|v| parse_output_bound(&v)) {
        config.tools.max_output_bytes = bytes;
    }
    if let Some(ms) = lookup("TOOL_TIMEOUT_MS").and_then(|v| v.trim().parse::<u64>().ok()) {
        config.tools.default_timeout_ms = ms;
    }
    if let Some(path) = lookup("TOOL_SERVER_LOG_FILE").filter(|v| !v.is_empty()) {
        config.observability.log_file = path;
    }
    if let Some(level) = lookup("LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
        config.observability.log_level = level.trim().to_string();
    }
    if let Some(path) = lookup("CLUSTER_SNAPSHOT_PATH").filter(|v| !v.is_empty()) {
        config.cluster.snapshot_path = Some(path);
    }
}

/// Negative bounds mean "unbounded", same as zero.
fn parse_output_bound(raw: &str) -> Option<usize> {
    let n = raw.trim().parse::<i64>().ok()?;
    Some(usize::try_from(n).unwrap_or(0))
}

/// ":8080" is shorthand for "0.0.0.0:8080".
fn normalize_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("TOOL_SERVER_ADDR", ":9000"),
                ("K8S_ALLOWED_NAMESPACES", "default, dev"),
                ("TOOL_MAX_OUTPUT_BYTES", "4096"),
                ("TOOL_TIMEOUT_MS", "250"),
                ("TOOL_SERVER_LOG_FILE", "/var/log/gw.log"),
                ("LOG_LEVEL", " DEBUG "),
                ("CLUSTER_SNAPSHOT_PATH", "/etc/gw/cluster.json"),
            ]),
        );
        assert_eq!(config.listener.bind_address, "0.0.0.0:9000");
        assert_eq!(config.tools.allowed_namespaces, "default, dev");
        assert_eq!(config.tools.max_output_bytes, 4096);
        assert_eq!(config.tools.default_timeout_ms, 250);
        assert_eq!(config.observability.log_file, "/var/log/gw.log");
        assert_eq!(config.observability.log_level, "DEBUG");
        assert_eq!(
            config.cluster.snapshot_path.as_deref(),
            Some("/etc/gw/cluster.json")
        );
    }

    #[test]
    fn test_bad_numbers_keep_current_values() {
        let mut config = GatewayConfig::default();
        config.tools.max_output_bytes = 10;
        apply_env_overrides(
            &mut config,
            env(&[("TOOL_MAX_OUTPUT_BYTES", "lots"), ("TOOL_TIMEOUT_MS", "-5")]),
        );
        assert_eq!(config.tools.max_output_bytes, 10);
        assert_eq!(config.tools.default_timeout_ms, 1000);

        apply_env_overrides(&mut config, env(&[("TOOL_MAX_OUTPUT_BYTES", "-1")]));
        assert_eq!(config.tools.max_output_bytes, 0);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [listener]
            bind_address = "127.0.0.1:18080"

            [tools]
            allowed_namespaces = "payments"
            max_output_bytes = 2048

            [observability]
            log_file = "/tmp/gw-test.log"
            "#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.tools.max_output_bytes, 2048);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[observability]\nlog_file = \"\"\n[listener]\nbind_address = \"x\"").unwrap();
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
