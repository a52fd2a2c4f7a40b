//! Secret redaction for tool results.
//!
//! Any object key that contains `token`, `secret`, `password`, `apikey` or
//! `api_key` (case-insensitive) has its value replaced with [`REDACTED`],
//! whatever the value's type and however deep the object sits.

use serde_json::{Map, Value};

/// Replacement written over secret-shaped values.
pub const REDACTED: &str = "[REDACTED]";

const SECRET_MARKERS: [&str; 5] = ["token", "secret", "password", "apikey", "api_key"];

/// Whether an object key names something that must not leave the gateway.
pub fn is_secret_key(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    SECRET_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Return a copy of `value` with every secret-shaped field scrubbed.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                if is_secret_key(key) {
                    out.insert(key.clone(), Value::String(REDACTED.to_string()));
                } else {
                    out.insert(key.clone(), redact(inner));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        scalar => scalar.clone(),
    }
}
