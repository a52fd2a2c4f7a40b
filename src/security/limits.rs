//! Output size limits.
//!
//! # Responsibilities
//! - Bound the serialized size of a tool result
//! - Substitute a fixed marker object for oversized results
//!
//! # Design Decisions
//! - A bound of zero disables truncation
//! - Serialization failures fail open: the original value is returned
//! - Size is measured on the redacted value, so markers count toward it

use serde_json::{json, Value};

/// Result of bounding a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounded {
    pub value: Value,
    pub truncated: bool,
}

/// Bound `value` to at most `max_bytes` of serialized JSON.
pub fn bound(value: Value, max_bytes: usize) -> Bounded {
    if max_bytes == 0 {
        return Bounded {
            value,
            truncated: false,
        };
    }
    let original_size = match serde_json::to_vec(&value) {
        Ok(payload) => payload.len(),
        Err(error) => {
            tracing::debug!(error = %error, "Result not serializable, skipping truncation");
            return Bounded {
                value,
                truncated: false,
            };
        }
    };
    if original_size <= max_bytes {
        return Bounded {
            value,
            truncated: false,
        };
    }
    Bounded {
        value: truncation_marker(original_size, max_bytes),
        truncated: true,
    }
}

/// The object that replaces an oversized result.
pub fn truncation_marker(original_size: usize, returned_size: usize) -> Value {
    json!({
        "truncated": true,
        "original_size": original_size,
        "returned_size": returned_size,
    })
}
