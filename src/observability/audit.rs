//! Structured audit records for tool calls.
//!
//! Every record is a single JSON line written through the shared
//! [`RotatingFile`], so a line is never split across a rotation.

use std::io;
use std::sync::Arc;

use chrono::{Local, SecondsFormat};
use serde::Serialize;

use crate::observability::rotation::RotatingFile;

/// Fixed service and component identifier on every record.
pub const SERVICE_NAME: &str = "tool-gateway";

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("failed to encode audit record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write audit record: {0}")]
    Write(#[from] io::Error),
}

/// Correlation ids shared by every record of one request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Correlation {
    pub trace_id: String,
    pub span_id: String,
    pub session_id: String,
    pub agent_run_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A call was accepted for dispatch.
    ToolCall {
        tool_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
        arg_keys: Vec<String>,
    },
    /// A call finished, successfully or not.
    ToolResult {
        tool_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
        outcome: &'static str,
        truncated: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_type: Option<&'static str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        latency_ms: u64,
    },
}

impl AuditEvent {
    fn level(&self) -> &'static str {
        match self {
            AuditEvent::ToolResult {
                error_type: Some(_), ..
            } => "ERROR",
            _ => "INFO",
        }
    }
}

#[derive(Serialize)]
struct AuditLine<'a> {
    ts: String,
    level: &'static str,
    service: &'static str,
    component: &'static str,
    #[serde(flatten)]
    correlation: &'a Correlation,
    #[serde(flatten)]
    event: &'a AuditEvent,
}

/// Writes audit records to the rotating sink.
#[derive(Clone, Default)]
pub struct AuditLog {
    sink: Option<Arc<RotatingFile>>,
}

impl AuditLog {
    pub fn new(sink: Arc<RotatingFile>) -> Self {
        Self { sink: Some(sink) }
    }

    /// An audit log that drops every record.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Encode one record as a JSON line.
    pub fn encode(correlation: &Correlation, event: &AuditEvent) -> Result<Vec<u8>, AuditError> {
        let line = AuditLine {
            ts: Local::now().to_rfc3339_opts(SecondsFormat::Millis, false),
            level: event.level(),
            service: SERVICE_NAME,
            component: SERVICE_NAME,
            correlation,
            event,
        };
        let mut bytes = serde_json::to_vec(&line)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Write one record. Sink failures are returned, never swallowed.
    pub fn record(&self, correlation: &Correlation, event: &AuditEvent) -> Result<(), AuditError> {
        let Some(sink) = &self.sink else {
            return Ok(());
        };
        let line = Self::encode(correlation, event)?;
        sink.write_record(&line)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn correlation() -> Correlation {
        Correlation {
            trace_id: "4bf92f3577b34da6a3ce929d0e0e4736".into(),
            span_id: "00f067aa0ba902b7".into(),
            session_id: "s-1".into(),
            agent_run_id: String::new(),
        }
    }

    #[test]
    fn test_encoded_line_carries_correlation_and_event() {
        let event = AuditEvent::ToolResult {
            tool_name: "k8s.list_pods".into(),
            namespace: Some("default".into()),
            outcome: "error",
            truncated: false,
            error_type: Some("permission_denied"),
            error: Some("namespace not allowed".into()),
            latency_ms: 3,
        };
        let bytes = AuditLog::encode(&correlation(), &event).unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));
        assert_eq!(bytes.iter().filter(|b| **b == b'\n').count(), 1);

        let line: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(line["service"], SERVICE_NAME);
        assert_eq!(line["component"], SERVICE_NAME);
        assert_eq!(line["level"], "ERROR");
        assert_eq!(line["event"], "tool_result");
        assert_eq!(line["trace_id"], "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(line["session_id"], "s-1");
        assert_eq!(line["agent_run_id"], "");
        assert_eq!(line["namespace"], "default");
        assert_eq!(line["error_type"], "permission_denied");
        assert!(line["ts"].is_string());
    }

    #[test]
    fn test_record_writes_to_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let audit = AuditLog::new(Arc::new(RotatingFile::open(&path).unwrap()));
        let event = AuditEvent::ToolCall {
            tool_name: "k8s.describe_pod".into(),
            namespace: None,
            arg_keys: vec!["pod_name".into()],
        };
        audit.record(&correlation(), &event).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let line: Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(line["event"], "tool_call");
        assert_eq!(line["level"], "INFO");
        assert!(line.get("namespace").is_none());
        assert_eq!(line["arg_keys"][0], "pod_name");
    }

    #[test]
    fn test_disabled_log_accepts_records() {
        let event = AuditEvent::ToolCall {
            tool_name: "x".into(),
            namespace: None,
            arg_keys: Vec::new(),
        };
        assert!(AuditLog::disabled().record(&correlation(), &event).is_ok());
    }
}
