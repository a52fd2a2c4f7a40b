//! Request, response and error types for tool calls.

use std::fmt;
use std::time::Duration;

use axum::http::StatusCode;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Prefix reserved for instrumentation keys inside `args`.
pub const RESERVED_ARG_PREFIX: &str = "__";

pub const TRACEPARENT_ARG: &str = "__traceparent";
pub const TRACESTATE_ARG: &str = "__tracestate";
pub const SESSION_ID_ARG: &str = "__session_id";
pub const AGENT_RUN_ID_ARG: &str = "__agent_run_id";

/// The request envelope as it arrives on the wire.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolCall {
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(default)]
    pub timeout_ms: u64,
}

/// Correlation fields a caller smuggles in through reserved argument keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instrumentation {
    pub traceparent: Option<String>,
    pub tracestate: Option<String>,
    pub session_id: Option<String>,
    pub agent_run_id: Option<String>,
}

impl Instrumentation {
    /// Remove every reserved key from `args`, keeping the known ones.
    pub fn strip(args: &mut Map<String, Value>) -> Self {
        let mut found = Self::default();
        let reserved: Vec<String> = args
            .keys()
            .filter(|key| key.starts_with(RESERVED_ARG_PREFIX))
            .cloned()
            .collect();
        for key in reserved {
            let value = args.remove(&key);
            let text = value
                .as_ref()
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            match key.as_str() {
                TRACEPARENT_ARG => found.traceparent = text,
                TRACESTATE_ARG => found.tracestate = text,
                SESSION_ID_ARG => found.session_id = text,
                AGENT_RUN_ID_ARG => found.agent_run_id = text,
                _ => {}
            }
        }
        found
    }
}

/// A validated request with instrumentation already stripped from `args`.
#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub tool_name: String,
    pub args: Map<String, Value>,
    pub timeout: Duration,
    pub instrumentation: Instrumentation,
}

impl ToolRequest {
    /// A zero `timeout_ms` falls back to `default_timeout`.
    pub fn from_call(call: ToolCall, default_timeout: Duration) -> Self {
        let ToolCall {
            tool_name,
            mut args,
            timeout_ms,
        } = call;
        let instrumentation = Instrumentation::strip(&mut args);
        let timeout = if timeout_ms == 0 {
            default_timeout
        } else {
            Duration::from_millis(timeout_ms)
        };
        Self {
            tool_name,
            args,
            timeout,
            instrumentation,
        }
    }

    /// The `namespace` argument, if present and non-empty.
    pub fn namespace(&self) -> Option<&str> {
        string_arg(&self.args, "namespace")
    }
}

/// A non-empty string argument.
pub fn string_arg<'a>(args: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

/// Failure categories visible to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    PermissionDenied,
    Timeout,
    NotFound,
    ExecutionError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::Timeout => "timeout",
            ErrorKind::NotFound => "not_found",
            ErrorKind::ExecutionError => "execution_error",
        }
    }

    /// Unknown names collapse to `ExecutionError`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "invalid_input" => ErrorKind::InvalidInput,
            "permission_denied" => ErrorKind::PermissionDenied,
            "timeout" => ErrorKind::Timeout,
            "not_found" => ErrorKind::NotFound,
            _ => ErrorKind::ExecutionError,
        }
    }

    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::ExecutionError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP status for an `error_type` string, 500 for anything unrecognized.
pub fn status_for_error_type(error_type: &str) -> StatusCode {
    ErrorKind::parse(error_type).status_code()
}

/// A tool failure. Fields are fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ToolError {
    kind: ErrorKind,
    message: String,
    tool_name: String,
}

impl ToolError {
    pub fn new(tool_name: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            tool_name: tool_name.into(),
        }
    }

    pub fn invalid_input(tool_name: &str, message: impl Into<String>) -> Self {
        Self::new(tool_name, ErrorKind::InvalidInput, message)
    }

    pub fn permission_denied(tool_name: &str, message: impl Into<String>) -> Self {
        Self::new(tool_name, ErrorKind::PermissionDenied, message)
    }

    pub fn execution(tool_name: &str, message: impl Into<String>) -> Self {
        Self::new(tool_name, ErrorKind::ExecutionError, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Error,
}

impl ResponseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseStatus::Success => "success",
            ResponseStatus::Error => "error",
        }
    }
}

/// The outcome of one tool call. Exactly one of result and error exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResponse {
    pub tool_name: String,
    pub latency: Duration,
    pub truncated: bool,
    pub outcome: Result<Value, ToolError>,
}

impl ToolResponse {
    pub fn success(tool_name: impl Into<String>, result: Value, truncated: bool) -> Self {
        Self {
            tool_name: tool_name.into(),
            latency: Duration::ZERO,
            truncated,
            outcome: Ok(result),
        }
    }

    pub fn failure(tool_name: impl Into<String>, error: ToolError) -> Self {
        Self {
            tool_name: tool_name.into(),
            latency: Duration::ZERO,
            truncated: false,
            outcome: Err(error),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn status(&self) -> ResponseStatus {
        match self.outcome {
            Ok(_) => ResponseStatus::Success,
            Err(_) => ResponseStatus::Error,
        }
    }

    pub fn error(&self) -> Option<&ToolError> {
        self.outcome.as_ref().err()
    }

    pub fn result(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }

    pub fn latency_ms(&self) -> u64 {
        u64::try_from(self.latency.as_millis()).unwrap_or(u64::MAX)
    }

    /// 200 on success, otherwise the mapped error status.
    pub fn status_code(&self) -> StatusCode {
        match &self.outcome {
            Ok(_) => StatusCode::OK,
            Err(error) => error.kind().status_code(),
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error_type: &'static str,
    message: &'a str,
    tool_name: &'a str,
    duration_ms: u64,
}

impl Serialize for ToolResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ToolResponse", 6)?;
        state.serialize_field("tool_name", &self.tool_name)?;
        state.serialize_field("status", &self.status())?;
        state.serialize_field("latency_ms", &self.latency_ms())?;
        state.serialize_field("truncated", &self.truncated)?;
        match &self.outcome {
            Ok(result) => {
                state.serialize_field("result", result)?;
                state.serialize_field("error", &Option::<ErrorEnvelope<'_>>::None)?;
            }
            Err(error) => {
                state.serialize_field("result", &Value::Null)?;
                state.serialize_field(
                    "error",
                    &Some(ErrorEnvelope {
                        error_type: error.kind().as_str(),
                        message: error.message(),
                        tool_name: error.tool_name(),
                        duration_ms: self.latency_ms(),
                    }),
                )?;
            }
        }
        state.end()
    }
}
