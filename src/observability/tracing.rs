//! Distributed tracing support.
//!
//! # Responsibilities
//! - Extract W3C trace context supplied by the caller
//! - Continue the caller's trace or start a new one
//! - Open one `tool.call` span per request and close it with outcome attributes
//!
//! # Design Decisions
//! - Spans are plain `tracing` spans; exporter wiring lives outside the gateway
//! - `ToolSpan::end` takes `self`, so a span can only be ended once
//! - Attribute values that are not string, bool, integer or float are skipped

use std::fmt;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::field::Empty;
use tracing::Span;

const TRACEPARENT_VERSION: &str = "00";

/// Trace identity of the current tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub trace_state: Option<String>,
    pub sampled: bool,
}

impl TraceContext {
    /// Continue `traceparent` when it is well formed, otherwise start fresh.
    pub fn continue_or_start(traceparent: Option<&str>, tracestate: Option<&str>) -> Self {
        match traceparent.and_then(parse_traceparent) {
            Some(parent) => Self {
                trace_id: parent.trace_id,
                span_id: new_span_id(),
                parent_span_id: Some(parent.span_id),
                trace_state: tracestate.map(str::to_string),
                sampled: parent.sampled,
            },
            None => Self {
                trace_id: new_trace_id(),
                span_id: new_span_id(),
                parent_span_id: None,
                trace_state: None,
                sampled: true,
            },
        }
    }
}

/// The parts of an inbound `traceparent` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentContext {
    pub trace_id: String,
    pub span_id: String,
    pub sampled: bool,
}

/// Parse `00-<32 hex>-<16 hex>-<2 hex>`; all-zero ids are rejected.
pub fn parse_traceparent(raw: &str) -> Option<ParentContext> {
    let mut parts = raw.trim().split('-');
    let version = parts.next()?;
    let trace_id = parts.next()?;
    let span_id = parts.next()?;
    let flags = parts.next()?;
    if parts.next().is_some() || version != TRACEPARENT_VERSION {
        return None;
    }
    if !is_lower_hex(trace_id, 32) || !is_lower_hex(span_id, 16) || !is_lower_hex(flags, 2) {
        return None;
    }
    if trace_id.bytes().all(|b| b == b'0') || span_id.bytes().all(|b| b == b'0') {
        return None;
    }
    let flags = u8::from_str_radix(flags, 16).ok()?;
    Some(ParentContext {
        trace_id: trace_id.to_string(),
        span_id: span_id.to_string(),
        sampled: flags & 0x01 == 0x01,
    })
}

fn is_lower_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn new_trace_id() -> String {
    let id: u128 = rand::random::<u128>().max(1);
    format!("{id:032x}")
}

fn new_span_id() -> String {
    let id: u64 = rand::random::<u64>().max(1);
    format!("{id:016x}")
}

/// A span attribute value in its typed form.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl AttributeValue {
    /// `None` for null, arrays, objects and integers outside `i64`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(AttributeValue::String(s.clone())),
            Value::Bool(b) => Some(AttributeValue::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(AttributeValue::Int)
                .or_else(|| if n.is_u64() { None } else { n.as_f64().map(AttributeValue::Float) }),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    fn record_on(&self, span: &Span, key: &str) {
        match self {
            AttributeValue::String(s) => span.record(key, s.as_str()),
            AttributeValue::Bool(b) => span.record(key, *b),
            AttributeValue::Int(i) => span.record(key, *i),
            AttributeValue::Float(f) => span.record(key, *f),
        };
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => f.write_str(s),
            AttributeValue::Bool(b) => write!(f, "{b}"),
            AttributeValue::Int(i) => write!(f, "{i}"),
            AttributeValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// An open `tool.call` span.
#[derive(Debug)]
pub struct ToolSpan {
    context: TraceContext,
    span: Span,
    started: Instant,
}

/// What was recorded when a span ended.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedSpan {
    pub context: TraceContext,
    pub attributes: Vec<(String, AttributeValue)>,
    pub duration: Duration,
}

impl FinishedSpan {
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

/// Start the span for `tool_name`, continuing the caller's trace if given.
pub fn start_span(tool_name: &str, traceparent: Option<&str>, tracestate: Option<&str>) -> ToolSpan {
    let context = TraceContext::continue_or_start(traceparent, tracestate);
    let span = tracing::info_span!(
        "tool.call",
        tool_name = %tool_name,
        trace_id = %context.trace_id,
        span_id = %context.span_id,
        parent_span_id = context.parent_span_id.as_deref().unwrap_or(""),
        namespace = Empty,
        session_id = Empty,
        agent_run_id = Empty,
        result_status = Empty,
        error_type = Empty,
        truncated = Empty,
        latency_ms = Empty,
    );
    ToolSpan {
        context,
        span,
        started: Instant::now(),
    }
}

impl ToolSpan {
    pub fn context(&self) -> &TraceContext {
        &self.context
    }

    /// The underlying span, for instrumenting futures.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Attach `attributes` and close the span.
    pub fn end<'a, I>(self, attributes: I) -> FinishedSpan
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let mut recorded = Vec::new();
        for (key, value) in attributes {
            let Some(typed) = AttributeValue::from_json(&value) else {
                continue;
            };
            typed.record_on(&self.span, key);
            recorded.push((key.to_string(), typed));
        }
        let duration = self.started.elapsed();
        drop(self.span);
        FinishedSpan {
            context: self.context,
            attributes: recorded,
            duration,
        }
    }
}
