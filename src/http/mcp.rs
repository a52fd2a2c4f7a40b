//! Minimal MCP endpoint: JSON-RPC 2.0 over a single POST.
//!
//! Supports `initialize`, `ping`, `tools/list` and `tools/call`.
//! Notifications are accepted and produce no body.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

use crate::observability::SERVICE_NAME;
use crate::tools::{Dispatched, Dispatcher, ToolCall};

pub const PROTOCOL_VERSION: &str = "2025-03-26";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[serde(default)]
    jsonrpc: String,
    /// `None` only when the member is absent; `"id": null` is still a request.
    #[serde(default, deserialize_with = "present")]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

impl RpcResponse {
    fn ok(id: Value, result: Value) -> Value {
        Self::wire(Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        })
    }

    fn err(id: Value, code: i64, message: impl Into<String>) -> Value {
        Self::wire(Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        })
    }

    fn wire(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// What the transport should send back.
#[derive(Debug)]
pub enum McpReply {
    /// A JSON-RPC response body.
    Message(Value),
    /// A notification was accepted; nothing to send.
    Accepted,
}

/// Handle one JSON-RPC message. Tool calls also return their dispatch.
pub async fn handle_message(dispatcher: &Dispatcher, body: &[u8]) -> (McpReply, Option<Dispatched>) {
    let request: RpcRequest = match serde_json::from_slice::<Value>(body) {
        Err(e) => {
            return (
                McpReply::Message(RpcResponse::err(Value::Null, PARSE_ERROR, format!("parse error: {e}"))),
                None,
            )
        }
        Ok(value) => {
            let id = value.get("id").cloned().unwrap_or(Value::Null);
            match serde_json::from_value(value) {
                Ok(request) => request,
                Err(e) => {
                    return (
                        McpReply::Message(RpcResponse::err(id, INVALID_REQUEST, format!("invalid request: {e}"))),
                        None,
                    )
                }
            }
        }
    };

    if request.jsonrpc != "2.0" {
        let id = request.id.unwrap_or(Value::Null);
        return (
            McpReply::Message(RpcResponse::err(id, INVALID_REQUEST, "jsonrpc must be \"2.0\"")),
            None,
        );
    }

    let Some(id) = request.id else {
        tracing::debug!(method = %request.method, "MCP notification");
        return (McpReply::Accepted, None);
    };

    match request.method.as_str() {
        "initialize" => (McpReply::Message(RpcResponse::ok(id, initialize_result())), None),
        "ping" => (McpReply::Message(RpcResponse::ok(id, json!({}))), None),
        "tools/list" => (McpReply::Message(RpcResponse::ok(id, list_tools(dispatcher))), None),
        "tools/call" => match call_params(&request.params) {
            Ok(call) => {
                let dispatched = dispatcher.dispatch(call).await;
                let result = call_result(&dispatched);
                (McpReply::Message(RpcResponse::ok(id, result)), Some(dispatched))
            }
            Err(message) => (McpReply::Message(RpcResponse::err(id, INVALID_PARAMS, message)), None),
        },
        other => (
            McpReply::Message(RpcResponse::err(id, METHOD_NOT_FOUND, format!("method not found: {other}"))),
            None,
        ),
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {"tools": {"listChanged": false}},
        "serverInfo": {"name": SERVICE_NAME, "version": env!("CARGO_PKG_VERSION")},
    })
}

fn list_tools(dispatcher: &Dispatcher) -> Value {
    let tools: Vec<Value> = dispatcher
        .registry()
        .specs()
        .into_iter()
        .map(|spec| {
            json!({
                "name": spec.name,
                "description": spec.description,
                "inputSchema": spec.input_schema(),
            })
        })
        .collect();
    json!({ "tools": tools })
}

/// `tools/call` always runs with the configured default timeout.
fn call_params(params: &Value) -> Result<ToolCall, String> {
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or("params.name required")?;
    let args = match params.get("arguments") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(args)) => args.clone(),
        Some(_) => return Err("params.arguments must be an object".into()),
    };
    Ok(ToolCall {
        tool_name: name.to_string(),
        args,
        timeout_ms: 0,
    })
}

fn call_result(dispatched: &Dispatched) -> Value {
    let envelope = serde_json::to_value(&dispatched.response).unwrap_or(Value::Null);
    let text = envelope.to_string();
    json!({
        "content": [{"type": "text", "text": text}],
        "structuredContent": envelope,
        "isError": dispatched.response.error().is_some(),
    })
}
