//! End-to-end tests over a real listener.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

mod common;

use common::{post_json, start_gateway, start_with_config, start_with_factory, test_config, SlowFactory};

#[tokio::test]
async fn test_health() {
    let gw = start_gateway("default", 0).await;
    let res = reqwest::get(gw.url("/health")).await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_unregistered_tool_is_execution_error() {
    let gw = start_gateway("default", 0).await;
    let (status, body) = post_json(
        &gw.url("/tools/execute"),
        &json!({"tool_name": "k8s.delete_namespace", "args": {"namespace": "default"}}),
    )
    .await;
    assert_eq!(status, 500);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"]["error_type"], "execution_error");
    assert_eq!(body["error"]["message"], "tool not implemented");
    assert_eq!(body["result"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_missing_namespace_is_invalid_input() {
    let gw = start_gateway("default", 0).await;
    let (status, body) = post_json(
        &gw.url("/tools/execute"),
        &json!({"tool_name": "k8s.describe_pod", "args": {"pod_name": "web-1"}}),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["error_type"], "invalid_input");
    assert_eq!(body["error"]["tool_name"], "k8s.describe_pod");
}

#[tokio::test]
async fn test_namespace_outside_allowlist_is_denied() {
    let gw = start_gateway("default", 0).await;
    let (status, body) = post_json(
        &gw.url("/tools/execute"),
        &json!({"tool_name": "k8s.list_pods", "args": {"namespace": "kube-system"}}),
    )
    .await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["error_type"], "permission_denied");
}

#[tokio::test]
async fn test_empty_allowlist_denies_everything() {
    let gw = start_gateway("", 0).await;
    let (status, _) = post_json(
        &gw.url("/tools/execute"),
        &json!({"tool_name": "k8s.list_pods", "args": {"namespace": "default"}}),
    )
    .await;
    assert_eq!(status, 403);

    let (status, body) = post_json(
        &gw.url("/tools/execute"),
        &json!({"tool_name": "k8s.list_namespaces"}),
    )
    .await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["message"], "no allowed namespaces configured");
}

#[tokio::test]
async fn test_success_is_redacted_and_audited() {
    let gw = start_gateway("default", 0).await;
    let (status, body) = post_json(
        &gw.url("/tools/execute"),
        &json!({
            "tool_name": "k8s.describe_pod",
            "args": {
                "namespace": "default",
                "pod_name": "web-1",
                "__traceparent": "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
                "__session_id": "session-42"
            }
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "success");
    assert_eq!(body["truncated"], false);
    assert_eq!(body["error"], serde_json::Value::Null);
    assert_eq!(body["result"]["pod"]["annotations"]["db_password"], "[REDACTED]");
    assert_eq!(body["result"]["pod"]["annotations"]["team"], "payments");
    assert!(body["latency_ms"].is_u64());

    let records = gw.audit_lines();
    let result = records
        .iter()
        .find(|r| r["event"] == "tool_result")
        .expect("tool_result record");
    assert_eq!(result["service"], "tool-gateway");
    assert_eq!(result["trace_id"], "4bf92f3577b34da6a3ce929d0e0e4736");
    assert_eq!(result["session_id"], "session-42");
    assert_eq!(result["namespace"], "default");
    assert_eq!(result["outcome"], "success");

    let call = records.iter().find(|r| r["event"] == "tool_call").unwrap();
    assert_eq!(call["arg_keys"], json!(["namespace", "pod_name"]));
}

#[tokio::test]
async fn test_missing_resource_is_not_found() {
    let gw = start_gateway("default", 0).await;
    let (status, body) = post_json(
        &gw.url("/tools/execute"),
        &json!({"tool_name": "k8s.describe_deployment", "args": {"namespace": "default", "deployment_name": "api"}}),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["error_type"], "not_found");
}

#[tokio::test]
async fn test_large_result_is_truncated() {
    let gw = start_gateway("default", 64).await;
    let (status, body) = post_json(
        &gw.url("/tools/execute"),
        &json!({"tool_name": "k8s.list_pods", "args": {"namespace": "default"}}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["truncated"], true);
    assert_eq!(body["result"]["truncated"], true);
    assert_eq!(body["result"]["returned_size"], 64);
    assert!(body["result"]["original_size"].as_u64().unwrap() > 64);
}

#[tokio::test]
async fn test_slow_tool_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let gw = start_with_factory(dir, "default", 0, Arc::new(SlowFactory(Duration::from_secs(5)))).await;
    let (status, body) = post_json(
        &gw.url("/tools/execute"),
        &json!({"tool_name": "k8s.list_pods", "args": {"namespace": "default"}, "timeout_ms": 50}),
    )
    .await;
    assert_eq!(status, 408);
    assert_eq!(body["error"]["error_type"], "timeout");
    assert_eq!(body["error"]["message"], "tool timed out after 50ms");
    assert!(body["latency_ms"].as_u64().unwrap() < 5000);
}

#[tokio::test]
async fn test_long_timeout_still_gets_timeout_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config("default", &dir.path().join("logs").join("gateway.log"));
    config.timeouts.request_secs = 1;
    let gw = start_with_config(dir, config, Arc::new(SlowFactory(Duration::from_secs(3)))).await;

    let (status, body) = post_json(
        &gw.url("/tools/execute"),
        &json!({"tool_name": "k8s.list_pods", "args": {"namespace": "default"}, "timeout_ms": 5000}),
    )
    .await;
    assert_eq!(status, 408);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"]["error_type"], "timeout");
    assert!(body["latency_ms"].as_u64().unwrap() < 1000);

    let records = gw.audit_lines();
    let result = records
        .iter()
        .find(|r| r["event"] == "tool_result")
        .expect("tool_result record");
    assert_eq!(result["error_type"], "timeout");
}

#[tokio::test]
async fn test_malformed_json() {
    let gw = start_gateway("default", 0).await;
    let res = reqwest::Client::new()
        .post(gw.url("/tools/execute"))
        .header("content-type", "application/json")
        .body("{\"tool_name\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["tool_name"], "");
    assert_eq!(body["error"]["error_type"], "invalid_input");
    assert_eq!(body["error"]["message"], "invalid json");
}

#[tokio::test]
async fn test_allowlist_reload_applies_to_next_call() {
    let gw = start_gateway("default", 0).await;
    let request = json!({"tool_name": "k8s.list_pods", "args": {"namespace": "kube-system"}});

    let (status, _) = post_json(&gw.url("/tools/execute"), &request).await;
    assert_eq!(status, 403);

    let mut next = (**gw.shared.load()).clone();
    next.tools.allowed_namespaces = "default,kube-system".into();
    gw.shared.store(Arc::new(next));

    let (status, body) = post_json(&gw.url("/tools/execute"), &request).await;
    assert_eq!(status, 200);
    assert_eq!(body["result"]["items"][0]["name"], "coredns");
}

#[tokio::test]
async fn test_mcp_tools_call() {
    let gw = start_gateway("default", 0).await;
    let (status, body) = post_json(
        &gw.url("/mcp"),
        &json!({
            "jsonrpc": "2.0",
            "id": 11,
            "method": "tools/call",
            "params": {"name": "k8s.get_pod_logs", "arguments": {"namespace": "default", "pod_name": "web-1", "tail_lines": 1}}
        }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["id"], 11);
    assert_eq!(body["result"]["isError"], false);
    assert_eq!(body["result"]["structuredContent"]["result"]["logs"], "ready\n");
}

#[tokio::test]
async fn test_mcp_unknown_method() {
    let gw = start_gateway("default", 0).await;
    let (status, body) = post_json(
        &gw.url("/mcp"),
        &json!({"jsonrpc": "2.0", "id": 1, "method": "prompts/list"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["error"]["code"], -32601);
}
