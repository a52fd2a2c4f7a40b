//! The built-in Kubernetes capabilities.
//!
//! Each handler validates its own arguments, calls the cluster client and
//! shapes the result. Namespace authorization already happened in the
//! dispatcher; only `list_namespaces` consults the allowlist itself.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::tools::cluster::ClusterError;
use crate::tools::registry::ToolInvocation;
use crate::tools::types::{string_arg, ErrorKind, ToolError};

const DEFAULT_TAIL_LINES: usize = 100;

/// Map a backend failure, keeping missing resources distinct.
fn backend_error(tool: &str, verb: &str, err: ClusterError) -> ToolError {
    tracing::error!(tool_name = tool, error = %err, "Tool error");
    let kind = match err {
        ClusterError::NotFound { .. } => ErrorKind::NotFound,
        _ => ErrorKind::ExecutionError,
    };
    ToolError::new(tool, kind, format!("{verb} failed: {err}"))
}

fn required<'a>(inv: &'a ToolInvocation, tool: &str, key: &str) -> Result<&'a str, ToolError> {
    string_arg(&inv.args, key).ok_or_else(|| ToolError::invalid_input(tool, format!("{key} required")))
}

fn namespace(inv: &ToolInvocation) -> &str {
    string_arg(&inv.args, "namespace").unwrap_or_default()
}

pub async fn list_pods(inv: ToolInvocation) -> Result<Value, ToolError> {
    const TOOL: &str = "k8s.list_pods";
    let selector = string_arg(&inv.args, "label_selector");
    let pods = inv
        .client
        .list_pods(namespace(&inv), selector)
        .await
        .map_err(|e| backend_error(TOOL, "list pods", e))?;
    Ok(json!({"tool_name": TOOL, "items": pods}))
}

/// Allowed namespaces that exist and whose pods can be listed.
pub async fn list_namespaces(inv: ToolInvocation) -> Result<Value, ToolError> {
    const TOOL: &str = "k8s.list_namespaces";
    if inv.allowed.is_empty() {
        return Err(ToolError::permission_denied(TOOL, "no allowed namespaces configured"));
    }
    let allowed: Vec<&str> = inv.allowed.iter().collect();

    // A failed listing falls back to checking the whole allowlist.
    let candidates: Vec<&str> = match inv.client.list_namespaces().await {
        Ok(existing) => {
            let existing: BTreeSet<String> = existing.into_iter().collect();
            allowed
                .iter()
                .copied()
                .filter(|ns| existing.contains(*ns))
                .collect()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Namespace listing failed, checking allowlist directly");
            allowed.clone()
        }
    };

    // Access checks are detached and outlive a timed-out call; each one stops on
    // the call's cancellation token.
    let checks: Vec<_> = candidates
        .iter()
        .map(|ns| {
            let client = Arc::clone(&inv.client);
            let ctx = inv.ctx.clone();
            let ns = ns.to_string();
            tokio::spawn(async move {
                tokio::select! {
                    _ = ctx.cancelled() => false,
                    listed = client.list_pods(&ns, None) => listed.is_ok(),
                }
            })
        })
        .collect();

    let mut accessible = Vec::with_capacity(candidates.len());
    for (ns, check) in candidates.into_iter().zip(checks) {
        if matches!(check.await, Ok(true)) {
            accessible.push(ns);
        }
    }

    Ok(json!({
        "tool_name": TOOL,
        "allowed_namespaces": allowed,
        "matching_namespaces": accessible,
        "items": accessible,
    }))
}

pub async fn describe_pod(inv: ToolInvocation) -> Result<Value, ToolError> {
    const TOOL: &str = "k8s.describe_pod";
    let pod_name = required(&inv, TOOL, "pod_name")?;
    let pod = inv
        .client
        .describe_pod(namespace(&inv), pod_name)
        .await
        .map_err(|e| backend_error(TOOL, "describe pod", e))?;
    Ok(json!({"tool_name": TOOL, "pod": pod}))
}

pub async fn get_pod_events(inv: ToolInvocation) -> Result<Value, ToolError> {
    const TOOL: &str = "k8s.get_pod_events";
    let pod_name = required(&inv, TOOL, "pod_name")?;
    let events = inv
        .client
        .pod_events(namespace(&inv), pod_name)
        .await
        .map_err(|e| backend_error(TOOL, "get pod events", e))?;
    Ok(json!({"tool_name": TOOL, "events": events}))
}

pub async fn get_pod_logs(inv: ToolInvocation) -> Result<Value, ToolError> {
    const TOOL: &str = "k8s.get_pod_logs";
    let pod_name = required(&inv, TOOL, "pod_name")?;
    let container = string_arg(&inv.args, "container");
    let tail_lines = tail_lines(inv.args.get("tail_lines"))
        .ok_or_else(|| ToolError::invalid_input(TOOL, "tail_lines must be a non-negative number"))?;
    let logs = inv
        .client
        .pod_logs(namespace(&inv), pod_name, container, tail_lines)
        .await
        .map_err(|e| backend_error(TOOL, "get pod logs", e))?;
    Ok(json!({"tool_name": TOOL, "logs": logs}))
}

/// Absent means the default; fractional counts are truncated.
fn tail_lines(raw: Option<&Value>) -> Option<usize> {
    match raw {
        None | Some(Value::Null) => Some(DEFAULT_TAIL_LINES),
        Some(value) => {
            let n = value.as_f64()?;
            (n >= 0.0).then_some(n as usize)
        }
    }
}

pub async fn describe_deployment(inv: ToolInvocation) -> Result<Value, ToolError> {
    const TOOL: &str = "k8s.describe_deployment";
    let name = required(&inv, TOOL, "deployment_name")?;
    let deployment = inv
        .client
        .describe_deployment(namespace(&inv), name)
        .await
        .map_err(|e| backend_error(TOOL, "describe deployment", e))?;
    Ok(json!({"tool_name": TOOL, "deployment": deployment}))
}
