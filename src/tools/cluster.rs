//! Backing cluster client.
//!
//! # Responsibilities
//! - Define the read-only surface capabilities call into
//! - Acquire a fresh client for every request
//! - Serve a JSON inventory snapshot for local and test deployments
//!
//! # Design Decisions
//! - Capabilities depend on the `ClusterClient` trait, never on a transport
//! - Client construction can fail and is checked per request
//! - Missing resources are a distinct error so they surface as `not_found`

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClusterError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },
    #[error("access to namespace {0} is forbidden")]
    Forbidden(String),
    #[error("no usable cluster config: {0}")]
    Config(String),
    #[error("{0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSummary {
    pub name: String,
    pub namespace: String,
    pub status: String,
    pub node: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodDetail {
    pub name: String,
    pub namespace: String,
    pub phase: String,
    pub node: String,
    pub reason: String,
    pub message: String,
    pub start_time: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodEvent {
    pub reason: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentDetail {
    pub name: String,
    pub namespace: String,
    pub replicas: i32,
    pub ready: i32,
    pub updated: i32,
    pub available: i32,
}

/// Read-only cluster operations the capabilities are built on.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn list_namespaces(&self) -> Result<Vec<String>, ClusterError>;

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<PodSummary>, ClusterError>;

    async fn describe_pod(&self, namespace: &str, pod: &str) -> Result<PodDetail, ClusterError>;

    async fn pod_events(&self, namespace: &str, pod: &str) -> Result<Vec<PodEvent>, ClusterError>;

    async fn pod_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: Option<&str>,
        tail_lines: usize,
    ) -> Result<String, ClusterError>;

    async fn describe_deployment(
        &self,
        namespace: &str,
        deployment: &str,
    ) -> Result<DeploymentDetail, ClusterError>;
}

/// Builds a client for one request.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn ClusterClient>, ClusterError>;
}

/// Inventory document served by [`SnapshotClient`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ClusterSnapshot {
    pub namespaces: Vec<NamespaceSnapshot>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct NamespaceSnapshot {
    pub name: String,
    /// Listing pods here fails as it would for a missing RBAC grant.
    pub forbidden: bool,
    pub pods: Vec<PodSnapshot>,
    pub deployments: Vec<DeploymentSnapshot>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PodSnapshot {
    pub name: String,
    pub phase: String,
    pub node: String,
    pub reason: String,
    pub message: String,
    pub start_time: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub events: Vec<PodEvent>,
    /// Log text per container, in container order.
    pub containers: Vec<ContainerLogs>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ContainerLogs {
    pub name: String,
    pub logs: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DeploymentSnapshot {
    pub name: String,
    pub replicas: i32,
    pub ready: i32,
    pub updated: i32,
    pub available: i32,
}

/// A [`ClusterClient`] answering from an in-memory snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotClient {
    snapshot: ClusterSnapshot,
}

impl SnapshotClient {
    pub fn new(snapshot: ClusterSnapshot) -> Self {
        Self { snapshot }
    }

    fn namespace(&self, name: &str) -> Option<&NamespaceSnapshot> {
        self.snapshot.namespaces.iter().find(|ns| ns.name == name)
    }

    fn readable_namespace(&self, name: &str) -> Result<Option<&NamespaceSnapshot>, ClusterError> {
        match self.namespace(name) {
            Some(ns) if ns.forbidden => Err(ClusterError::Forbidden(name.to_string())),
            found => Ok(found),
        }
    }

    fn pod(&self, namespace: &str, pod: &str) -> Result<&PodSnapshot, ClusterError> {
        self.readable_namespace(namespace)?
            .and_then(|ns| ns.pods.iter().find(|p| p.name == pod))
            .ok_or_else(|| ClusterError::NotFound {
                kind: "pod",
                namespace: namespace.to_string(),
                name: pod.to_string(),
            })
    }
}

/// Equality-based selector: `app=web,tier=frontend`, `key`, `key!=value`.
pub fn matches_selector(labels: &BTreeMap<String, String>, selector: &str) -> bool {
    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| {
            if let Some((key, value)) = term.split_once("!=") {
                labels.get(key.trim()).map(String::as_str) != Some(value.trim())
            } else if let Some((key, value)) = term.split_once("==").or_else(|| term.split_once('=')) {
                labels.get(key.trim()).map(String::as_str) == Some(value.trim())
            } else {
                labels.contains_key(term)
            }
        })
}

#[async_trait]
impl ClusterClient for SnapshotClient {
    async fn list_namespaces(&self) -> Result<Vec<String>, ClusterError> {
        let mut names: Vec<String> = self
            .snapshot
            .namespaces
            .iter()
            .map(|ns| ns.name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<PodSummary>, ClusterError> {
        let Some(ns) = self.readable_namespace(namespace)? else {
            return Ok(Vec::new());
        };
        Ok(ns
            .pods
            .iter()
            .filter(|pod| label_selector.map_or(true, |sel| matches_selector(&pod.labels, sel)))
            .map(|pod| PodSummary {
                name: pod.name.clone(),
                namespace: ns.name.clone(),
                status: pod.phase.clone(),
                node: pod.node.clone(),
            })
            .collect())
    }

    async fn describe_pod(&self, namespace: &str, pod: &str) -> Result<PodDetail, ClusterError> {
        let found = self.pod(namespace, pod)?;
        Ok(PodDetail {
            name: found.name.clone(),
            namespace: namespace.to_string(),
            phase: found.phase.clone(),
            node: found.node.clone(),
            reason: found.reason.clone(),
            message: found.message.clone(),
            start_time: found.start_time.clone(),
            labels: found.labels.clone(),
            annotations: found.annotations.clone(),
        })
    }

    async fn pod_events(&self, namespace: &str, pod: &str) -> Result<Vec<PodEvent>, ClusterError> {
        Ok(self.pod(namespace, pod)?.events.clone())
    }

    async fn pod_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: Option<&str>,
        tail_lines: usize,
    ) -> Result<String, ClusterError> {
        let found = self.pod(namespace, pod)?;
        let logs = match container {
            Some(name) => found
                .containers
                .iter()
                .find(|c| c.name == name)
                .ok_or_else(|| ClusterError::NotFound {
                    kind: "container",
                    namespace: namespace.to_string(),
                    name: format!("{pod}/{name}"),
                })?,
            None => match found.containers.first() {
                Some(first) => first,
                None => return Ok(String::new()),
            },
        };
        Ok(tail(&logs.logs, tail_lines))
    }

    async fn describe_deployment(
        &self,
        namespace: &str,
        deployment: &str,
    ) -> Result<DeploymentDetail, ClusterError> {
        self.readable_namespace(namespace)?
            .and_then(|ns| ns.deployments.iter().find(|d| d.name == deployment))
            .map(|d| DeploymentDetail {
                name: d.name.clone(),
                namespace: namespace.to_string(),
                replicas: d.replicas,
                ready: d.ready,
                updated: d.updated,
                available: d.available,
            })
            .ok_or_else(|| ClusterError::NotFound {
                kind: "deployment",
                namespace: namespace.to_string(),
                name: deployment.to_string(),
            })
    }
}

/// Last `n` lines of `text`, keeping the trailing newline if present.
fn tail(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    let mut out = lines[start..].join("\n");
    if text.ends_with('\n') && !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Loads the snapshot file afresh on every `connect`.
#[derive(Debug, Clone, Default)]
pub struct SnapshotClientFactory {
    path: Option<PathBuf>,
}

impl SnapshotClientFactory {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ClientFactory for SnapshotClientFactory {
    async fn connect(&self) -> Result<Arc<dyn ClusterClient>, ClusterError> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| ClusterError::Config("cluster.snapshot_path is not set".into()))?;
        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| ClusterError::Config(format!("read {}: {e}", path.display())))?;
        let snapshot: ClusterSnapshot = serde_json::from_slice(&raw)
            .map_err(|e| ClusterError::Config(format!("parse {}: {e}", path.display())))?;
        Ok(Arc::new(SnapshotClient::new(snapshot)))
    }
}
