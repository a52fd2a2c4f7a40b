//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use tool_gateway::config::{self, GatewayConfig, SharedConfig};
use tool_gateway::observability::{AuditLog, RotatingFile};
use tool_gateway::tools::cluster::{DeploymentDetail, PodDetail, PodEvent, PodSummary};
use tool_gateway::tools::{
    ClientFactory, ClusterClient, ClusterError, Dispatcher, SnapshotClientFactory, ToolRegistry,
};
use tool_gateway::{GatewayServer, Shutdown};

/// A small cluster with one secret-bearing pod.
pub fn snapshot_json() -> Value {
    json!({
        "namespaces": [
            {
                "name": "default",
                "pods": [
                    {
                        "name": "web-1",
                        "phase": "Running",
                        "node": "node-a",
                        "labels": {"app": "web"},
                        "annotations": {"db_password": "hunter2", "team": "payments"},
                        "events": [
                            {"reason": "Scheduled", "message": "assigned", "type": "Normal", "time": "2024-05-01T10:00:00Z"}
                        ],
                        "containers": [{"name": "app", "logs": "boot\nready\n"}]
                    },
                    {"name": "worker-1", "phase": "Pending", "labels": {"app": "worker"}}
                ],
                "deployments": [
                    {"name": "web", "replicas": 3, "ready": 3, "updated": 3, "available": 3}
                ]
            },
            {"name": "kube-system", "pods": [{"name": "coredns", "phase": "Running"}]}
        ]
    })
}

pub fn write_snapshot(dir: &Path) -> PathBuf {
    let path = dir.join("cluster.json");
    std::fs::write(&path, snapshot_json().to_string()).unwrap();
    path
}

pub fn test_config(allowlist: &str, log_file: &Path) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.tools.allowed_namespaces = allowlist.into();
    config.observability.log_file = log_file.display().to_string();
    config
}

/// A running gateway bound to an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shared: SharedConfig,
    pub sink: Arc<RotatingFile>,
    pub shutdown: Arc<Shutdown>,
    _dir: tempfile::TempDir,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Every JSON line in today's audit file.
    pub fn audit_lines(&self) -> Vec<Value> {
        self.sink.flush().unwrap();
        std::fs::read_to_string(self.sink.path())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a gateway backed by the snapshot from [`snapshot_json`].
pub async fn start_gateway(allowlist: &str, max_output_bytes: usize) -> TestGateway {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = write_snapshot(dir.path());
    start_with_factory(
        dir,
        allowlist,
        max_output_bytes,
        Arc::new(SnapshotClientFactory::new(Some(snapshot))),
    )
    .await
}

pub async fn start_with_factory(
    dir: tempfile::TempDir,
    allowlist: &str,
    max_output_bytes: usize,
    clients: Arc<dyn ClientFactory>,
) -> TestGateway {
    let mut config = test_config(allowlist, &dir.path().join("logs").join("gateway.log"));
    config.tools.max_output_bytes = max_output_bytes;
    start_with_config(dir, config, clients).await
}

pub async fn start_with_config(
    dir: tempfile::TempDir,
    config: GatewayConfig,
    clients: Arc<dyn ClientFactory>,
) -> TestGateway {
    let sink = Arc::new(RotatingFile::open(&config.observability.log_file).unwrap());
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shared = config::shared(config);
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(ToolRegistry::builtin()),
        clients,
        shared.clone(),
        AuditLog::new(sink.clone()),
    ));
    let server = GatewayServer::new(&shared.load(), dispatcher);

    let shutdown = Arc::new(Shutdown::new());
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });

    TestGateway {
        addr,
        shared,
        sink,
        shutdown,
        _dir: dir,
    }
}

/// A cluster whose every call takes `delay`.
pub struct SlowCluster {
    pub delay: Duration,
}

#[async_trait]
impl ClusterClient for SlowCluster {
    async fn list_namespaces(&self) -> Result<Vec<String>, ClusterError> {
        tokio::time::sleep(self.delay).await;
        Ok(vec!["default".into()])
    }

    async fn list_pods(
        &self,
        _namespace: &str,
        _label_selector: Option<&str>,
    ) -> Result<Vec<PodSummary>, ClusterError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }

    async fn describe_pod(&self, namespace: &str, pod: &str) -> Result<PodDetail, ClusterError> {
        tokio::time::sleep(self.delay).await;
        Err(ClusterError::NotFound {
            kind: "pod",
            namespace: namespace.into(),
            name: pod.into(),
        })
    }

    async fn pod_events(&self, _namespace: &str, _pod: &str) -> Result<Vec<PodEvent>, ClusterError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }

    async fn pod_logs(
        &self,
        _namespace: &str,
        _pod: &str,
        _container: Option<&str>,
        _tail_lines: usize,
    ) -> Result<String, ClusterError> {
        tokio::time::sleep(self.delay).await;
        Ok(String::new())
    }

    async fn describe_deployment(
        &self,
        namespace: &str,
        deployment: &str,
    ) -> Result<DeploymentDetail, ClusterError> {
        tokio::time::sleep(self.delay).await;
        Err(ClusterError::NotFound {
            kind: "deployment",
            namespace: namespace.into(),
            name: deployment.into(),
        })
    }
}

pub struct SlowFactory(pub Duration);

#[async_trait]
impl ClientFactory for SlowFactory {
    async fn connect(&self) -> Result<Arc<dyn ClusterClient>, ClusterError> {
        Ok(Arc::new(SlowCluster { delay: self.0 }))
    }
}

pub async fn post_json(url: &str, body: &Value) -> (u16, Value) {
    let res = reqwest::Client::new().post(url).json(body).send().await.unwrap();
    let status = res.status().as_u16();
    (status, res.json().await.unwrap())
}
