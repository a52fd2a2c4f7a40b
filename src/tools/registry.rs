//! The frozen table of callable tools.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::resilience::ToolContext;
use crate::security::AllowedNamespaces;
use crate::tools::cluster::ClusterClient;
use crate::tools::handlers;
use crate::tools::types::{ToolError, AGENT_RUN_ID_ARG, SESSION_ID_ARG, TRACEPARENT_ARG, TRACESTATE_ARG};

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send>>;

/// Entry point of one capability.
pub type Handler = fn(ToolInvocation) -> HandlerFuture;

/// Everything a capability may touch while it runs.
pub struct ToolInvocation {
    pub ctx: ToolContext,
    pub client: Arc<dyn ClusterClient>,
    /// Arguments with instrumentation keys already removed.
    pub args: Map<String, Value>,
    /// Allowlist snapshot taken when the call was authorized.
    pub allowed: AllowedNamespaces,
}

/// Whether the dispatcher checks the `namespace` argument before invoking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Namespaced,
    Cluster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
}

impl ParamKind {
    fn json_type(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Param {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

#[derive(Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub scope: Scope,
    pub params: &'static [Param],
    pub handler: Handler,
}

impl ToolSpec {
    /// JSON Schema of the accepted arguments, as advertised over MCP.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        if self.scope == Scope::Namespaced {
            properties.insert(
                "namespace".into(),
                json!({"type": "string", "description": "Kubernetes namespace"}),
            );
            required.push(Value::from("namespace"));
        }
        for param in self.params {
            properties.insert(
                param.name.into(),
                json!({"type": param.kind.json_type(), "description": param.description}),
            );
            if param.required {
                required.push(Value::from(param.name));
            }
        }
        for key in [TRACEPARENT_ARG, TRACESTATE_ARG, SESSION_ID_ARG, AGENT_RUN_ID_ARG] {
            properties.insert(key.into(), json!({"type": "string"}));
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

fn boxed<F>(fut: F) -> HandlerFuture
where
    F: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    Box::pin(fut)
}

const POD_NAME: Param = Param {
    name: "pod_name",
    kind: ParamKind::String,
    required: true,
    description: "Pod name",
};

/// The tools shipped with the gateway.
pub fn builtin_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "k8s.list_pods",
            description: "List pods in a namespace",
            scope: Scope::Namespaced,
            params: &[Param {
                name: "label_selector",
                kind: ParamKind::String,
                required: false,
                description: "Label selector, e.g. app=web",
            }],
            handler: |inv| boxed(handlers::list_pods(inv)),
        },
        ToolSpec {
            name: "k8s.list_namespaces",
            description: "List allowed namespaces that exist and are readable",
            scope: Scope::Cluster,
            params: &[],
            handler: |inv| boxed(handlers::list_namespaces(inv)),
        },
        ToolSpec {
            name: "k8s.describe_pod",
            description: "Describe a pod",
            scope: Scope::Namespaced,
            params: &[POD_NAME],
            handler: |inv| boxed(handlers::describe_pod(inv)),
        },
        ToolSpec {
            name: "k8s.get_pod_events",
            description: "Get events for a pod",
            scope: Scope::Namespaced,
            params: &[POD_NAME],
            handler: |inv| boxed(handlers::get_pod_events(inv)),
        },
        ToolSpec {
            name: "k8s.get_pod_logs",
            description: "Get recent logs for a pod",
            scope: Scope::Namespaced,
            params: &[
                POD_NAME,
                Param {
                    name: "container",
                    kind: ParamKind::String,
                    required: false,
                    description: "Container name",
                },
                Param {
                    name: "tail_lines",
                    kind: ParamKind::Integer,
                    required: false,
                    description: "Number of lines from the end (default 100)",
                },
            ],
            handler: |inv| boxed(handlers::get_pod_logs(inv)),
        },
        ToolSpec {
            name: "k8s.describe_deployment",
            description: "Describe a deployment",
            scope: Scope::Namespaced,
            params: &[Param {
                name: "deployment_name",
                kind: ParamKind::String,
                required: true,
                description: "Deployment name",
            }],
            handler: |inv| boxed(handlers::describe_deployment(inv)),
        },
    ]
}

/// Name to capability lookup. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, ToolSpec>,
}

impl ToolRegistry {
    pub fn builtin() -> Self {
        Self::from_specs(builtin_specs())
    }

    /// Later specs replace earlier ones with the same name.
    pub fn from_specs(specs: impl IntoIterator<Item = ToolSpec>) -> Self {
        let tools = specs.into_iter().map(|spec| (spec.name, spec)).collect();
        Self { tools }
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tools, sorted by name.
    pub fn specs(&self) -> Vec<&ToolSpec> {
        let mut specs: Vec<&ToolSpec> = self.tools.values().collect();
        specs.sort_by_key(|spec| spec.name);
        specs
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
