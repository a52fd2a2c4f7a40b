//! Per-request pipeline from raw envelope to response.
//!
//! # Responsibilities
//! - Parse the envelope and strip instrumentation keys
//! - Resolve the tool, authorize its namespace, acquire a client
//! - Run the capability under its deadline inside the call span
//! - Redact, then bound, successful results
//! - End the span once and write the audit records
//!
//! # Design Decisions
//! - Steps are terminal at the first failure
//! - Config is read once per request from the live snapshot
//! - Audit sink failures travel next to the response, never inside it
//! - A call's deadline never outlasts the HTTP request timeout

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::Instrument;

use crate::config::{GatewayConfig, SharedConfig};
use crate::observability::metrics;
use crate::observability::{start_span, AuditError, AuditEvent, AuditLog, Correlation, FinishedSpan, ToolSpan};
use crate::resilience::{run_with_deadline, DeadlineExceeded, ToolContext};
use crate::security::{bound, redact, AllowedNamespaces, Bounded};
use crate::tools::cluster::ClientFactory;
use crate::tools::registry::{Scope, ToolInvocation, ToolRegistry};
use crate::tools::types::{ErrorKind, Instrumentation, ToolCall, ToolError, ToolRequest, ToolResponse};

/// Metrics label for names outside the registry.
const UNREGISTERED: &str = "unregistered";

/// The outcome of one dispatch.
#[derive(Debug)]
pub struct Dispatched {
    pub response: ToolResponse,
    pub span: FinishedSpan,
    /// First audit write failure, if any.
    pub audit: Result<(), AuditError>,
}

pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    clients: Arc<dyn ClientFactory>,
    config: SharedConfig,
    audit: AuditLog,
    /// Upper bound on any call's deadline, fixed with the HTTP timeout layer.
    ceiling: Duration,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ToolRegistry>,
        clients: Arc<dyn ClientFactory>,
        config: SharedConfig,
        audit: AuditLog,
    ) -> Self {
        let ceiling = config.load().timeouts.tool_ceiling();
        Self {
            registry,
            clients,
            config,
            audit,
            ceiling,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn default_timeout(&self) -> Duration {
        self.config.load().tools.default_timeout()
    }

    /// Dispatch a raw JSON envelope. Malformed input is `invalid_input`.
    pub async fn dispatch_bytes(&self, body: &[u8]) -> Dispatched {
        let received = Instant::now();
        match serde_json::from_slice::<ToolCall>(body) {
            Ok(call) => self.run(call, received).await,
            Err(e) => {
                tracing::debug!(error = %e, "Rejecting malformed tool call");
                let span = start_span("", None, None);
                let correlation = correlation(&span, &Instrumentation::default());
                let response = ToolResponse::failure("", ToolError::invalid_input("", "invalid json"))
                    .with_latency(received.elapsed());
                self.finish(span, correlation, &Instrumentation::default(), None, response, Ok(()))
            }
        }
    }

    pub async fn dispatch(&self, call: ToolCall) -> Dispatched {
        self.run(call, Instant::now()).await
    }

    async fn run(&self, call: ToolCall, received: Instant) -> Dispatched {
        let config = self.config.load_full();
        let request = ToolRequest::from_call(call, config.tools.default_timeout());
        let instrumentation = &request.instrumentation;

        let span = start_span(
            &request.tool_name,
            instrumentation.traceparent.as_deref(),
            instrumentation.tracestate.as_deref(),
        );
        let correlation = correlation(&span, instrumentation);
        let namespace = request.namespace().map(str::to_string);

        let accepted = self.audit.record(
            &correlation,
            &AuditEvent::ToolCall {
                tool_name: request.tool_name.clone(),
                namespace: namespace.clone(),
                arg_keys: request.args.keys().cloned().collect(),
            },
        );

        let response = match self.execute(&request, &config, &span, received).await {
            Ok(Bounded { value, truncated }) => {
                ToolResponse::success(&request.tool_name, value, truncated)
            }
            Err(error) => ToolResponse::failure(&request.tool_name, error),
        }
        .with_latency(received.elapsed());

        self.finish(span, correlation, instrumentation, namespace, response, accepted)
    }

    async fn execute(
        &self,
        request: &ToolRequest,
        config: &GatewayConfig,
        span: &ToolSpan,
        received: Instant,
    ) -> Result<Bounded, ToolError> {
        let tool = request.tool_name.as_str();
        let spec = self
            .registry
            .get(tool)
            .ok_or_else(|| ToolError::execution(tool, "tool not implemented"))?;

        let allowed = AllowedNamespaces::parse(&config.tools.allowed_namespaces);
        if spec.scope == Scope::Namespaced {
            let namespace = request
                .namespace()
                .ok_or_else(|| ToolError::invalid_input(tool, "namespace required"))?;
            if !allowed.is_allowed(namespace) {
                return Err(ToolError::permission_denied(tool, "namespace not allowed"));
            }
        }

        let client = self.clients.connect().await.map_err(|e| {
            tracing::error!(tool_name = tool, error = %e, "Cluster client init failed");
            ToolError::execution(tool, "client init failed")
        })?;

        // Time already spent counts against the ceiling.
        let budget = self.ceiling.saturating_sub(received.elapsed());
        let ctx = ToolContext::new(request.timeout.min(budget));
        let invocation = ToolInvocation {
            ctx: ctx.clone(),
            client,
            args: request.args.clone(),
            allowed,
        };
        let call = (spec.handler)(invocation).instrument(span.span().clone());
        let result = run_with_deadline(&ctx, call)
            .await
            .map_err(|DeadlineExceeded(after)| {
                ToolError::new(
                    tool,
                    ErrorKind::Timeout,
                    format!("tool timed out after {}ms", after.as_millis()),
                )
            })??;

        Ok(bound(redact(&result), config.tools.max_output_bytes))
    }

    fn finish(
        &self,
        span: ToolSpan,
        correlation: Correlation,
        instrumentation: &Instrumentation,
        namespace: Option<String>,
        response: ToolResponse,
        accepted: Result<(), AuditError>,
    ) -> Dispatched {
        let tool = response.tool_name.clone();
        let error_type = response.error().map(|e| e.kind().as_str());

        span.span().in_scope(|| match response.error() {
            Some(error) => tracing::warn!(
                tool_name = %tool,
                error_type = error.kind().as_str(),
                error = error.message(),
                latency_ms = response.latency_ms(),
                "Tool call failed"
            ),
            None => tracing::info!(
                tool_name = %tool,
                truncated = response.truncated,
                latency_ms = response.latency_ms(),
                "Tool call succeeded"
            ),
        });

        let finished = span.end([
            ("namespace", optional(namespace.as_deref())),
            ("session_id", optional(instrumentation.session_id.as_deref())),
            ("agent_run_id", optional(instrumentation.agent_run_id.as_deref())),
            ("result_status", Value::from(response.status().as_str())),
            ("error_type", optional(error_type)),
            ("truncated", Value::Bool(response.truncated)),
            ("latency_ms", Value::from(response.latency_ms())),
        ]);

        let recorded = self.audit.record(
            &correlation,
            &AuditEvent::ToolResult {
                tool_name: tool.clone(),
                namespace,
                outcome: response.status().as_str(),
                truncated: response.truncated,
                error_type,
                error: response.error().map(|e| e.message().to_string()),
                latency_ms: response.latency_ms(),
            },
        );

        let label = if self.registry.contains(&tool) {
            tool.as_str()
        } else {
            UNREGISTERED
        };
        metrics::record_tool_call(
            label,
            response.status().as_str(),
            error_type.unwrap_or(""),
            response.latency,
        );
        if response.truncated {
            metrics::record_truncated(label);
        }

        Dispatched {
            response,
            span: finished,
            audit: accepted.and(recorded),
        }
    }
}

/// Null values are skipped when the span records attributes.
fn optional(value: Option<&str>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

fn correlation(span: &ToolSpan, instrumentation: &Instrumentation) -> Correlation {
    Correlation {
        trace_id: span.context().trace_id.clone(),
        span_id: span.context().span_id.clone(),
        session_id: instrumentation.session_id.clone().unwrap_or_default(),
        agent_run_id: instrumentation.agent_run_id.clone().unwrap_or_default(),
    }
}
