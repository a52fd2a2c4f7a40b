//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID, timeout)
//! - Hand tool calls to the dispatcher and map outcomes to status codes
//! - Report audit sink failures out of band
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::http::mcp::{self, McpReply};
use crate::http::request::{propagate_request_id_layer, request_span, set_request_id_layer};
use crate::observability::metrics;
use crate::tools::{Dispatched, Dispatcher};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// HTTP front end of the gateway.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    /// Layer limits come from `config` and are fixed for the server's life.
    pub fn new(config: &GatewayConfig, dispatcher: Arc<Dispatcher>) -> Self {
        let router = Self::build_router(config, AppState { dispatcher });
        Self { router }
    }

    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/tools/execute", post(execute_handler))
            .route("/mcp", post(mcp_handler))
            .with_state(state)
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| request_span(request)))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn health_handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn execute_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let dispatched = state.dispatcher.dispatch_bytes(&body).await;
    report_audit_failure(&dispatched);
    let status = dispatched.response.status_code();
    (status, Json(dispatched.response)).into_response()
}

async fn mcp_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let (reply, dispatched) = mcp::handle_message(&state.dispatcher, &body).await;
    if let Some(dispatched) = &dispatched {
        report_audit_failure(dispatched);
    }
    match reply {
        McpReply::Message(message) => Json(message).into_response(),
        McpReply::Accepted => StatusCode::ACCEPTED.into_response(),
    }
}

/// The response has already been computed; a failed audit write only logs.
fn report_audit_failure(dispatched: &Dispatched) {
    if let Err(error) = &dispatched.audit {
        metrics::record_audit_failure();
        tracing::error!(
            tool_name = %dispatched.response.tool_name,
            trace_id = %dispatched.span.context.trace_id,
            error = %error,
            "Audit record write failed"
        );
    }
}
