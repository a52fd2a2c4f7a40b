//! Tool gateway binary.
//!
//! ```text
//!     Agent / MCP client
//!            │  POST /tools/execute, POST /mcp
//!            ▼
//!   ┌──────────────────────────────────────────────────────┐
//!   │ http (axum) → dispatcher → registry → handler        │
//!   │                  │  allowlist, deadline, span        │
//!   │                  ▼                                   │
//!   │           cluster client (per request)               │
//!   │                  │                                   │
//!   │     redact → bound → audit (rotating file) → reply   │
//!   └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use tool_gateway::config::watcher::ConfigWatcher;
use tool_gateway::config::{self, load_config};
use tool_gateway::lifecycle::{signals, Shutdown};
use tool_gateway::observability::{logging, metrics, AuditLog};
use tool_gateway::tools::{Dispatcher, SnapshotClientFactory, ToolRegistry};
use tool_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "tool-gateway")]
#[command(about = "Guarded tool-execution gateway", long_about = None)]
struct Cli {
    /// TOML config file; environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let sink = logging::init(&config.observability)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tool-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        default_timeout_ms = config.tools.default_timeout_ms,
        max_output_bytes = config.tools.max_output_bytes,
        log_file = %sink.path().display(),
        "Configuration loaded"
    );
    if config.tools.allowed_namespaces.trim().is_empty() {
        tracing::warn!("No allowed namespaces configured, every namespaced call will be denied");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = Arc::new(ToolRegistry::builtin());
    tracing::info!(tools = registry.len(), "Tool registry frozen");

    let clients = Arc::new(SnapshotClientFactory::new(
        config.cluster.snapshot_path.as_ref().map(PathBuf::from),
    ));
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let shared = config::shared(config);

    let dispatcher = Arc::new(Dispatcher::new(
        registry,
        clients,
        shared.clone(),
        AuditLog::new(sink.clone()),
    ));
    let server = GatewayServer::new(&shared.load(), dispatcher);

    // Keep the watcher alive for the life of the process.
    let _watcher = match &cli.config {
        Some(path) => {
            signals::spawn_reload_listener(path.clone(), shared.clone());
            match ConfigWatcher::new(path, shared.clone()).run() {
                Ok(watcher) => Some(watcher),
                Err(e) => {
                    tracing::warn!(error = %e, "Config hot reload disabled");
                    None
                }
            }
        }
        None => None,
    };

    let shutdown = Arc::new(Shutdown::new());
    let receiver = shutdown.subscribe();
    signals::spawn_shutdown_listener(shutdown.clone());

    server.run(listener, receiver).await?;

    sink.flush()?;
    tracing::info!("Shutdown complete");
    Ok(())
}
