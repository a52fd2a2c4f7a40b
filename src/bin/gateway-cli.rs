use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Operator CLI for the tool gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway liveness
    Health,
    /// List registered tools
    Tools,
    /// Execute a tool
    Call {
        /// Tool name, e.g. k8s.list_pods
        tool: String,
        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
        /// Per-call timeout; 0 uses the gateway default
        #[arg(short, long, default_value_t = 0)]
        timeout_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{base}/health")).send().await?;
            print_response(res).await?;
        }
        Commands::Tools => {
            let res = client
                .post(format!("{base}/mcp"))
                .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Call {
            tool,
            args,
            timeout_ms,
        } => {
            let args: Map<String, Value> = serde_json::from_str(&args)
                .map_err(|e| format!("--args must be a JSON object: {e}"))?;
            let res = client
                .post(format!("{base}/tools/execute"))
                .json(&json!({"tool_name": tool, "args": args, "timeout_ms": timeout_ms}))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

/// Tool errors come back as JSON envelopes with non-2xx codes; print those too.
async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: gateway returned status {status}");
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{text}"),
    }
    Ok(())
}
