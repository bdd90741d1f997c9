//! Tavily MCP server - main entry point.
//!
//! Serves the search tools over streamable HTTP (default) or stdio.

use clap::Parser;
use std::net::SocketAddr;
use tavily_mcp::server::{serve_stdio, HttpServer, McpService, TavilySearchServer};
use tavily_mcp::types::Transport;
use tavily_mcp::{Config, Error};

#[derive(Debug, Parser)]
#[command(name = "tavily-mcp-server", version, about = "Tavily search tools over MCP")]
struct Args {
    /// Transport to serve on (streamable-http, stdio)
    #[arg(long, env = "TAVILY_MCP_TRANSPORT", value_parser = parse_transport)]
    transport: Option<Transport>,

    /// HTTP bind address
    #[arg(long, env = "TAVILY_MCP_LISTEN_ADDR")]
    listen: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Log level when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

fn parse_transport(value: &str) -> Result<Transport, String> {
    Transport::parse(value).ok_or_else(|| format!("unknown transport '{}'", value))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration, then apply command-line overrides
    let mut config = Config::from_env();
    if let Some(transport) = args.transport {
        config.server.transport = transport;
    }
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }
    if args.json_logs {
        config.observability.json_logs = true;
    }
    if let Some(level) = args.log_level {
        config.observability.log_level = level;
    }

    tavily_mcp::observability::init_tracing(&config.observability);

    let service = McpService::build(TavilySearchServer::new(), &config)?;

    match config.server.transport {
        Transport::StreamableHttp => {
            let addr: SocketAddr = config.server.listen_addr.parse().map_err(|_| {
                Error::configuration(format!(
                    "invalid listen address '{}'",
                    config.server.listen_addr
                ))
            })?;
            tracing::info!("Tavily MCP server starting on {}", addr);

            let server = HttpServer::new(service, addr, config.server.mcp_path.clone());
            let cancel = server.cancellation_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            });
            server.serve().await?;
        }
        Transport::Stdio => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            serve_stdio(&service, stdin, tokio::io::stdout()).await?;
        }
    }

    Ok(())
}
