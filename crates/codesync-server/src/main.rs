//! CodeSync server binary: collaborative editing over WebSockets plus
//! sandboxed code execution behind a JSON endpoint. The isolation backend
//! is probed once at startup; without it the server still runs, loudly,
//! in degraded-security mode.

use anyhow::Result;
use clap::Parser;
use codesync_core::{ExecutionService, Sandbox, SandboxConfig};
use codesync_server::{shutdown_signal, CodeSyncServer, ServerConfig};
use log::LevelFilter;
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[clap(author, version, about = "CodeSync server - realtime collaborative editing with sandboxed execution")]
struct Cli {
    #[clap(long, default_value = "127.0.0.1:8000")]
    bind_addr: String,

    #[clap(long, short, default_value = "info")]
    log_level: String,

    #[clap(long, default_value = "python:3.10-slim", help = "Pinned runtime image for isolated execution")]
    image: String,

    #[clap(long, default_value_t = 5, help = "Wall-clock execution timeout in seconds")]
    timeout_secs: u64,

    #[clap(long, default_value_t = 4, help = "Maximum concurrent code executions")]
    max_executions: usize,

    #[clap(long, default_value_t = 32, help = "Maximum peers per collaboration session")]
    max_peers: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let log_level_filter = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .init();

    let sandbox_config = SandboxConfig {
        image: cli.image,
        timeout_seconds: cli.timeout_secs,
        ..SandboxConfig::default()
    };

    // One-shot probe: isolation availability is decided here, for the
    // process lifetime.
    let sandbox = Sandbox::probe(sandbox_config).await;
    let service = ExecutionService::new(sandbox, cli.max_executions);

    let bind_socket_addr: SocketAddr = cli
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", cli.bind_addr, e))?;

    let server_config = ServerConfig::default()
        .with_bind_addr(bind_socket_addr)
        .with_max_peers_per_session(cli.max_peers);

    log::info!("Starting CodeSync server on {}...", bind_socket_addr);

    let server = CodeSyncServer::with_config(service, server_config);

    if let Err(e) = server.serve_with_shutdown(shutdown_signal()).await {
        log::error!("Server failed: {}", e);
        return Err(e.into());
    }

    Ok(())
}
