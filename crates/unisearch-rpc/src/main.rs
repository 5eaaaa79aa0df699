//! Unisearch RPC Server - JSON-RPC front end for unified file search.
//!
//! This binary provides a JSON-RPC 2.0 server that wraps the unisearch-core
//! library and exposes it as a single `search` tool.

mod handlers;
mod server;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use unisearch_core::{SearchConfig, SearchService};

#[derive(Parser, Debug)]
#[command(name = "unisearch-rpc")]
#[command(about = "JSON-RPC server for Unisearch file search")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Seconds a single backend search may run before it is abandoned
    #[arg(long, default_value_t = SearchConfig::BACKEND_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// Sensitive results redacted per request before redaction stops
    #[arg(long, default_value_t = SearchConfig::DEFAULT_MAX_FILTERED)]
    max_filtered: usize,

    /// JSON file with `keywords` and `paths` replacing the built-in sensitive patterns
    #[arg(long)]
    sensitive_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries the RPC_PORT line.
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    info!("Starting Unisearch RPC Server");

    let mut builder = SearchService::builder()
        .timeout(Duration::from_secs(args.timeout_secs))
        .max_filtered(args.max_filtered);
    if let Some(path) = args.sensitive_config {
        builder = builder.sensitive_config(path);
    }
    let service = builder.build()?;

    info!(
        "Platform: {}, backend: {}",
        service.platform(),
        service.backend_name().unwrap_or("none")
    );

    // Start the server
    let addr = server::start_server(service, &args.host, args.port).await?;

    // Print port for the parent process to read (intentional stdout)
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
