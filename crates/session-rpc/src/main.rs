//! Session RPC Server - JSON-RPC host for plugin sessions.
//!
//! Binds the session registry to a shared cache and serves it over HTTP.

use anyhow::Result;
use clap::Parser;
use session_core::config::RpcConfig;
use session_core::{init_shared_cache, SessionRegistry, SharedCacheSettings};
use session_rpc::start_server;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "session-rpc")]
#[command(about = "JSON-RPC server for plugin sessions")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = RpcConfig::DEFAULT_HOST)]
    host: String,

    /// Shared cache location (memory:// or sqlite://<path>)
    #[arg(long, default_value = "memory://")]
    cache: SharedCacheSettings,

    /// Cluster id stamped on sessions created through this host
    #[arg(long, default_value = "default")]
    cluster_id: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting Session RPC Server");

    let backend = init_shared_cache(&args.cache)?;
    let registry = Arc::new(SessionRegistry::with_cache(backend));

    let addr = start_server(registry, args.cluster_id, &args.host, args.port).await?;

    // Parent processes read the port from stdout
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
