//! respkv Server Binary
//!
//! Starts the TCP server for respkv.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use respkv::network::Server;
use respkv::{AofSyncStrategy, Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// respkv Server
#[derive(Parser, Debug)]
#[command(name = "respkv-server")]
#[command(about = "In-memory key-value store speaking RESP, with an append-only log")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./respkv_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// When to fsync the AOF: "always" (after every write) or "periodic"
    #[arg(long, default_value = "periodic")]
    appendfsync: AofSyncStrategy,

    /// Seconds between background fsyncs of the AOF
    #[arg(long, default_value = "30")]
    flush_interval_secs: u64,

    /// Run memory-only, without an append-only log
    #[arg(long)]
    no_aof: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,respkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("respkv Server v{}", respkv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .aof_enabled(!args.no_aof)
        .aof_sync_strategy(args.appendfsync)
        .aof_flush_interval(Duration::from_secs(args.flush_interval_secs))
        .build();

    // Open engine
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(persistent = engine.is_persistent(), "Engine initialized successfully");

    // Start server
    let server = match Server::bind(config, Arc::clone(&engine)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received shutdown signal, stopping...");
        shutdown.shutdown();
    }) {
        tracing::warn!("Failed to install signal handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
    drop(server);

    // Connections still open keep their own reference to the engine
    let closed = match Arc::try_unwrap(engine) {
        Ok(engine) => engine.close(),
        Err(engine) => engine.sync_log(),
    };
    if let Err(e) = closed {
        tracing::error!("Final AOF sync failed: {}", e);
    }
    tracing::info!("Server stopped");
}
