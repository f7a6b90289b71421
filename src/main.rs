//! Request multiplexer (v1)
//!
//! Serves `POST /mux` envelopes and forwards every individual request, as
//! well as every non-multiplexed request, to one upstream HTTP server.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │               REQUEST MUX                     │
//!   Envelope Request      │  ┌────────┐   ┌────────┐   ┌─────────────┐   │
//!   ──────────────────────┼─▶│  http  │──▶│ parser │──▶│  scheduler  │   │
//!                         │  │ server │   └────────┘   │ (fork-join) │   │
//!                         │  └────────┘                └──────┬──────┘   │
//!                         │                                   │ per node │
//!                         │                                   ▼          │
//!                         │                 ┌─────────┐  ┌──────────┐    │
//!                         │                 │ adapter │─▶│ dispatch │────┼──▶ Upstream
//!                         │                 └─────────┘  └──────────┘    │
//!   Envelope Response     │  ┌────────────┐                   │          │
//!   ◀─────────────────────┼──│ aggregator │◀── results table ◀┘          │
//!                         │  └────────────┘                              │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use request_mux::config::{load_config, MuxConfig};
use request_mux::lifecycle::signals::shutdown_on_ctrl_c;
use request_mux::observability::{logging, metrics};
use request_mux::{HttpServer, Shutdown, UpstreamHandler};

#[derive(Parser)]
#[command(name = "request-mux")]
#[command(about = "Multiplexes batches of dependent HTTP requests", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => MuxConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("request-mux v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        max_requests = config.multiplexer.max_requests,
        whitelisted_headers = config.multiplexer.header_whitelist.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let handler = Arc::new(UpstreamHandler::new(&config.upstream)?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(shutdown_on_ctrl_c(shutdown.clone()));

    let server = HttpServer::new(config, handler);
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
