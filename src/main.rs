//! gaxy: Google Analytics first-party relay.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ trace → cors → request-id → timeout → router
//!                                                            │
//!                      /ping ◀──────────────────────────────┤
//!                                                            ▼
//!                                          strip prefix, resolve origin
//!                                          inject / skip / force params
//!                                                            │
//!                                                            ▼
//!                                          pooled client ──▶ Google
//!                                                            │
//!     Client Response                                        ▼
//!     ◀───────────── x-proxy-by ◀── rewrite JS ◀── decode body
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use gaxy::config::{resolve_config, ConfigOverrides};
use gaxy::lifecycle::signals::spawn_signal_listener;
use gaxy::observability::{logging, metrics};
use gaxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "gaxy")]
#[command(about = "First-party relay for Google Analytics and Tag Manager", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long, env = "GAXY_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref(), cli.overrides)?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("gaxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.bind_address(),
        google_origin = %config.google_origin,
        route_prefix = %config.route_prefix,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Configuration loaded"
    );

    if let Some(addr) = config.observability.metrics_socket_addr() {
        metrics::init_metrics(addr);
    }

    let listener = TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listen on port {}", config.port);

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
