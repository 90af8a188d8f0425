//! Lightweight API Gateway
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────┐
//!                      │                  API GATEWAY                    │
//!                      │                                                 │
//!   Client Request     │  ┌─────────┐   ┌──────────────┐   ┌─────────┐  │
//!   ───────────────────┼─▶│  http   │──▶│   routing    │──▶│ forward │──┼──▶ Backend
//!                      │  │ server  │   │   engine     │   │ client  │  │
//!                      │  └─────────┘   └──────────────┘   └─────────┘  │
//!                      │                                                 │
//!                      │  ┌───────────────────────────────────────────┐ │
//!                      │  │          Cross-Cutting Concerns            │ │
//!                      │  │  ┌────────┐ ┌─────────────┐ ┌──────────┐  │ │
//!                      │  │  │ config │ │observability│ │lifecycle │  │ │
//!                      │  │  │+reload │ │ logs/metrics│ │ shutdown │  │ │
//!                      │  │  └────────┘ └─────────────┘ └──────────┘  │ │
//!                      │  └───────────────────────────────────────────┘ │
//!                      └────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use api_gateway::config::loader::load_config;
use api_gateway::config::watcher::ConfigWatcher;
use api_gateway::config::GatewayConfig;
use api_gateway::http::GatewayServer;
use api_gateway::lifecycle::Shutdown;
use api_gateway::observability::{logging, metrics};
use api_gateway::routing::RouteLocatorFactory;

#[derive(Debug, Parser)]
#[command(name = "api-gateway", about = "Lightweight API gateway")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // A missing config file falls back to defaults; a present but invalid
    // one is fatal.
    let config = if args.config.exists() {
        load_config(&args.config)?
    } else {
        GatewayConfig::default()
    };

    logging::init(&config.observability.log_level);

    tracing::info!("api-gateway v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        request_timeout_secs = config.listener.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // Watch the config file; each successful reload is recompiled and
    // swapped in by the server's reload task.
    let (config_updates, _watcher_guard) = if args.config.exists() {
        let (watcher, updates) = ConfigWatcher::new(&args.config);
        let guard = watcher.run()?;
        (updates, Some(guard))
    } else {
        let (_, updates) = mpsc::unbounded_channel();
        (updates, None)
    };

    let shutdown = Shutdown::new();
    // Route compilation errors are fatal at startup: no inconsistent
    // route set is ever served.
    let server = GatewayServer::new(config, RouteLocatorFactory::with_builtins())?;
    server
        .run(listener, config_updates, shutdown.subscribe())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
