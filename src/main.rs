//! Sandbox gateway server.
//!
//! # Architecture Overview
//!
//! ```text
//!   startup
//!     ├─ config (gateway.toml) + env file (.env)
//!     ├─ LifecycleOrchestrator::ensure_running
//!     │     compose ──(any failure)──▶ native Docker API
//!     └─ HttpServer
//!           /<handler>  → authorization pipeline → handler
//!           /           → index page
//!           /mcp        → MCP bridge
//!
//!   SIGINT / SIGTERM → drain server → teardown → exit 0
//!   SIGHUP           → reload credentials
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use sandbox_gateway::config::{load_config, load_or_default, resolve_bind, EnvSettings};
use sandbox_gateway::http::GitCli;
use sandbox_gateway::lifecycle::{signals, RuntimeMode};
use sandbox_gateway::observability::{logging, metrics};
use sandbox_gateway::{Gateway, LifecycleOrchestrator, Shutdown};

const DEFAULT_CONFIG: &str = "gateway.toml";

#[derive(Parser, Debug)]
#[command(name = "sandbox-gateway", version, about = "Web UI gateway for a sandboxed execution service")]
struct Cli {
    /// Config file (default: gateway.toml, optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen host, overrides WEB_UI_HOST and the config file
    #[arg(long)]
    host: Option<String>,

    /// Listen port, overrides WEB_UI_PORT and the config file
    #[arg(long)]
    port: Option<u16>,

    /// This process runs inside the sandbox container itself
    #[arg(long)]
    dockerized: bool,

    /// Environment file with credentials
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => load_or_default(Path::new(DEFAULT_CONFIG))?,
    };

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "sandbox-gateway starting");

    let env = EnvSettings::read(&cli.env_file);
    let mode = RuntimeMode::initialize(cli.dockerized);
    let cwd = std::env::current_dir()?;

    tracing::info!(
        auto_start = config.service.auto_start,
        service = %config.service.name,
        image = %config.service.image,
        "Configuration loaded"
    );

    let orchestrator = Arc::new(LifecycleOrchestrator::from_config(
        &config.service,
        &cwd,
        mode.is_dockerized(),
    ));
    let gateway = Gateway::build(
        &config,
        &env,
        orchestrator.clone(),
        mode.is_dockerized(),
        Arc::new(GitCli::new(&cwd)),
    )?;

    let (host, port) = resolve_bind(cli.host.as_deref(), cli.port, &env, &config.server);
    let listener = TcpListener::bind((host.as_str(), port)).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // Subscribed before the start so a signal during it is not lost.
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let credentials = gateway.credentials().clone();
    signals::spawn_listener(shutdown.clone(), move || credentials.reload(&env));
    signals::spawn_start_notice(shutdown.subscribe(), orchestrator.clone());

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    match orchestrator.ensure_running().await {
        Ok(outcome) => tracing::info!(outcome = ?outcome, "Backend service ready"),
        Err(e) => tracing::error!(error = %e, "Backend service did not start, serving without it"),
    }

    let served = gateway.into_server().run(listener, server_shutdown).await;

    let outcome = orchestrator.teardown().await;
    tracing::info!(outcome = ?outcome, "Shutdown complete");

    served?;
    Ok(())
}
