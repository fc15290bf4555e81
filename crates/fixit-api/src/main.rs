//! fixit-api: HTTP server binary

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use fixit_api::{AppState, router};
use fixit_core::{Config, Tracker};

#[derive(Parser)]
#[command(name = "fixit-api")]
#[command(about = "REST API server for the fixit facility issue tracker")]
#[command(version)]
struct Args {
    /// Path to the config file
    #[arg(long, env = "FIXIT_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind to (overrides server.host)
    #[arg(long, env = "FIXIT_HOST")]
    host: Option<String>,

    /// Port to listen on (overrides server.port)
    #[arg(long, env = "FIXIT_PORT")]
    port: Option<u16>,
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);

    let tracker = Tracker::from_config(config).context("Failed to initialise tracker")?;
    let app = router(AppState::new(tracker));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Starting fixit-api on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
