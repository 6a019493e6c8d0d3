//! Invite Express — multi-channel event invitation dispatch for college
//! committees.
//!
//! Main entry point that loads configuration and starts the API server.

use clap::Parser;
use invite_api::ApiServer;
use invite_core::config::AppConfig;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "invite-express")]
#[command(about = "Multi-channel event invitation dispatch service")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "INVITE_EXPRESS__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "INVITE_EXPRESS__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Metrics port (overrides config)
    #[arg(long, env = "INVITE_EXPRESS__METRICS__PORT")]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "invite_express=info,invite_api=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Invite Express starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        metrics_port = config.metrics.port,
        "Configuration loaded"
    );

    let api_server = ApiServer::new(config);

    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("Invite Express is ready to serve traffic");

    // Blocks until shutdown.
    api_server.start_http().await?;

    Ok(())
}
