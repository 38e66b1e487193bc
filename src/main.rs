//! Grid Bastion - Entry Point
//!
//! Loads configuration, opens the statistics store, and serves the
//! websocket endpoint until the process is stopped.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use grid_bastion::core::config::ServerConfig;
use grid_bastion::core::error::Result;
use grid_bastion::net;
use grid_bastion::session::MatchRegistry;
use grid_bastion::stats::{FileStore, StatsHandle};

#[derive(Parser, Debug)]
#[command(name = "grid-bastion", about = "Authoritative grid battle server")]
struct Cli {
    /// Path of a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen port, overriding the configuration file
    #[arg(long)]
    port: Option<u16>,

    /// Statistics file path, overriding the configuration file
    #[arg(long)]
    stats_path: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grid_bastion=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(stats_path) = cli.stats_path {
        config.stats_path = stats_path;
    }

    tracing::info!(port = config.port, stats = %config.stats_path, "grid-bastion starting");

    let stats = Arc::new(StatsHandle::load(Box::new(FileStore::new(
        &config.stats_path,
    )))?);
    let registry = Arc::new(MatchRegistry::new(stats, config.clone()));

    net::serve(&config, registry).await
}
