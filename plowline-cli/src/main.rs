use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use plowline_server::{PlowlineServer, ServerConfig};
use tracing::info;

mod config;

use config::{CONFIG_FILE_NAME, ConfigLoader};

#[derive(Parser)]
#[command(name = "plowline", about = "Live viewer for analytics tracker events")]
#[command(version)]
struct Cli {
    /// Environment table to apply on top of [default]
    #[arg(short, long)]
    env: Option<String>,

    /// Config file to read before ~/.config/plowline.toml
    #[arg(short, long, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let loaded = ConfigLoader::load(&cli.config, cli.env.as_deref())?;
    let config: ServerConfig = loaded.into();

    info!(
        max_events = config.max_events,
        events_path = %config.events_path(),
        "Starting plowline server on {}",
        config.addr()
    );
    info!("Viewer available at {}", config.url());

    PlowlineServer::new(config)?.run().await?;
    Ok(())
}
