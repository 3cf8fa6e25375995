mod migrations;
mod server;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use voto_api::AppState;
use voto_core::{
    bootstrap::{init_database, init_services, load_config},
    logging,
};
use voto_realtime::ChannelHub;

use server::VotoServer;

/// Classroom live-polling server
#[derive(Debug, Parser)]
#[command(name = "voto", version, about)]
struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, env = "VOTO_CONFIG_PATH")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load and validate configuration
    let config = load_config(cli.config.as_deref())?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("Voto server starting...");
    info!("HTTP address: {}", config.http_address());

    // 3. Initialize database
    let pool = init_database(&config).await?;

    // 4. Run migrations
    migrations::run_migrations(&pool, config.redis_url()).await?;

    // 5. Initialize services
    let services = init_services(pool.clone(), &config)?;

    // 6. Shared state for HTTP and WebSocket handlers
    let hub = ChannelHub::new();
    let state = AppState::new(services, &config.session, hub.clone());

    // 7. Serve until a shutdown signal arrives
    VotoServer::new(config, state, hub, pool).start().await
}
