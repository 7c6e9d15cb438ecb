//! Snake Arena Server
//!
//! Runs one multiplayer snake session over WebSocket until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use snake_arena::{GameConfig, GameServer, ServerConfig, VERSION};

/// Command line arguments.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Port to listen on
    #[clap(short, long, default_value = "3000")]
    port: u16,
    /// Board width in cells, walls included
    #[clap(long, default_value = "130")]
    width: i32,
    /// Board height in cells, walls included
    #[clap(long, default_value = "35")]
    height: i32,
    /// Milliseconds between ticks
    #[clap(long, default_value = "150")]
    tick_ms: u64,
    /// Milliseconds between round start and the first tick
    #[clap(long, default_value = "3000")]
    start_delay_ms: u64,
    /// Maximum players in the session
    #[clap(long, default_value = "8")]
    max_players: usize,
    /// Maximum concurrent connections
    #[clap(long, default_value = "256")]
    max_connections: usize,
    /// Fixed base seed for fruit placement
    #[clap(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bind_addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", args.host, args.port))?;

    let game_config = GameConfig {
        board_width: args.width,
        board_height: args.height,
        tick_interval: Duration::from_millis(args.tick_ms),
        start_delay: Duration::from_millis(args.start_delay_ms),
        max_players: args.max_players,
        seed: args.seed,
        ..Default::default()
    };
    game_config.validate().context("invalid game configuration")?;

    let server_config = ServerConfig {
        bind_addr,
        max_connections: args.max_connections,
        ..Default::default()
    };

    info!("Snake Arena Server v{}", VERSION);
    info!(
        "Board {}x{}, tick {:?}, start delay {:?}, players {}-{}",
        game_config.board_width,
        game_config.board_height,
        game_config.tick_interval,
        game_config.start_delay,
        game_config.min_players,
        game_config.max_players,
    );

    let server = Arc::new(GameServer::new(server_config, game_config));

    // Ctrl-C triggers a graceful shutdown
    {
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received");
                    server.shutdown();
                }
                Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
            }
        });
    }

    server.run().await?;
    info!("Server stopped");
    Ok(())
}
