use std::path::PathBuf;

use clap::Parser;
use lanes_backend::config::{default_config_path, load_config};
use lanes_backend::server::spawn_server;
use lanes_backend::state::AppState;
use lanes_backend::log_bridge;
use lanes_core::sample::ensure_sample_board;
use lanes_core::storage::LocalStorage;

/// Filesystem-backed kanban board server.
#[derive(Debug, Parser)]
#[command(name = "lanes-server", version, about)]
struct Cli {
    /// Config file (defaults to <config dir>/lanes/server.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding boards/ and uploads/
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Port to listen on (0 picks a free port)
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    bind: Option<String>,

    /// Create the "Sample Board" on startup if it does not exist
    #[arg(long)]
    seed_sample: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = load_config(&config_path);
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }

    if let Err(e) = log_bridge::init(Some(config.data_dir.join("logs").join("server.log"))) {
        eprintln!("Failed to install logger: {}", e);
    }
    log::info!(
        target: "lanes.server",
        "Using config {} (data dir {})",
        config_path.display(),
        config.data_dir.display()
    );

    let storage = LocalStorage::open(&config.data_dir)?;
    if cli.seed_sample {
        let board = ensure_sample_board(&storage)?;
        log::info!(
            target: "lanes.server",
            "Sample board ready: {} ({} cards)",
            board.id,
            board.cards.len()
        );
    }

    let state = AppState::new(storage, &config);
    spawn_server(state).await?;

    tokio::signal::ctrl_c().await?;
    log::info!(target: "lanes.server", "Shutting down");
    Ok(())
}
