//! Strictly Gomoku - CLI entry point.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use std::path::PathBuf;
use strictly_server::{Gateway, ServerConfig, router, selfplay};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Command::Serve { config, host, port } => run_server(config, host, port).await,
        Command::Selfplay { seed } => {
            run_selfplay(seed);
            Ok(())
        }
    }
}

/// Run the WebSocket server until Ctrl+C.
#[instrument]
async fn run_server(
    config: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let mut config = ServerConfig::load(config.as_deref())?;
    if let Some(host) = host {
        config = config.with_host(host);
    }
    if let Some(port) = port {
        config = config.with_port(port);
    }

    let addr = config.bind_addr();
    let gateway = Gateway::new(config);
    let app = router(gateway.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Server ready, WebSocket endpoint at /ws");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
            }
        })
        .await?;

    gateway.shutdown().await;
    info!("Server stopped");
    Ok(())
}

/// Print a self-played game.
fn run_selfplay(seed: Option<u64>) {
    let game = selfplay::play(seed);
    println!("{}", game.board().display());
    println!("{} after {} moves", game.outcome(), game.move_count());
    if let Some(line) = game.winning_line() {
        let cells: Vec<String> = line.iter().map(ToString::to_string).collect();
        println!("winning line: {}", cells.join(" "));
    }
}
