//! Command-line interface for strictly_gomoku.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Strictly Gomoku - authoritative five-in-a-row session server
#[derive(Parser, Debug)]
#[command(name = "strictly_gomoku")]
#[command(
    about = "Five-in-a-row session server with matchmaking and reconnection",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the WebSocket game server
    Serve {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Let the computer play itself and print the result
    Selfplay {
        /// Seed for a reproducible game
        #[arg(long)]
        seed: Option<u64>,
    },
}
