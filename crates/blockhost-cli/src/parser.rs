//! Main CLI parser and top-level argument handling.

use clap::Parser;
use std::path::PathBuf;

use crate::commands::Commands;

/// Command-line interface for the game server supervisor.
#[derive(Parser)]
#[command(name = "blockhost")]
#[command(about = "Run and supervise game server processes")]
#[command(version)]
pub struct Cli {
    /// Config file with settings and server definitions
    #[arg(long, short = 'c', global = true, env = "BLOCKHOST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
