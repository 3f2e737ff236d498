use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{DEFAULT_BACKFILL_LIMIT, ENV_DATA_DIR, ENV_HOST, ENV_PORT};

#[derive(Parser)]
#[command(name = "clawdeck")]
#[command(version, about = "Agent conversation observability backend", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Data directory override
    #[arg(long, global = true, env = ENV_DATA_DIR)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server (default when no command is given)
    Start,
    /// Backfill derived span columns in bounded batches
    Backfill {
        /// Rows per batch
        #[arg(long, default_value_t = DEFAULT_BACKFILL_LIMIT)]
        limit: i64,
        /// Stop after this many batches (default: run until nothing is pending)
        #[arg(long)]
        max_batches: Option<u32>,
    },
}

/// Settings extracted from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
}

pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    (
        CliConfig {
            host: cli.host,
            port: cli.port,
            data_dir: cli.data_dir,
        },
        cli.command,
    )
}
