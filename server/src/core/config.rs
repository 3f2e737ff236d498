//! Application configuration, assembled from CLI arguments, environment
//! variables (via clap's env mirrors) and defaults.

use std::path::PathBuf;

use super::cli::CliConfig;
use super::constants::{DEFAULT_HOST, DEFAULT_PORT};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// Data directory override (otherwise platform default)
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn load(cli: &CliConfig) -> Self {
        Self {
            server: ServerConfig {
                host: cli.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: cli.port.unwrap_or(DEFAULT_PORT),
            },
            data_dir: cli.data_dir.clone(),
        }
    }
}
