use std::path::PathBuf;

use clap::Parser;

use super::constants::{
    ENV_API_KEY, ENV_CONFIG_PATH, ENV_DB_PATH, ENV_DEFAULT_INTERVAL, ENV_DEFAULT_TIMEOUT,
    ENV_DUMP_FAILURE_RESPONSE, ENV_ENVIRONMENT, ENV_HOSTNAME, ENV_PORT, ENV_STATIC_PATH,
};

#[derive(Parser)]
#[command(name = "semyi")]
#[command(version, about = "Uptime monitoring server", long_about = None)]
pub struct Cli {
    /// Path to the monitor configuration file (.json, .yaml or .toml)
    #[arg(long, short = 'c', env = ENV_CONFIG_PATH)]
    pub config: Option<PathBuf>,

    /// Deployment environment (development or production)
    #[arg(long, env = ENV_ENVIRONMENT)]
    pub environment: Option<String>,

    /// Address to bind the HTTP server on
    #[arg(long, env = ENV_HOSTNAME)]
    pub hostname: Option<String>,

    /// Port to bind the HTTP server on
    #[arg(long, short = 'p', env = ENV_PORT)]
    pub port: Option<u16>,

    /// SQLite database file path
    #[arg(long, env = ENV_DB_PATH)]
    pub db_path: Option<String>,

    /// Directory with the built dashboard assets
    #[arg(long, env = ENV_STATIC_PATH)]
    pub static_path: Option<PathBuf>,

    /// Probe interval in seconds for monitors that do not set one
    #[arg(long, env = ENV_DEFAULT_INTERVAL)]
    pub default_interval: Option<u64>,

    /// Probe timeout in seconds for monitors that do not set one
    #[arg(long, env = ENV_DEFAULT_TIMEOUT)]
    pub default_timeout: Option<u64>,

    /// API key required to submit incidents
    #[arg(long, env = ENV_API_KEY)]
    pub api_key: Option<String>,

    /// Log a bounded prefix of failure response bodies
    #[arg(long, env = ENV_DUMP_FAILURE_RESPONSE)]
    pub dump_failure_response: bool,
}

/// Configuration derived from CLI arguments and the environment
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub environment: Option<String>,
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub db_path: Option<String>,
    pub static_path: Option<PathBuf>,
    pub default_interval: Option<u64>,
    pub default_timeout: Option<u64>,
    pub api_key: Option<String>,
    pub dump_failure_response: bool,
}

/// Parse CLI arguments (and their environment fallbacks)
pub fn parse() -> CliConfig {
    let cli = Cli::parse();
    CliConfig {
        config: cli.config,
        environment: cli.environment,
        hostname: cli.hostname,
        port: cli.port,
        db_path: cli.db_path,
        static_path: cli.static_path,
        default_interval: cli.default_interval,
        default_timeout: cli.default_timeout,
        api_key: cli.api_key,
        dump_failure_response: cli.dump_failure_response,
    }
}
