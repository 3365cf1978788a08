//! Core application infrastructure

pub mod cli;
pub mod config;
pub mod constants;
pub mod shutdown;

pub use crate::app::App;
pub use cli::CliConfig;
pub use config::{AppConfig, ConfigError};
pub use shutdown::ShutdownService;
