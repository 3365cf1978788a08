//! Application configuration
//!
//! Monitors and alerting come from a configuration file whose format is
//! picked by extension (JSON, YAML or TOML); server settings come from the
//! CLI and its environment fallbacks. Everything is normalised and
//! validated here, so a monitor that survives `load` is safe to hand to a
//! worker.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::cli::CliConfig;
use super::constants::{
    DEFAULT_CONFIG_PATH, DEFAULT_DB_PATH, DEFAULT_ENVIRONMENT, DEFAULT_HOSTNAME, DEFAULT_PORT,
    DEFAULT_RETENTION_DAYS,
};
use crate::domain::{Monitor, ProbeDefaults, ValidationError};
use crate::utils::time::BucketZone;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("unsupported configuration format '{0}' (expected json, yaml or toml)")]
    UnknownFormat(String),

    #[error("invalid monitor '{id}': {source}")]
    InvalidMonitor {
        id: String,
        source: ValidationError,
    },

    #[error("monitor '{id}' probe setup failed: {reason}")]
    Probe { id: String, reason: String },

    #[error("duplicate monitor id '{0}'")]
    DuplicateMonitor(String),

    #[error("no monitors configured")]
    NoMonitors,

    #[error("{0}")]
    Invalid(String),
}

// =============================================================================
// File config structs
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramConfig {
    pub url: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackConfig {
    pub webhook_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpWebhookConfig {
    pub url: String,
}

/// Alert channel credentials
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertingConfig {
    pub telegram: Option<TelegramConfig>,
    pub discord: Option<DiscordConfig>,
    pub slack: Option<SlackConfig>,
    pub webhook: Option<HttpWebhookConfig>,
}

/// Per-result webhook forwarding (every matching result, not just
/// transitions)
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default)]
    pub success_response: bool,
    #[serde(default = "default_true")]
    pub failed_response: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    #[serde(default)]
    monitors: Vec<Monitor>,
    #[serde(default)]
    webhook: Option<WebhookConfig>,
    #[serde(default)]
    alerting: Option<AlertingConfig>,
    #[serde(default)]
    retention_period: Option<u32>,
    /// `local`, `utc`, or an IANA name. UTC is the safe choice for
    /// deployments that may move across timezones.
    #[serde(default)]
    timezone: Option<String>,
}

// =============================================================================
// Resolved application config
// =============================================================================

#[derive(Debug)]
pub struct AppConfig {
    pub environment: String,
    pub hostname: String,
    pub port: u16,
    pub db_path: String,
    pub static_path: Option<PathBuf>,
    pub api_key: Option<String>,
    pub dump_failure_response: bool,
    pub monitors: Vec<Monitor>,
    pub alerting: AlertingConfig,
    pub webhook: Option<WebhookConfig>,
    pub retention_days: u32,
    pub timezone: BucketZone,
}

impl AppConfig {
    pub fn load(cli: &CliConfig) -> Result<Self, ConfigError> {
        let path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;

        let file = parse_file(&path, &raw)?;

        let defaults = ProbeDefaults {
            interval_seconds: cli.default_interval.unwrap_or(30),
            timeout_seconds: cli.default_timeout.unwrap_or(10),
        };
        let monitors = normalize_monitors(file.monitors, &defaults)?;

        let retention_days = file.retention_period.unwrap_or(DEFAULT_RETENTION_DAYS);
        if retention_days == 0 {
            return Err(ConfigError::Invalid(
                "retention_period must be greater than 0".to_string(),
            ));
        }

        let timezone = match file.timezone.as_deref() {
            None => BucketZone::default(),
            Some(name) => name.parse().map_err(ConfigError::Invalid)?,
        };

        Ok(AppConfig {
            environment: cli
                .environment
                .clone()
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            hostname: cli
                .hostname
                .clone()
                .unwrap_or_else(|| DEFAULT_HOSTNAME.to_string()),
            port: cli.port.unwrap_or(DEFAULT_PORT),
            db_path: cli
                .db_path
                .clone()
                .unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            static_path: cli.static_path.clone(),
            api_key: cli.api_key.clone().filter(|k| !k.is_empty()),
            dump_failure_response: cli.dump_failure_response,
            monitors,
            alerting: file.alerting.unwrap_or_default(),
            webhook: file.webhook,
            retention_days,
            timezone,
        })
    }

    pub fn monitor_ids(&self) -> Vec<String> {
        self.monitors.iter().map(|m| m.id.clone()).collect()
    }
}

fn parse_file(path: &Path, raw: &str) -> Result<FileConfig, ConfigError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let parsed = match extension.as_str() {
        "json" => serde_json::from_str::<FileConfig>(raw).map_err(|e| e.to_string()),
        "yaml" | "yml" => serde_yaml::from_str::<FileConfig>(raw).map_err(|e| e.to_string()),
        "toml" => toml::from_str::<FileConfig>(raw).map_err(|e| e.to_string()),
        other => return Err(ConfigError::UnknownFormat(other.to_string())),
    };

    parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

fn normalize_monitors(
    mut monitors: Vec<Monitor>,
    defaults: &ProbeDefaults,
) -> Result<Vec<Monitor>, ConfigError> {
    if monitors.is_empty() {
        return Err(ConfigError::NoMonitors);
    }

    let mut seen = HashSet::new();
    for monitor in &mut monitors {
        monitor.apply_defaults(defaults);
        monitor
            .validate()
            .map_err(|source| ConfigError::InvalidMonitor {
                id: monitor.id.clone(),
                source,
            })?;
        if !seen.insert(monitor.id.clone()) {
            return Err(ConfigError::DuplicateMonitor(monitor.id.clone()));
        }
    }

    Ok(monitors)
}
