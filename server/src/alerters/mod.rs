//! Alert channels
//!
//! Transition alerts go through one of four providers; each formats the
//! message its own way but carries the monitor id, name, status, latency and
//! an RFC-3339 timestamp, bounds its HTTP call, and treats any 2xx reply as
//! delivered.

pub mod discord;
pub mod forwarder;
pub mod slack;
pub mod telegram;
pub mod webhook;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::config::AlertingConfig;
use crate::domain::AlertProvider;

pub use discord::DiscordAlerter;
pub use forwarder::{ForwardedResult, ResultForwarder};
pub use slack::SlackAlerter;
pub use telegram::TelegramAlerter;
pub use webhook::WebhookAlerter;

#[derive(Debug, Clone, PartialEq)]
pub struct AlertMessage {
    pub success: bool,
    pub status_code: i32,
    pub timestamp: DateTime<Utc>,
    pub monitor_id: String,
    pub monitor_name: String,
    pub latency: i64,
}

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("can't send {provider} alert: {field} is not set")]
    MissingConfig {
        provider: &'static str,
        field: &'static str,
    },

    #[error("alert request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{provider} returned status {status}")]
    BadStatus { provider: &'static str, status: u16 },
}

#[async_trait]
pub trait Alerter: Send + Sync {
    async fn send(&self, msg: &AlertMessage) -> Result<(), AlertError>;
}

/// Delivered iff the provider answered 2xx
fn ensure_delivered(
    provider: &'static str,
    status: reqwest::StatusCode,
) -> Result<(), AlertError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(AlertError::BadStatus {
            provider,
            status: status.as_u16(),
        })
    }
}

/// Configured alert providers, looked up by each monitor's channel choice
#[derive(Default)]
pub struct AlerterRegistry {
    providers: HashMap<AlertProvider, Arc<dyn Alerter>>,
}

impl AlerterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AlertingConfig) -> Self {
        let mut registry = Self::new();

        if let Some(telegram) = &config.telegram {
            registry.register(
                AlertProvider::Telegram,
                Arc::new(TelegramAlerter::new(
                    telegram.url.clone(),
                    telegram.chat_id.clone(),
                )),
            );
        }
        if let Some(discord) = &config.discord {
            registry.register(
                AlertProvider::Discord,
                Arc::new(DiscordAlerter::new(discord.webhook_url.clone())),
            );
        }
        if let Some(slack) = &config.slack {
            registry.register(
                AlertProvider::Slack,
                Arc::new(SlackAlerter::new(slack.webhook_url.clone())),
            );
        }
        if let Some(webhook) = &config.webhook {
            registry.register(
                AlertProvider::Webhook,
                Arc::new(WebhookAlerter::new(webhook.url.clone())),
            );
        }

        registry
    }

    pub fn register(&mut self, provider: AlertProvider, alerter: Arc<dyn Alerter>) {
        self.providers.insert(provider, alerter);
    }

    /// Monitors without an explicit channel go through telegram
    pub fn resolve(&self, provider: Option<AlertProvider>) -> Option<Arc<dyn Alerter>> {
        self.providers
            .get(&provider.unwrap_or(AlertProvider::Telegram))
            .cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullAlerter;

    #[async_trait]
    impl Alerter for NullAlerter {
        async fn send(&self, _msg: &AlertMessage) -> Result<(), AlertError> {
            Ok(())
        }
    }

    #[test]
    fn test_resolve_defaults_to_telegram() {
        let mut registry = AlerterRegistry::new();
        registry.register(AlertProvider::Telegram, Arc::new(NullAlerter));

        assert!(registry.resolve(None).is_some());
        assert!(registry.resolve(Some(AlertProvider::Telegram)).is_some());
        assert!(registry.resolve(Some(AlertProvider::Discord)).is_none());
    }

    #[test]
    fn test_empty_registry() {
        let registry = AlerterRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.resolve(None).is_none());
    }

    #[test]
    fn test_ensure_delivered() {
        assert!(ensure_delivered("test", reqwest::StatusCode::OK).is_ok());
        assert!(ensure_delivered("test", reqwest::StatusCode::NO_CONTENT).is_ok());
        let err = ensure_delivered("test", reqwest::StatusCode::BAD_GATEWAY).unwrap_err();
        assert!(matches!(err, AlertError::BadStatus { status: 502, .. }));
    }
}
