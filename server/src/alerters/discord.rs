//! Discord webhook alert provider

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{ensure_delivered, Alerter, AlertError, AlertMessage};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const COLOR_UP: u32 = 0x00FF00;
const COLOR_DOWN: u32 = 0xFF0000;

pub struct DiscordAlerter {
    webhook_url: String,
    client: reqwest::Client,
}

impl DiscordAlerter {
    pub fn new(webhook_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("default reqwest client");

        Self {
            webhook_url,
            client,
        }
    }

    fn payload(&self, msg: &AlertMessage) -> serde_json::Value {
        let (title, color) = if msg.success {
            ("✅ Service Up", COLOR_UP)
        } else {
            ("🔴 Service Down", COLOR_DOWN)
        };

        json!({
            "embeds": [{
                "title": title,
                "color": color,
                "fields": [
                    { "name": "Monitor ID", "value": msg.monitor_id, "inline": true },
                    { "name": "Monitor Name", "value": msg.monitor_name, "inline": true },
                    { "name": "Status Code", "value": msg.status_code.to_string(), "inline": true },
                    { "name": "Latency", "value": format!("{} ms", msg.latency), "inline": true },
                    { "name": "Timestamp", "value": msg.timestamp.to_rfc3339(), "inline": true },
                ],
            }],
        })
    }
}

#[async_trait]
impl Alerter for DiscordAlerter {
    async fn send(&self, msg: &AlertMessage) -> Result<(), AlertError> {
        if self.webhook_url.is_empty() {
            return Err(AlertError::MissingConfig {
                provider: "discord",
                field: "webhook_url",
            });
        }

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&self.payload(msg))
            .send()
            .await?;

        ensure_delivered("discord", response.status())
    }
}
