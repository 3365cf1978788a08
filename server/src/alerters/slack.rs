//! Slack webhook alert provider (Block Kit)

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{ensure_delivered, Alerter, AlertError, AlertMessage};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

pub struct SlackAlerter {
    webhook_url: String,
    client: reqwest::Client,
}

impl SlackAlerter {
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
        let title = if msg.success {
            "✅ Service Up"
        } else {
            "🔴 Service Down"
        };

        json!({
            "text": format!("{}: {} ({})", title, msg.monitor_name, msg.monitor_id),
            "blocks": [
                {
                    "type": "header",
                    "text": { "type": "plain_text", "text": title },
                },
                {
                    "type": "section",
                    "fields": [
                        { "type": "mrkdwn", "text": format!("*Monitor ID*\n{}", msg.monitor_id) },
                        { "type": "mrkdwn", "text": format!("*Monitor Name*\n{}", msg.monitor_name) },
                        { "type": "mrkdwn", "text": format!("*Status Code*\n{}", msg.status_code) },
                        { "type": "mrkdwn", "text": format!("*Latency*\n{} ms", msg.latency) },
                    ],
                },
                {
                    "type": "context",
                    "elements": [
                        { "type": "mrkdwn", "text": format!("Timestamp: {}", msg.timestamp.to_rfc3339()) },
                    ],
                },
            ],
        })
    }
}

#[async_trait]
impl Alerter for SlackAlerter {
    async fn send(&self, msg: &AlertMessage) -> Result<(), AlertError> {
        if self.webhook_url.is_empty() {
            return Err(AlertError::MissingConfig {
                provider: "slack",
                field: "webhook_url",
            });
        }

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&self.payload(msg))
            .send()
            .await?;

        ensure_delivered("slack", response.status())
    }
}
