//! Generic HTTP webhook alert provider

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{ensure_delivered, Alerter, AlertError, AlertMessage};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

pub struct WebhookAlerter {
    webhook_url: String,
    client: reqwest::Client,
}

impl WebhookAlerter {
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
        json!({
            "success": msg.success,
            "monitor_id": msg.monitor_id,
            "monitor_name": msg.monitor_name,
            "status_code": msg.status_code,
            "latency": msg.latency,
            "timestamp": msg.timestamp.to_rfc3339(),
        })
    }
}

#[async_trait]
impl Alerter for WebhookAlerter {
    async fn send(&self, msg: &AlertMessage) -> Result<(), AlertError> {
        if self.webhook_url.is_empty() {
            return Err(AlertError::MissingConfig {
                provider: "webhook",
                field: "url",
            });
        }

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&self.payload(msg))
            .send()
            .await?;

        ensure_delivered("webhook", response.status())
    }
}
