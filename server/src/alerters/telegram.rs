//! Telegram alert provider

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{ensure_delivered, Alerter, AlertError, AlertMessage};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct TelegramAlerter {
    url: String,
    chat_id: String,
    client: reqwest::Client,
}

impl TelegramAlerter {
    pub fn new(url: String, chat_id: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("default reqwest client");

        Self {
            url,
            chat_id,
            client,
        }
    }

    fn payload(&self, msg: &AlertMessage) -> serde_json::Value {
        let title = if msg.success { "✅ Up" } else { "🔴 Down" };
        let text = format!(
            "{}\n\n\
             **MonitorID:** {}\n\
             **MonitorName:** {}\n\
             **StatusCode:** {}\n\
             **Latency:** {} ms\n\
             **Timestamp:** {}",
            title,
            msg.monitor_id,
            msg.monitor_name,
            msg.status_code,
            msg.latency,
            msg.timestamp.to_rfc3339(),
        );

        json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "Markdown",
        })
    }
}

#[async_trait]
impl Alerter for TelegramAlerter {
    async fn send(&self, msg: &AlertMessage) -> Result<(), AlertError> {
        if self.url.is_empty() {
            return Err(AlertError::MissingConfig {
                provider: "telegram",
                field: "url",
            });
        }
        if self.chat_id.is_empty() {
            return Err(AlertError::MissingConfig {
                provider: "telegram",
                field: "chat_id",
            });
        }

        let response = self
            .client
            .post(&self.url)
            .json(&self.payload(msg))
            .send()
            .await?;

        ensure_delivered("telegram", response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(success: bool) -> AlertMessage {
        AlertMessage {
            success,
            status_code: 500,
            timestamp: Utc::now(),
            monitor_id: "m1".to_string(),
            monitor_name: "Example".to_string(),
            latency: 321,
        }
    }

    #[tokio::test]
    async fn test_missing_url_is_rejected() {
        let alerter = TelegramAlerter::new(String::new(), "chat".to_string());
        let err = alerter.send(&message(true)).await.unwrap_err();
        assert!(matches!(err, AlertError::MissingConfig { field: "url", .. }));
    }

    #[tokio::test]
    async fn test_missing_chat_id_is_rejected() {
        let alerter =
            TelegramAlerter::new("https://api.telegram.org/botX/sendMessage".to_string(), String::new());
        let err = alerter.send(&message(true)).await.unwrap_err();
        assert!(matches!(
            err,
            AlertError::MissingConfig {
                field: "chat_id",
                ..
            }
        ));
    }

    #[test]
    fn test_payload_formats_message() {
        let alerter = TelegramAlerter::new("url".to_string(), "chat-42".to_string());
        let msg = message(false);
        let payload = alerter.payload(&msg);

        assert_eq!(payload["chat_id"], "chat-42");
        assert_eq!(payload["parse_mode"], "Markdown");
        let text = payload["text"].as_str().unwrap();
        assert!(text.starts_with("🔴 Down"));
        assert!(text.contains("m1"));
        assert!(text.contains("Example"));
        assert!(text.contains("500"));
        assert!(text.contains("321"));
        assert!(text.contains(&msg.timestamp.to_rfc3339()));
    }

    #[test]
    fn test_payload_up_title() {
        let alerter = TelegramAlerter::new("url".to_string(), "chat".to_string());
        let payload = alerter.payload(&message(true));
        assert!(payload["text"].as_str().unwrap().starts_with("✅ Up"));
    }
}
