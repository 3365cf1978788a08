//! Per-result webhook forwarding
//!
//! Unlike the alert providers, which only fire on status transitions, the
//! forwarder pushes every probe result matching its success/failure filters
//! to a configured endpoint, fire-and-forget.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::AlertError;
use crate::probes::ProbeResponse;

const USER_AGENT: &str = "Semyi Webhook";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ForwardedResult {
    pub endpoint: String,
    pub status: &'static str,
    #[serde(rename = "statusCode")]
    pub status_code: i32,
    #[serde(rename = "requestDuration")]
    pub request_duration: i64,
    /// Unix seconds
    pub timestamp: i64,
    #[serde(skip)]
    success: bool,
}

impl ForwardedResult {
    pub fn from_response(response: &ProbeResponse) -> Self {
        Self::new(
            response.target.clone(),
            response.success,
            response.status_code,
            response.latency,
            response.timestamp,
        )
    }

    pub fn new(
        endpoint: String,
        success: bool,
        status_code: i32,
        request_duration: i64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            endpoint,
            status: if success { "success" } else { "failed" },
            status_code,
            request_duration,
            timestamp: timestamp.timestamp(),
            success,
        }
    }
}

pub struct ResultForwarder {
    url: String,
    success_response: bool,
    failed_response: bool,
    client: reqwest::Client,
}

impl ResultForwarder {
    pub fn new(url: String, success_response: bool, failed_response: bool) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("default reqwest client");

        Self {
            url,
            success_response,
            failed_response,
            client,
        }
    }

    fn should_send(&self, success: bool) -> bool {
        if self.url.is_empty() {
            return false;
        }
        if success {
            self.success_response
        } else {
            self.failed_response
        }
    }

    /// POST the result if it passes the filters. The response status is not
    /// interpreted; delivery is best effort.
    pub async fn forward(&self, result: &ForwardedResult) -> Result<(), AlertError> {
        if !self.should_send(result.success) {
            return Ok(());
        }

        self.client.post(&self.url).json(result).send().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(success: bool) -> ForwardedResult {
        ForwardedResult::new(
            "https://example.com/health".to_string(),
            success,
            if success { 200 } else { 0 },
            150,
            Utc::now(),
        )
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(result(true).status, "success");
        assert_eq!(result(false).status, "failed");
    }

    #[test]
    fn test_filters() {
        let only_failures = ResultForwarder::new("https://hooks.test".to_string(), false, true);
        assert!(!only_failures.should_send(true));
        assert!(only_failures.should_send(false));

        let no_url = ResultForwarder::new(String::new(), true, true);
        assert!(!no_url.should_send(true));
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(result(true)).unwrap();
        assert!(json.get("statusCode").is_some());
        assert!(json.get("requestDuration").is_some());
        assert!(json.get("success").is_none());
        assert!(json["timestamp"].is_i64());
    }

    #[tokio::test]
    async fn test_filtered_forward_is_a_noop() {
        let forwarder = ResultForwarder::new("https://hooks.test".to_string(), false, false);
        // Never sends, so no network is touched
        forwarder.forward(&result(true)).await.unwrap();
        forwarder.forward(&result(false)).await.unwrap();
    }
}
