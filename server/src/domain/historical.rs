//! One observation of a monitor at one instant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::MonitorStatus;
use super::validation::ValidationError;

/// A single probe result. The same shape backs raw rows, hourly and daily
/// aggregates, broker messages and SSE frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorHistorical {
    pub monitor_id: String,
    pub status: MonitorStatus,
    /// Milliseconds
    pub latency: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_cipher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_expiry: Option<DateTime<Utc>>,
}

impl MonitorHistorical {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut err = ValidationError::new();

        if self.monitor_id.is_empty() {
            err.add_issue("monitor_id", "monitor id is required");
        }

        if self.monitor_id.len() > 255 {
            err.add_issue("monitor_id", "monitor id must be at most 255 characters");
        }

        if self.latency < 0 {
            err.add_issue("latency", "latency must be greater than 0");
        }

        err.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> MonitorHistorical {
        MonitorHistorical {
            monitor_id: "m1".to_string(),
            status: MonitorStatus::Success,
            latency: 42,
            timestamp: Utc::now(),
            additional_message: None,
            http_protocol: None,
            tls_version: None,
            tls_cipher: None,
            tls_expiry: None,
        }
    }

    #[test]
    fn test_valid_row() {
        assert!(row().validate().is_ok());
    }

    #[test]
    fn test_empty_monitor_id_rejected() {
        let mut r = row();
        r.monitor_id = String::new();
        let err = r.validate().unwrap_err();
        assert_eq!(err.issues[0].field, "monitor_id");
    }

    #[test]
    fn test_negative_latency_rejected() {
        let mut r = row();
        r.latency = -1;
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_overlong_monitor_id_rejected() {
        let mut r = row();
        r.monitor_id = "x".repeat(256);
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_json_omits_empty_diagnostics() {
        let json = serde_json::to_value(row()).unwrap();
        assert!(json.get("tls_version").is_none());
        assert_eq!(json["status"], 0);
    }
}
