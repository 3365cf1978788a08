//! Monitor configuration
//!
//! Monitors are read from the configuration file at startup and immutable at
//! runtime. Only the public identity fields are ever serialised back out of
//! the API; probe settings stay private.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::pattern::StatusPattern;
use super::validation::ValidationError;

pub const MAX_MONITOR_ID_LEN: usize = 255;

pub const DEFAULT_HTTP_METHOD: &str = "GET";
pub const DEFAULT_EXPECTED_STATUS: &str = "2xx";
pub const DEFAULT_ICMP_PACKET_SIZE: u16 = 56;

/// Fallback interval/timeout applied to monitors that do not set their own,
/// overridable through DEFAULT_INTERVAL / DEFAULT_TIMEOUT.
#[derive(Debug, Clone, Copy)]
pub struct ProbeDefaults {
    pub interval_seconds: u64,
    pub timeout_seconds: u64,
}

impl Default for ProbeDefaults {
    fn default() -> Self {
        Self {
            interval_seconds: 30,
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorType {
    Http,
    Icmp,
    Pull,
}

impl std::fmt::Display for MonitorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorType::Http => write!(f, "http"),
            MonitorType::Icmp => write!(f, "icmp"),
            MonitorType::Pull => write!(f, "pull"),
        }
    }
}

/// Alert channel a monitor routes its transition alerts through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertProvider {
    Telegram,
    Discord,
    Slack,
    Webhook,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpMonitor {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub expected_status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IcmpMonitor {
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub packet_size: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Monitor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub public_url: String,
    #[serde(rename = "type")]
    pub kind: MonitorType,
    #[serde(default, alias = "interval")]
    pub interval_seconds: Option<u64>,
    #[serde(default, alias = "timeout")]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub http: Option<HttpMonitor>,
    #[serde(default)]
    pub icmp: Option<IcmpMonitor>,
    #[serde(default)]
    pub alert_provider: Option<AlertProvider>,
}

/// The only view of a monitor exposed through API responses
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PublicMonitor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub public_url: String,
}

impl Monitor {
    /// Fill unset fields in place. Runs once at config load, before
    /// validation.
    pub fn apply_defaults(&mut self, defaults: &ProbeDefaults) {
        if self.interval_seconds.is_none() || self.interval_seconds == Some(0) {
            self.interval_seconds = Some(defaults.interval_seconds);
        }
        if self.timeout_seconds.is_none() || self.timeout_seconds == Some(0) {
            self.timeout_seconds = Some(defaults.timeout_seconds);
        }

        if self.kind == MonitorType::Http {
            let http = self.http.get_or_insert_with(HttpMonitor::default);
            if http.method.as_deref().is_none_or(str::is_empty) {
                http.method = Some(DEFAULT_HTTP_METHOD.to_string());
            }
            if http.expected_status.as_deref().is_none_or(str::is_empty) {
                http.expected_status = Some(DEFAULT_EXPECTED_STATUS.to_string());
            }
        }

        if self.kind == MonitorType::Icmp {
            let icmp = self.icmp.get_or_insert_with(IcmpMonitor::default);
            if icmp.packet_size.is_none() || icmp.packet_size == Some(0) {
                icmp.packet_size = Some(DEFAULT_ICMP_PACKET_SIZE);
            }
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut err = ValidationError::new();

        if self.id.is_empty() {
            err.add_issue("id", "id is required");
        }
        if self.id.len() > MAX_MONITOR_ID_LEN {
            err.add_issue("id", "id must be at most 255 characters");
        }
        if self.name.is_empty() {
            err.add_issue("name", "name is required");
        }
        if self.interval_seconds.unwrap_or(0) == 0 {
            err.add_issue("interval_seconds", "interval must be greater than 0");
        }
        if self.timeout_seconds.unwrap_or(0) == 0 {
            err.add_issue("timeout_seconds", "timeout must be greater than 0");
        }

        match self.kind {
            MonitorType::Http => match &self.http {
                None => err.add_issue("http", "http settings are required"),
                Some(http) => {
                    match http.endpoint.as_deref() {
                        None | Some("") => err.add_issue("http.endpoint", "endpoint is required"),
                        Some(endpoint) => match reqwest::Url::parse(endpoint) {
                            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
                            Ok(url) => err.add_issue(
                                "http.endpoint",
                                format!("unsupported scheme: {}", url.scheme()),
                            ),
                            Err(e) => {
                                err.add_issue("http.endpoint", format!("invalid url: {}", e))
                            }
                        },
                    }
                    if let Some(method) = http.method.as_deref() {
                        if reqwest::Method::from_bytes(method.as_bytes()).is_err() {
                            err.add_issue("http.method", format!("invalid method: {}", method));
                        }
                    }
                    if let Some(pattern) = http.expected_status.as_deref() {
                        if let Err(e) = pattern.parse::<StatusPattern>() {
                            err.add_issue("http.expected_status", e.to_string());
                        }
                    }
                }
            },
            MonitorType::Icmp => match &self.icmp {
                None => err.add_issue("icmp", "icmp settings are required"),
                Some(icmp) => {
                    if icmp.hostname.as_deref().is_none_or(str::is_empty) {
                        err.add_issue("icmp.hostname", "hostname is required");
                    }
                    if icmp.packet_size.unwrap_or(0) == 0 {
                        err.add_issue("icmp.packet_size", "packet size must be greater than 0");
                    }
                }
            },
            MonitorType::Pull => {}
        }

        err.into_result()
    }

    pub fn interval_seconds(&self) -> u64 {
        self.interval_seconds.unwrap_or(30)
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(10)
    }

    /// Parsed expected-status pattern; call after validation
    pub fn expected_status(&self) -> StatusPattern {
        self.http
            .as_ref()
            .and_then(|h| h.expected_status.as_deref())
            .unwrap_or(DEFAULT_EXPECTED_STATUS)
            .parse()
            .unwrap_or_else(|_| DEFAULT_EXPECTED_STATUS.parse().unwrap())
    }

    pub fn public(&self) -> PublicMonitor {
        PublicMonitor {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            public_url: self.public_url.clone(),
        }
    }

    /// Best human-facing identifier of what the probe targets
    pub fn target(&self) -> String {
        match self.kind {
            MonitorType::Http => self
                .http
                .as_ref()
                .and_then(|h| h.endpoint.clone())
                .unwrap_or_else(|| self.id.clone()),
            MonitorType::Icmp => self
                .icmp
                .as_ref()
                .and_then(|i| i.hostname.clone())
                .unwrap_or_else(|| self.id.clone()),
            MonitorType::Pull => {
                if self.public_url.is_empty() {
                    self.id.clone()
                } else {
                    self.public_url.clone()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_monitor() -> Monitor {
        Monitor {
            id: "m1".to_string(),
            name: "Example".to_string(),
            description: String::new(),
            public_url: "https://example.com".to_string(),
            kind: MonitorType::Http,
            interval_seconds: None,
            timeout_seconds: None,
            http: Some(HttpMonitor {
                method: None,
                endpoint: Some("https://example.com/health".to_string()),
                headers: HashMap::new(),
                expected_status: None,
            }),
            icmp: None,
            alert_provider: None,
        }
    }

    #[test]
    fn test_defaults_applied() {
        let mut m = http_monitor();
        m.apply_defaults(&ProbeDefaults::default());
        assert_eq!(m.interval_seconds(), 30);
        assert_eq!(m.timeout_seconds(), 10);
        let http = m.http.as_ref().unwrap();
        assert_eq!(http.method.as_deref(), Some("GET"));
        assert_eq!(http.expected_status.as_deref(), Some("2xx"));
        assert!(m.validate().is_ok());
    }

    #[test]
    fn test_http_monitor_requires_endpoint() {
        let mut m = http_monitor();
        m.http.as_mut().unwrap().endpoint = None;
        m.apply_defaults(&ProbeDefaults::default());
        let err = m.validate().unwrap_err();
        assert!(err.issues.iter().any(|i| i.field == "http.endpoint"));
    }

    #[test]
    fn test_http_monitor_rejects_bad_pattern() {
        let mut m = http_monitor();
        m.http.as_mut().unwrap().expected_status = Some("2y".to_string());
        m.apply_defaults(&ProbeDefaults::default());
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_icmp_monitor_requires_hostname() {
        let mut m = http_monitor();
        m.kind = MonitorType::Icmp;
        m.http = None;
        m.apply_defaults(&ProbeDefaults::default());
        let err = m.validate().unwrap_err();
        assert!(err.issues.iter().any(|i| i.field == "icmp.hostname"));
    }

    #[test]
    fn test_icmp_packet_size_default() {
        let mut m = http_monitor();
        m.kind = MonitorType::Icmp;
        m.http = None;
        m.icmp = Some(IcmpMonitor {
            hostname: Some("example.com".to_string()),
            packet_size: None,
        });
        m.apply_defaults(&ProbeDefaults::default());
        assert_eq!(m.icmp.as_ref().unwrap().packet_size, Some(56));
        assert!(m.validate().is_ok());
    }

    #[test]
    fn test_overlong_id_rejected() {
        let mut m = http_monitor();
        m.id = "a".repeat(256);
        m.apply_defaults(&ProbeDefaults::default());
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_public_view_hides_probe_settings() {
        let m = http_monitor();
        let json = serde_json::to_value(m.public()).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["id", "name", "description", "public_url"]);
    }

    #[test]
    fn test_deserialize_with_aliases() {
        let m: Monitor = serde_json::from_str(
            r#"{
                "id": "m2",
                "name": "Pinged",
                "type": "icmp",
                "interval": 5,
                "timeout": 2,
                "icmp": {"hostname": "example.com"}
            }"#,
        )
        .unwrap();
        assert_eq!(m.kind, MonitorType::Icmp);
        assert_eq!(m.interval_seconds, Some(5));
        assert_eq!(m.timeout_seconds, Some(2));
    }
}
