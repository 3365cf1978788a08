//! Probe execution: one worker per monitor feeding the response processor

pub mod http;
pub mod icmp;
pub mod processor;
pub mod pull;
pub mod tls;
pub mod worker;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::data::StoreError;
use crate::domain::{AlertProvider, Monitor};

pub use processor::Processor;
pub use worker::MonitorWorker;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid probe target: {0}")]
    InvalidTarget(String),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("icmp probe failed: {0}")]
    Icmp(String),

    #[error("tls inspection failed: {0}")]
    Tls(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything one probe observed, handed to the processor
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub monitor_id: String,
    pub monitor_name: String,
    /// What was probed: URL, hostname, or the monitor's public face
    pub target: String,
    pub alert_provider: Option<AlertProvider>,
    pub success: bool,
    pub status_code: i32,
    /// Milliseconds
    pub latency: i64,
    pub timestamp: DateTime<Utc>,
    pub http_protocol: Option<String>,
    pub tls_version: Option<String>,
    pub tls_cipher: Option<String>,
    pub tls_expiry: Option<DateTime<Utc>>,
    pub additional_message: Option<String>,
}

impl ProbeResponse {
    /// Skeleton response for a monitor; the probe fills in what it observed
    pub fn for_monitor(monitor: &Monitor) -> Self {
        Self {
            monitor_id: monitor.id.clone(),
            monitor_name: monitor.name.clone(),
            target: monitor.target(),
            alert_provider: monitor.alert_provider,
            success: false,
            status_code: 0,
            latency: 0,
            timestamp: Utc::now(),
            http_protocol: None,
            tls_version: None,
            tls_cipher: None,
            tls_expiry: None,
            additional_message: None,
        }
    }
}
