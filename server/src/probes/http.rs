//! HTTP probe
//!
//! One request per interval. Certificate errors are accepted at the client
//! level so an endpoint behind a broken certificate still yields a status
//! code; the dedicated TLS inspection reports what was wrong with it.

use std::time::Duration;

use tokio::time::Instant;

use super::tls::{self, TlsInfo};
use super::{ProbeError, ProbeResponse};
use crate::domain::{Monitor, StatusPattern};

const USER_AGENT: &str = concat!("semyi/", env!("CARGO_PKG_VERSION"));

/// Longest failure-body prefix ever dumped to the log
const DUMP_BODY_LIMIT: usize = 2048;

pub struct HttpProbe {
    client: reqwest::Client,
    method: reqwest::Method,
    endpoint: reqwest::Url,
    headers: Vec<(String, String)>,
    pattern: StatusPattern,
    timeout: Duration,
    dump_failure_body: bool,
}

impl HttpProbe {
    pub fn new(monitor: &Monitor, dump_failure_body: bool) -> Result<Self, ProbeError> {
        let http = monitor
            .http
            .as_ref()
            .ok_or_else(|| ProbeError::InvalidTarget("missing http settings".to_string()))?;

        let endpoint = http
            .endpoint
            .as_deref()
            .ok_or_else(|| ProbeError::InvalidTarget("missing http endpoint".to_string()))?;
        let endpoint = reqwest::Url::parse(endpoint)
            .map_err(|e| ProbeError::InvalidTarget(format!("invalid endpoint: {}", e)))?;

        let method = http
            .method
            .as_deref()
            .unwrap_or("GET")
            .parse::<reqwest::Method>()
            .map_err(|e| ProbeError::InvalidTarget(format!("invalid method: {}", e)))?;

        let timeout = Duration::from_secs(monitor.timeout_seconds());

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self {
            client,
            method,
            endpoint,
            headers: http.headers.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            pattern: monitor.expected_status(),
            timeout,
            dump_failure_body,
        })
    }

    /// One observation. Transport failures (refused, timed out, DNS) are a
    /// failed observation with status code 0, not an error.
    pub async fn check(&self, monitor: &Monitor) -> ProbeResponse {
        let mut response = ProbeResponse::for_monitor(monitor);

        let mut request = self
            .client
            .request(self.method.clone(), self.endpoint.clone());
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        let started = Instant::now();
        let outcome = request.send().await;
        response.latency = started.elapsed().as_millis() as i64;

        match outcome {
            Ok(reply) => {
                let status = reply.status().as_u16();
                response.status_code = status as i32;
                response.success = self.pattern.matches(status);
                response.http_protocol = Some(version_label(reply.version()));

                if !response.success && self.dump_failure_body {
                    match reply.text().await {
                        Ok(body) => {
                            let prefix: String = body.chars().take(DUMP_BODY_LIMIT).collect();
                            tracing::debug!(
                                monitor_id = %response.monitor_id,
                                status,
                                body = %prefix,
                                "failure response body"
                            );
                        }
                        Err(e) => {
                            tracing::debug!(
                                monitor_id = %response.monitor_id,
                                error = %e,
                                "failed to read failure response body"
                            );
                        }
                    }
                }
            }
            Err(e) => {
                response.success = false;
                response.status_code = 0;
                response.additional_message = Some(if e.is_timeout() {
                    format!("request timed out after {:?}", self.timeout)
                } else {
                    format!("request failed: {}", e)
                });
            }
        }

        if self.endpoint.scheme() == "https" {
            self.attach_tls_diagnostics(&mut response).await;
        }

        response
    }

    async fn attach_tls_diagnostics(&self, response: &mut ProbeResponse) {
        let Some(host) = self.endpoint.host_str() else {
            return;
        };
        let port = self.endpoint.port_or_known_default().unwrap_or(443);

        match tls::inspect(host, port, self.timeout).await {
            Ok(TlsInfo {
                version,
                cipher,
                expiry,
                issuer: _,
                message,
            }) => {
                response.tls_version = version;
                response.tls_cipher = cipher;
                response.tls_expiry = expiry;
                // The certificate advisory outranks a transport message
                if message.is_some() {
                    response.additional_message = message;
                }
            }
            Err(e) => {
                tracing::debug!(
                    monitor_id = %response.monitor_id,
                    error = %e,
                    "tls inspection failed"
                );
            }
        }
    }
}

fn version_label(version: reqwest::Version) -> String {
    match version {
        reqwest::Version::HTTP_09 => "HTTP/0.9".to_string(),
        reqwest::Version::HTTP_10 => "HTTP/1.0".to_string(),
        reqwest::Version::HTTP_11 => "HTTP/1.1".to_string(),
        reqwest::Version::HTTP_2 => "HTTP/2.0".to_string(),
        reqwest::Version::HTTP_3 => "HTTP/3.0".to_string(),
        other => format!("{:?}", other),
    }
}
