//! ICMP echo probe

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use surge_ping::{Client, Config, PingIdentifier, PingSequence, SurgeError, ICMP};
use tokio::time::Instant;

use super::{ProbeError, ProbeResponse};
use crate::domain::Monitor;

pub struct IcmpProbe {
    hostname: String,
    packet_size: u16,
    timeout: Duration,
}

impl IcmpProbe {
    pub fn new(monitor: &Monitor) -> Result<Self, ProbeError> {
        let icmp = monitor
            .icmp
            .as_ref()
            .ok_or_else(|| ProbeError::InvalidTarget("missing icmp settings".to_string()))?;

        let hostname = icmp
            .hostname
            .clone()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ProbeError::InvalidTarget("missing icmp hostname".to_string()))?;

        Ok(Self {
            hostname,
            packet_size: icmp.packet_size.unwrap_or(56),
            timeout: Duration::from_secs(monitor.timeout_seconds()),
        })
    }

    /// Send one echo. No reply inside the deadline is a failed observation;
    /// socket-level errors (raw sockets need privileges) surface as errors.
    pub async fn check(&self, monitor: &Monitor) -> Result<ProbeResponse, ProbeError> {
        let addr = self.resolve().await?;

        let config = match addr {
            IpAddr::V4(_) => Config::default(),
            IpAddr::V6(_) => Config::builder().kind(ICMP::V6).build(),
        };
        let client = Client::new(&config).map_err(|e| ProbeError::Icmp(e.to_string()))?;

        let payload = vec![0u8; self.packet_size as usize];
        let mut pinger = client.pinger(addr, PingIdentifier(rand::random())).await;
        pinger.timeout(self.timeout);

        let mut response = ProbeResponse::for_monitor(monitor);
        let started = Instant::now();

        match pinger.ping(PingSequence(0), &payload).await {
            Ok((_, rtt)) => {
                response.success = true;
                response.latency = rtt.as_millis() as i64;
            }
            Err(SurgeError::Timeout { .. }) => {
                response.success = false;
                response.latency = started.elapsed().as_millis() as i64;
                response.additional_message =
                    Some(format!("no echo reply within {:?}", self.timeout));
            }
            Err(e) => return Err(ProbeError::Icmp(e.to_string())),
        }

        Ok(response)
    }

    async fn resolve(&self) -> Result<IpAddr, ProbeError> {
        // Already an address? Skip the resolver.
        if let Ok(ip) = self.hostname.parse::<IpAddr>() {
            return Ok(ip);
        }

        let mut addrs = tokio::net::lookup_host((self.hostname.as_str(), 0))
            .await
            .map_err(|e| ProbeError::Icmp(format!("resolve {}: {}", self.hostname, e)))?;

        addrs
            .next()
            .map(|addr: SocketAddr| addr.ip())
            .ok_or_else(|| ProbeError::Icmp(format!("no address for {}", self.hostname)))
    }
}
