//! Per-monitor worker
//!
//! One long-lived task per monitor: probe, hand the result to the
//! processor, sleep out the rest of the interval, repeat until shutdown.
//! Probes run on their own task so a panicking probe is contained and the
//! loop continues at the next interval.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::http::HttpProbe;
use super::icmp::IcmpProbe;
use super::pull::{self, PullState};
use super::{ProbeError, ProbeResponse};
use crate::core::config::ConfigError;
use crate::data::HistoricalStore;
use crate::domain::{Monitor, MonitorType};
use crate::probes::Processor;

enum ProbeKind {
    Http(HttpProbe),
    Icmp(IcmpProbe),
    Pull,
}

pub struct MonitorWorker {
    monitor: Monitor,
    kind: ProbeKind,
    processor: Arc<Processor>,
    store: Arc<dyn HistoricalStore>,
}

impl std::fmt::Debug for MonitorWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorWorker")
            .field("monitor", &self.monitor)
            .finish_non_exhaustive()
    }
}

impl MonitorWorker {
    /// Build the worker for an already-normalized monitor. A monitor whose
    /// type-specific settings are missing or malformed never gets a worker.
    pub fn new(
        monitor: Monitor,
        processor: Arc<Processor>,
        store: Arc<dyn HistoricalStore>,
        dump_failure_body: bool,
    ) -> Result<Self, ConfigError> {
        monitor
            .validate()
            .map_err(|source| ConfigError::InvalidMonitor {
                id: monitor.id.clone(),
                source,
            })?;

        let kind = match monitor.kind {
            MonitorType::Http => ProbeKind::Http(
                HttpProbe::new(&monitor, dump_failure_body)
                    .map_err(|e| ConfigError::Probe {
                        id: monitor.id.clone(),
                        reason: e.to_string(),
                    })?,
            ),
            MonitorType::Icmp => {
                ProbeKind::Icmp(IcmpProbe::new(&monitor).map_err(|e| ConfigError::Probe {
                    id: monitor.id.clone(),
                    reason: e.to_string(),
                })?)
            }
            MonitorType::Pull => ProbeKind::Pull,
        };

        Ok(Self {
            monitor,
            kind,
            processor,
            store,
        })
    }

    pub fn monitor_id(&self) -> &str {
        &self.monitor.id
    }

    /// Run the worker loop until the shutdown signal flips
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let interval = Duration::from_secs(self.monitor.interval_seconds());
        let worker = Arc::new(self);

        tracing::info!(
            monitor_id = %worker.monitor.id,
            kind = %worker.monitor.kind,
            interval_secs = interval.as_secs(),
            "monitor worker started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let started = tokio::time::Instant::now();

            let probe = tokio::spawn({
                let worker = Arc::clone(&worker);
                async move { worker.check_once().await }
            });

            match probe.await {
                Ok(Ok(Some(response))) => worker.processor.process(response).await,
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    tracing::error!(
                        monitor_id = %worker.monitor.id,
                        error = %e,
                        "probe failed"
                    );
                }
                Err(e) if e.is_panic() => {
                    tracing::error!(
                        monitor_id = %worker.monitor.id,
                        "probe panicked, continuing at next interval"
                    );
                }
                Err(_) => break,
            }

            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep_until(started + interval) => {}
            }
        }

        tracing::debug!(monitor_id = %worker.monitor.id, "monitor worker stopped");
    }

    /// One observation. `None` means there is nothing to process this round
    /// (a pull monitor whose feed is fresh).
    async fn check_once(&self) -> Result<Option<ProbeResponse>, ProbeError> {
        match &self.kind {
            ProbeKind::Http(probe) => Ok(Some(probe.check(&self.monitor).await)),
            ProbeKind::Icmp(probe) => Ok(Some(probe.check(&self.monitor).await?)),
            ProbeKind::Pull => {
                let interval = self.monitor.interval_seconds();
                let now = Utc::now();
                match pull::check_pull(self.store.as_ref(), &self.monitor.id, interval, now)
                    .await?
                {
                    PullState::Fresh => Ok(None),
                    PullState::Stale { last_seen } => {
                        let mut response = ProbeResponse::for_monitor(&self.monitor);
                        response.timestamp = now;
                        response.success = false;
                        response.additional_message =
                            Some(pull::stale_message(last_seen, interval));
                        Ok(Some(response))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerters::AlerterRegistry;
    use crate::data::broker::Broker;
    use crate::data::SqliteService;
    use crate::data::sqlite::repositories::historical;
    use crate::domain::{HttpMonitor, MonitorStatus, ProbeDefaults};
    use std::collections::HashMap;

    fn pull_monitor(id: &str, interval: u64) -> Monitor {
        let mut m = Monitor {
            id: id.to_string(),
            name: "Pushed".to_string(),
            description: String::new(),
            public_url: String::new(),
            kind: MonitorType::Pull,
            interval_seconds: Some(interval),
            timeout_seconds: Some(1),
            http: None,
            icmp: None,
            alert_provider: None,
        };
        m.apply_defaults(&ProbeDefaults::default());
        m
    }

    async fn pipeline() -> (Arc<SqliteService>, Arc<Processor>) {
        let store = Arc::new(SqliteService::init_in_memory().await.unwrap());
        let processor = Arc::new(Processor::new(
            store.clone(),
            Arc::new(Broker::new()),
            Arc::new(AlerterRegistry::new()),
            None,
        ));
        (store, processor)
    }

    #[tokio::test]
    async fn test_invalid_monitor_never_gets_a_worker() {
        let (store, processor) = pipeline().await;
        let mut monitor = pull_monitor("m1", 30);
        monitor.kind = MonitorType::Http;
        monitor.http = Some(HttpMonitor {
            method: None,
            endpoint: None,
            headers: HashMap::new(),
            expected_status: None,
        });

        let err = MonitorWorker::new(monitor, processor, store, false).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMonitor { .. }));
    }

    #[tokio::test]
    async fn test_stale_pull_monitor_synthesizes_failure() {
        let (store, processor) = pipeline().await;
        let worker =
            MonitorWorker::new(pull_monitor("m2", 30), processor, store.clone(), false).unwrap();

        let response = worker.check_once().await.unwrap().unwrap();
        assert!(!response.success);
        assert_eq!(response.status_code, 0);
        assert!(response
            .additional_message
            .as_deref()
            .unwrap()
            .contains("no push received"));
    }

    #[tokio::test]
    async fn test_fresh_pull_monitor_is_left_alone() {
        let (store, processor) = pipeline().await;

        let pushed = historical::test_support::row("m2", MonitorStatus::Success, 250);
        historical::write_raw(store.pool(), &pushed).await.unwrap();

        let worker =
            MonitorWorker::new(pull_monitor("m2", 30), processor, store.clone(), false).unwrap();
        assert!(worker.check_once().await.unwrap().is_none());

        // Nothing extra was persisted for the fresh push
        let rows = historical::read_raw(store.pool(), "m2", 100).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_worker_stops_on_shutdown() {
        let (store, processor) = pipeline().await;
        let worker = MonitorWorker::new(pull_monitor("m2", 1), processor, store, false).unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = worker.spawn(rx);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(3), handle)
            .await
            .expect("worker did not stop within one interval")
            .unwrap();
    }
}
