//! Time-bucketed rollups
//!
//! Two independent loops recompute the current wall-clock hour (every ten
//! minutes) and the current day (every hour) for all monitors. Re-running
//! inside the same bucket is idempotent: the rollup write replaces the
//! bucket's row wholesale, so the latest computation wins.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::data::sqlite::repositories::historical;
use crate::data::{SqliteService, StoreError};
use crate::domain::{MonitorHistorical, MonitorStatus};
use crate::utils::time::BucketZone;

const HOURLY_PASS_EVERY: Duration = Duration::from_secs(10 * 60);
const DAILY_PASS_EVERY: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Copy)]
enum Granularity {
    Hourly,
    Daily,
}

impl Granularity {
    fn label(&self) -> &'static str {
        match self {
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
        }
    }
}

pub struct AggregateWorker {
    monitor_ids: Vec<String>,
    store: Arc<SqliteService>,
    zone: BucketZone,
}

impl AggregateWorker {
    pub fn new(monitor_ids: Vec<String>, store: Arc<SqliteService>, zone: BucketZone) -> Self {
        Self {
            monitor_ids,
            store,
            zone,
        }
    }

    pub fn spawn_hourly(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let worker = Arc::clone(self);
        tokio::spawn(worker.run(Granularity::Hourly, HOURLY_PASS_EVERY, shutdown))
    }

    pub fn spawn_daily(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let worker = Arc::clone(self);
        tokio::spawn(worker.run(Granularity::Daily, DAILY_PASS_EVERY, shutdown))
    }

    async fn run(
        self: Arc<Self>,
        granularity: Granularity,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            let started = tokio::time::Instant::now();
            self.run_pass(granularity, Utc::now()).await;

            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep_until(started + period) => {}
            }
        }

        tracing::debug!(granularity = granularity.label(), "aggregate worker stopped");
    }

    async fn run_pass(&self, granularity: Granularity, now: DateTime<Utc>) {
        for monitor_id in &self.monitor_ids {
            let result = match granularity {
                Granularity::Hourly => self.aggregate_hourly(monitor_id, now).await,
                Granularity::Daily => self.aggregate_daily(monitor_id, now).await,
            };
            if let Err(e) = result {
                tracing::error!(
                    monitor_id = %monitor_id,
                    granularity = granularity.label(),
                    error = %e,
                    "failed to aggregate historical data"
                );
            }
        }
    }

    /// Roll up the wall-clock hour containing `now` for one monitor
    pub async fn aggregate_hourly(
        &self,
        monitor_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let from = self.zone.floor_hour(now);
        let to = from + chrono::Duration::hours(1);
        let rows = historical::read_raw_range(self.store.pool(), monitor_id, from, to).await?;

        if let Some(rollup) = summarize(&rows, monitor_id, from) {
            historical::replace_hourly(self.store.pool(), &rollup).await?;
        }
        Ok(())
    }

    /// Roll up the wall-clock day containing `now` for one monitor
    pub async fn aggregate_daily(
        &self,
        monitor_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let from = self.zone.floor_day(now);
        let to = from + chrono::Duration::days(1);
        let rows = historical::read_raw_range(self.store.pool(), monitor_id, from, to).await?;

        if let Some(rollup) = summarize(&rows, monitor_id, from) {
            historical::replace_daily(self.store.pool(), &rollup).await?;
        }
        Ok(())
    }
}

/// Collapse a bucket's raw rows (newest first) into one rollup row.
/// Empty buckets produce nothing.
fn summarize(
    rows: &[MonitorHistorical],
    monitor_id: &str,
    bucket_start: DateTime<Utc>,
) -> Option<MonitorHistorical> {
    if rows.is_empty() {
        return None;
    }

    let count = rows.len() as i64;
    let latency = rows.iter().map(|r| r.latency).sum::<i64>() / count;
    let status_sum: i64 = rows.iter().map(|r| u8::from(r.status) as i64).sum();
    let status = MonitorStatus::from_mean(status_sum as f64 / count as f64);

    let newest_non_empty = |field: fn(&MonitorHistorical) -> Option<&String>| {
        rows.iter()
            .find_map(|r| field(r).filter(|v| !v.is_empty()).cloned())
    };

    // A rollup that averaged out to success doesn't carry stale failure text
    let additional_message = if status.is_success() {
        None
    } else {
        newest_non_empty(|r| r.additional_message.as_ref())
    };

    Some(MonitorHistorical {
        monitor_id: monitor_id.to_string(),
        status,
        latency,
        timestamp: bucket_start,
        additional_message,
        http_protocol: newest_non_empty(|r| r.http_protocol.as_ref()),
        tls_version: newest_non_empty(|r| r.tls_version.as_ref()),
        tls_cipher: newest_non_empty(|r| r.tls_cipher.as_ref()),
        tls_expiry: rows.iter().find_map(|r| r.tls_expiry),
    })
}
