//! Retention cleanup
//!
//! Once a day, rows older than the retention horizon are deleted from the
//! raw and rollup tables in a single transaction; any failure rolls the
//! whole sweep back and the next cycle retries.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::data::sqlite::repositories::historical::{self, CleanupStats};
use crate::data::{SqliteService, StoreError};

const CLEANUP_EVERY: Duration = Duration::from_secs(24 * 60 * 60);

pub struct CleanupWorker {
    store: Arc<SqliteService>,
    retention_days: u32,
}

impl CleanupWorker {
    pub fn new(store: Arc<SqliteService>, retention_days: u32) -> Self {
        Self {
            store,
            retention_days,
        }
    }

    /// Sweep at startup, then every 24 hours until shutdown
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if *shutdown.borrow() {
                    break;
                }

                let started = tokio::time::Instant::now();
                match self.cleanup(Utc::now()).await {
                    Ok(stats) => {
                        if stats.total() > 0 {
                            tracing::info!(
                                raw = stats.raw,
                                hourly = stats.hourly,
                                daily = stats.daily,
                                retention_days = self.retention_days,
                                "cleaned up old historical data"
                            );
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to run cleanup");
                    }
                }

                tokio::select! {
                    biased;
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep_until(started + CLEANUP_EVERY) => {}
                }
            }

            tracing::debug!("cleanup worker stopped");
        })
    }

    /// Delete everything older than `now - retention_days`
    pub async fn cleanup(&self, now: DateTime<Utc>) -> Result<CleanupStats, StoreError> {
        let cutoff = now - chrono::Duration::days(self.retention_days as i64);
        historical::delete_older_than(self.store.pool(), cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::repositories::historical::test_support::row;
    use crate::domain::MonitorStatus;
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn test_cleanup_honours_retention_horizon() {
        let store = Arc::new(SqliteService::init_in_memory().await.unwrap());
        let now = Utc::now();

        // One row five days old, one a day old, in every table
        for age_days in [5i64, 1] {
            let mut r = row("m1", MonitorStatus::Success, 10);
            r.timestamp = now - ChronoDuration::days(age_days);
            historical::write_raw(store.pool(), &r).await.unwrap();
            historical::replace_hourly(store.pool(), &r).await.unwrap();
            historical::replace_daily(store.pool(), &r).await.unwrap();
        }

        let worker = CleanupWorker::new(store.clone(), 3);
        let stats = worker.cleanup(now).await.unwrap();
        assert_eq!(stats.total(), 3);

        let cutoff = now - ChronoDuration::days(3);
        for rows in [
            historical::read_raw(store.pool(), "m1", 100).await.unwrap(),
            historical::read_hourly(store.pool(), "m1", 100).await.unwrap(),
            historical::read_daily(store.pool(), "m1", 100).await.unwrap(),
        ] {
            assert!(rows.iter().all(|r| r.timestamp >= cutoff));
            assert_eq!(rows.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_cleanup_with_nothing_to_delete() {
        let store = Arc::new(SqliteService::init_in_memory().await.unwrap());
        let worker = CleanupWorker::new(store, 3);
        let stats = worker.cleanup(Utc::now()).await.unwrap();
        assert_eq!(stats, CleanupStats::default());
    }

    #[tokio::test]
    async fn test_worker_stops_on_shutdown() {
        let store = Arc::new(SqliteService::init_in_memory().await.unwrap());
        let worker = CleanupWorker::new(store, 3);

        let (tx, rx) = watch::channel(false);
        let handle = worker.spawn(rx);
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("cleanup worker did not stop")
            .unwrap();
    }
}
