//! Pull-monitor staleness check
//!
//! Pull monitors are fed externally through `/api/push/{id}`; the worker only
//! watches for the feed going quiet. A fresh row means the external
//! submission already persisted and published it, so the worker must not
//! touch it again.

use chrono::{DateTime, Duration, Utc};

use crate::data::{HistoricalStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullState {
    /// The latest pushed result is within one interval; nothing to do
    Fresh,
    /// No push arrived within the interval (or ever)
    Stale { last_seen: Option<DateTime<Utc>> },
}

pub async fn check_pull(
    store: &dyn HistoricalStore,
    monitor_id: &str,
    interval_seconds: u64,
    now: DateTime<Utc>,
) -> Result<PullState, StoreError> {
    let window = Duration::seconds(interval_seconds as i64);

    match store.latest_raw(monitor_id).await? {
        Some(latest) if now - latest.timestamp <= window => Ok(PullState::Fresh),
        Some(latest) => Ok(PullState::Stale {
            last_seen: Some(latest.timestamp),
        }),
        None => Ok(PullState::Stale { last_seen: None }),
    }
}

/// Human-readable reason recorded on synthesised failure rows
pub fn stale_message(last_seen: Option<DateTime<Utc>>, interval_seconds: u64) -> String {
    match last_seen {
        Some(ts) => format!(
            "no push received for {}s (last at {})",
            interval_seconds,
            ts.to_rfc3339()
        ),
        None => "no push received yet".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::repositories::historical;
    use crate::data::sqlite::repositories::historical::test_support::row;
    use crate::data::{HistoricalStore, SqliteService};
    use crate::domain::MonitorStatus;

    #[tokio::test]
    async fn test_no_rows_is_stale() {
        let store = SqliteService::init_in_memory().await.unwrap();
        let state = check_pull(&store, "m2", 30, Utc::now()).await.unwrap();
        assert_eq!(state, PullState::Stale { last_seen: None });
    }

    #[tokio::test]
    async fn test_recent_push_is_fresh() {
        let store = SqliteService::init_in_memory().await.unwrap();
        let now = Utc::now();

        let mut pushed = row("m2", MonitorStatus::Success, 250);
        pushed.timestamp = now - Duration::seconds(10);
        historical::write_raw(store.pool(), &pushed).await.unwrap();

        let state = check_pull(&store, "m2", 30, now).await.unwrap();
        assert_eq!(state, PullState::Fresh);
    }

    #[tokio::test]
    async fn test_old_push_is_stale() {
        let store = SqliteService::init_in_memory().await.unwrap();
        let now = Utc::now();
        let last = now - Duration::seconds(90);

        let mut pushed = row("m2", MonitorStatus::Success, 250);
        pushed.timestamp = last;
        historical::write_raw(store.pool(), &pushed).await.unwrap();

        let state = check_pull(&store, "m2", 30, now).await.unwrap();
        match state {
            PullState::Stale { last_seen } => {
                assert_eq!(last_seen.unwrap(), pushed.timestamp);
            }
            PullState::Fresh => panic!("expected stale"),
        }
    }

    #[tokio::test]
    async fn test_trait_object_usage() {
        let store = SqliteService::init_in_memory().await.unwrap();
        let store: &dyn HistoricalStore = &store;
        assert!(store.latest_raw("m2").await.unwrap().is_none());
    }

    #[test]
    fn test_stale_message_mentions_last_seen() {
        let ts = Utc::now();
        assert!(stale_message(Some(ts), 30).contains(&ts.to_rfc3339()));
        assert_eq!(stale_message(None, 30), "no push received yet");
    }
}
