//! Response processor
//!
//! Every probe result flows through here: persist with bounded retry, alert
//! on status transitions, publish to the broker. Persistence strictly
//! precedes publication so subscribers never see a result before it is
//! queryable; alert dispatch runs on its own task and may outlive the call.

use std::sync::Arc;

use crate::alerters::{AlerterRegistry, AlertMessage, ForwardedResult, ResultForwarder};
use crate::data::broker::{Broker, BrokerMessage, MessageHeader};
use crate::data::HistoricalStore;
use crate::domain::monitor::MAX_MONITOR_ID_LEN;
use crate::domain::{MonitorHistorical, MonitorStatus};
use crate::probes::ProbeResponse;
use crate::utils::retry::{retry_with_backoff, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS};
use crate::utils::time::ensure_utc;

pub struct Processor {
    store: Arc<dyn HistoricalStore>,
    broker: Arc<Broker<MonitorHistorical>>,
    alerters: Arc<AlerterRegistry>,
    forwarder: Option<Arc<ResultForwarder>>,
}

impl Processor {
    pub fn new(
        store: Arc<dyn HistoricalStore>,
        broker: Arc<Broker<MonitorHistorical>>,
        alerters: Arc<AlerterRegistry>,
        forwarder: Option<Arc<ResultForwarder>>,
    ) -> Self {
        Self {
            store,
            broker,
            alerters,
            forwarder,
        }
    }

    pub async fn process(&self, response: ProbeResponse) {
        let status = MonitorStatus::from_success(response.success);
        let monitor_id = truncate_monitor_id(&response.monitor_id);

        let row = MonitorHistorical {
            monitor_id: monitor_id.clone(),
            status,
            latency: response.latency.max(0),
            timestamp: ensure_utc(response.timestamp),
            additional_message: response.additional_message.clone(),
            http_protocol: response.http_protocol.clone(),
            tls_version: response.tls_version.clone(),
            tls_cipher: response.tls_cipher.clone(),
            tls_expiry: response.tls_expiry,
        };

        // The alert baseline is the latest row BEFORE this result lands;
        // read it first or the comparison would see the row we just wrote.
        let previous_status = match self.store.latest_raw(&monitor_id).await {
            Ok(previous) => previous.map(|p| p.status),
            Err(e) => {
                tracing::error!(
                    monitor_id = %monitor_id,
                    error = %e,
                    "failed to read latest historical data"
                );
                None
            }
        };

        if let Err((e, attempts)) = retry_with_backoff(
            DEFAULT_MAX_ATTEMPTS,
            DEFAULT_BASE_DELAY_MS,
            || self.store.write_raw(&row),
        )
        .await
        {
            // The pipeline keeps going: alerts and the broker still see
            // the result even when persistence gave up.
            tracing::error!(
                monitor_id = %monitor_id,
                attempts,
                error = %e,
                "failed to write historical data"
            );
        }

        self.dispatch_notifications(&response, &monitor_id, status, previous_status);

        self.broker.publish(
            &monitor_id,
            BrokerMessage {
                header: MessageHeader {
                    monitor_id: monitor_id.clone(),
                    interval: "raw".to_string(),
                },
                body: row,
            },
        );
    }

    /// Alert on a transition and forward the raw result, off the hot path
    fn dispatch_notifications(
        &self,
        response: &ProbeResponse,
        monitor_id: &str,
        status: MonitorStatus,
        previous_status: Option<MonitorStatus>,
    ) {
        // No prior row means no baseline: the first result never alerts
        let transitioned = previous_status.is_some_and(|previous| previous != status);

        let alerters = Arc::clone(&self.alerters);
        let forwarder = self.forwarder.clone();
        let provider = response.alert_provider;
        let forwarded = forwarder
            .is_some()
            .then(|| ForwardedResult::from_response(response));
        let message = AlertMessage {
            success: response.success,
            status_code: response.status_code,
            timestamp: response.timestamp,
            monitor_id: monitor_id.to_string(),
            monitor_name: response.monitor_name.clone(),
            latency: response.latency,
        };

        tokio::spawn(async move {
            if transitioned {
                if alerters.is_empty() {
                    tracing::warn!("no alert providers are set");
                } else {
                    match alerters.resolve(provider) {
                        Some(alerter) => {
                            if let Err(e) = alerter.send(&message).await {
                                tracing::error!(
                                    monitor_id = %message.monitor_id,
                                    error = %e,
                                    "failed to send alert"
                                );
                            }
                        }
                        None => {
                            tracing::warn!(
                                monitor_id = %message.monitor_id,
                                provider = ?provider,
                                "alert provider is not configured"
                            );
                        }
                    }
                }
            }

            if let (Some(forwarder), Some(forwarded)) = (forwarder, forwarded) {
                if let Err(e) = forwarder.forward(&forwarded).await {
                    tracing::warn!(error = %e, "failed to forward result webhook");
                }
            }
        });
    }
}

/// Monitor ids are capped at 255 characters; anything longer is cut at the
/// nearest character boundary.
fn truncate_monitor_id(id: &str) -> String {
    if id.len() <= MAX_MONITOR_ID_LEN {
        return id.to_string();
    }
    let mut end = MAX_MONITOR_ID_LEN;
    while !id.is_char_boundary(end) {
        end -= 1;
    }
    id[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerters::{Alerter, AlertError};
    use crate::data::{SqliteService, StoreError};
    use crate::data::sqlite::repositories::historical;
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::time::Duration;

    struct RecordingAlerter {
        sent: Mutex<Vec<AlertMessage>>,
    }

    impl RecordingAlerter {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<AlertMessage> {
            self.sent.lock().clone()
        }
    }

    #[async_trait]
    impl Alerter for RecordingAlerter {
        async fn send(&self, msg: &AlertMessage) -> Result<(), AlertError> {
            self.sent.lock().push(msg.clone());
            Ok(())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl HistoricalStore for FailingStore {
        async fn write_raw(&self, _row: &MonitorHistorical) -> Result<(), StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }

        async fn latest_raw(
            &self,
            _monitor_id: &str,
        ) -> Result<Option<MonitorHistorical>, StoreError> {
            Ok(None)
        }
    }

    fn response(monitor_id: &str, success: bool) -> ProbeResponse {
        ProbeResponse {
            monitor_id: monitor_id.to_string(),
            monitor_name: "Example".to_string(),
            target: "https://example.com".to_string(),
            alert_provider: None,
            success,
            status_code: if success { 200 } else { 500 },
            latency: 42,
            timestamp: Utc::now(),
            http_protocol: Some("HTTP/1.1".to_string()),
            tls_version: None,
            tls_cipher: None,
            tls_expiry: None,
            additional_message: None,
        }
    }

    async fn wait_for_alerts(alerter: &RecordingAlerter, count: usize) -> Vec<AlertMessage> {
        for _ in 0..100 {
            if alerter.sent().len() >= count {
                return alerter.sent();
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        alerter.sent()
    }

    fn processor_with(
        store: Arc<dyn HistoricalStore>,
        broker: Arc<Broker<MonitorHistorical>>,
        alerter: Option<Arc<RecordingAlerter>>,
    ) -> Processor {
        let mut registry = AlerterRegistry::new();
        if let Some(alerter) = alerter {
            registry.register(crate::domain::AlertProvider::Telegram, alerter);
        }
        Processor::new(store, broker, Arc::new(registry), None)
    }

    #[tokio::test]
    async fn test_result_is_persisted_before_publish() {
        let store = Arc::new(SqliteService::init_in_memory().await.unwrap());
        let broker = Arc::new(Broker::new());
        let processor = processor_with(store.clone(), broker.clone(), None);

        let mut sub = broker.subscribe("m1");
        processor.process(response("m1", true)).await;

        let published = sub.recv().await.unwrap();
        assert_eq!(published.header.interval, "raw");
        assert_eq!(published.body.status, MonitorStatus::Success);

        // The published row is already in the store with the same timestamp
        let persisted = historical::latest_raw(store.pool(), "m1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(persisted.timestamp, published.body.timestamp);
        assert_eq!(persisted.latency, 42);
    }

    #[tokio::test]
    async fn test_first_result_does_not_alert() {
        let store = Arc::new(SqliteService::init_in_memory().await.unwrap());
        let alerter = RecordingAlerter::new();
        let processor =
            processor_with(store, Arc::new(Broker::new()), Some(alerter.clone()));

        processor.process(response("m1", false)).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(alerter.sent().is_empty());
    }

    #[tokio::test]
    async fn test_transition_fires_exactly_one_alert() {
        let store = Arc::new(SqliteService::init_in_memory().await.unwrap());
        let alerter = RecordingAlerter::new();
        let processor = processor_with(
            store.clone(),
            Arc::new(Broker::new()),
            Some(alerter.clone()),
        );

        processor.process(response("m1", false)).await;
        processor.process(response("m1", true)).await;

        let sent = wait_for_alerts(&alerter, 1).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].monitor_id, "m1");
        assert!(sent[0].success);
    }

    #[tokio::test]
    async fn test_no_alert_without_transition() {
        let store = Arc::new(SqliteService::init_in_memory().await.unwrap());
        let alerter = RecordingAlerter::new();
        let processor = processor_with(
            store.clone(),
            Arc::new(Broker::new()),
            Some(alerter.clone()),
        );

        processor.process(response("m1", true)).await;
        processor.process(response("m1", true)).await;
        processor.process(response("m1", true)).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(alerter.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_failure_still_publishes() {
        let broker = Arc::new(Broker::new());
        let processor = processor_with(Arc::new(FailingStore), broker.clone(), None);

        let mut sub = broker.subscribe("m1");
        processor.process(response("m1", true)).await;

        // All three attempts failed, the subscriber still gets the result
        let published = sub.recv().await.unwrap();
        assert_eq!(published.body.monitor_id, "m1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_retry_backs_off_exponentially() {
        let broker = Arc::new(Broker::new());
        let processor = processor_with(Arc::new(FailingStore), broker, None);

        let started = tokio::time::Instant::now();
        processor.process(response("m1", true)).await;
        // 2s after the first failure, 4s after the second
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_long_monitor_id_is_truncated() {
        let store = Arc::new(SqliteService::init_in_memory().await.unwrap());
        let broker = Arc::new(Broker::new());
        let processor = processor_with(store.clone(), broker.clone(), None);

        let long_id = "m".repeat(300);
        let truncated: String = long_id.chars().take(255).collect();
        let mut sub = broker.subscribe(&truncated);

        processor.process(response(&long_id, true)).await;

        let published = sub.recv().await.unwrap();
        assert_eq!(published.body.monitor_id.len(), 255);
        assert!(historical::latest_raw(store.pool(), &truncated)
            .await
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let id = "é".repeat(200); // 2 bytes per char, 400 bytes
        let truncated = truncate_monitor_id(&id);
        assert!(truncated.len() <= 255);
        assert!(truncated.chars().all(|c| c == 'é'));
    }
}
