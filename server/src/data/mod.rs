//! Data layer: persistence and in-process pub/sub

pub mod broker;
pub mod sqlite;

use async_trait::async_trait;

use crate::domain::MonitorHistorical;

pub use broker::{Broker, BrokerError, BrokerMessage, MessageHeader, Subscriber, Subscription};
pub use sqlite::{SqliteService, StoreError};

/// The slice of the store the response pipeline depends on. Kept as a trait
/// so the processor can be exercised against a failing store in tests.
#[async_trait]
pub trait HistoricalStore: Send + Sync {
    async fn write_raw(&self, row: &MonitorHistorical) -> Result<(), StoreError>;
    async fn latest_raw(&self, monitor_id: &str) -> Result<Option<MonitorHistorical>, StoreError>;
}

#[async_trait]
impl HistoricalStore for SqliteService {
    async fn write_raw(&self, row: &MonitorHistorical) -> Result<(), StoreError> {
        sqlite::repositories::historical::write_raw(self.pool(), row).await
    }

    async fn latest_raw(&self, monitor_id: &str) -> Result<Option<MonitorHistorical>, StoreError> {
        sqlite::repositories::historical::latest_raw(self.pool(), monitor_id).await
    }
}
