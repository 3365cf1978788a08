//! HTTP API: SSE streams, history snapshots, incident submission, push
//! ingestion for pull monitors

pub mod routes;
pub mod server;
pub mod types;

use std::sync::Arc;

use tokio::sync::watch;

use crate::data::broker::Broker;
use crate::data::SqliteService;
use crate::domain::{Monitor, MonitorHistorical};
use crate::probes::Processor;

pub use types::ApiError;

/// Shared state for all API handlers
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<SqliteService>,
    pub broker: Arc<Broker<MonitorHistorical>>,
    pub processor: Arc<Processor>,
    /// Monitor list cached at startup; ids are validated against it
    pub monitors: Arc<Vec<Monitor>>,
    pub api_key: Option<String>,
    pub shutdown_rx: watch::Receiver<bool>,
}

impl ApiState {
    pub fn monitor(&self, id: &str) -> Option<&Monitor> {
        self.monitors.iter().find(|m| m.id == id)
    }

    pub fn knows(&self, id: &str) -> bool {
        self.monitor(id).is_some()
    }

    pub fn monitor_ids(&self) -> Vec<String> {
        self.monitors.iter().map(|m| m.id.clone()).collect()
    }
}
