//! Multi-topic fan-in for SSE handlers
//!
//! Merges one broker subscription per monitor id into a single endless
//! stream of results. Dropping the stream drops every underlying receiver,
//! which unsubscribes from the broker and discards pending messages.

use futures::stream::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use super::{Broker, BrokerError, Subscription};
use crate::domain::MonitorHistorical;

#[derive(Debug)]
pub struct Subscriber {
    subscriptions: Vec<Subscription<MonitorHistorical>>,
}

impl Subscriber {
    /// Subscribe to every listed monitor topic. At least one id is required.
    pub fn new(
        broker: &Broker<MonitorHistorical>,
        monitor_ids: &[String],
    ) -> Result<Self, BrokerError> {
        if monitor_ids.is_empty() {
            return Err(BrokerError::NoTopics);
        }

        let subscriptions = monitor_ids
            .iter()
            .map(|id| broker.subscribe(id))
            .collect();

        Ok(Self { subscriptions })
    }

    pub fn topic_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Infinite merged stream of results across all subscribed topics.
    /// Overflowed subscriptions are logged and resume at the newest data.
    pub fn listen(self) -> impl Stream<Item = MonitorHistorical> + Send {
        let streams = self
            .subscriptions
            .into_iter()
            .map(|sub| BroadcastStream::new(sub.into_receiver()));

        futures::stream::select_all(streams).filter_map(|item| async move {
            match item {
                Ok(message) => Some(message.body),
                Err(BroadcastStreamRecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "SSE subscriber lagged, dropping oldest results");
                    None
                }
            }
        })
    }
}
