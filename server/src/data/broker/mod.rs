//! In-process pub/sub broker
//!
//! Topic-keyed fan-out with one topic per monitor id. Each topic is a
//! bounded `tokio::sync::broadcast` channel: publishing never blocks, every
//! subscriber registered at publish time receives the message exactly once,
//! and late subscribers see nothing from the past. A subscriber that falls
//! behind its bounded queue loses the oldest messages and observes
//! `BrokerError::Lagged`; the SSE handlers log and keep streaming rather
//! than disconnect. Because delivery is queue-based there is no failing
//! handler that could abort a publish part-way through the subscriber list.

mod subscriber;

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

pub use subscriber::Subscriber;

use crate::core::constants::BROKER_CHANNEL_CAPACITY;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BrokerError {
    #[error("no monitor ids provided")]
    NoTopics,
    #[error("channel closed")]
    Closed,
    #[error("receiver lagged by {0} messages")]
    Lagged(u64),
}

impl From<broadcast::error::RecvError> for BrokerError {
    fn from(err: broadcast::error::RecvError) -> Self {
        match err {
            broadcast::error::RecvError::Closed => BrokerError::Closed,
            broadcast::error::RecvError::Lagged(n) => BrokerError::Lagged(n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub monitor_id: String,
    pub interval: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrokerMessage<T> {
    pub header: MessageHeader,
    pub body: T,
}

/// Topic-keyed fan-out of typed messages
pub struct Broker<T: Clone + Send + 'static> {
    topics: RwLock<HashMap<String, broadcast::Sender<BrokerMessage<T>>>>,
    capacity: usize,
}

impl<T: Clone + Send + 'static> Broker<T> {
    pub fn new() -> Self {
        Self::with_capacity(BROKER_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    fn get_or_create(&self, topic: &str) -> broadcast::Sender<BrokerMessage<T>> {
        {
            let topics = self.topics.read();
            if let Some(sender) = topics.get(topic) {
                return sender.clone();
            }
        }

        let mut topics = self.topics.write();
        // Double-check after acquiring the write lock
        if let Some(sender) = topics.get(topic) {
            return sender.clone();
        }

        let (sender, _) = broadcast::channel(self.capacity);
        topics.insert(topic.to_string(), sender.clone());
        sender
    }

    /// Deliver `message` to every subscriber currently registered on
    /// `topic`. Non-blocking; returns how many subscribers will see it.
    pub fn publish(&self, topic: &str, message: BrokerMessage<T>) -> usize {
        let sender = self.get_or_create(topic);
        // A send error only means there are no active subscribers
        sender.send(message).unwrap_or(0)
    }

    /// Register a new subscriber on `topic`. The subscription only observes
    /// messages published after this call.
    pub fn subscribe(&self, topic: &str) -> Subscription<T> {
        let sender = self.get_or_create(topic);
        Subscription {
            id: Uuid::new_v4(),
            topic: topic.to_string(),
            rx: sender.subscribe(),
        }
    }

    /// Active subscriber count on a topic
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .get(topic)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}

impl<T: Clone + Send + 'static> Default for Broker<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for one subscriber on one topic. Dropping it (or calling
/// [`Subscription::unsubscribe`]) removes the registration; both are
/// idempotent and no message is delivered afterwards.
#[derive(Debug)]
pub struct Subscription<T> {
    id: Uuid,
    topic: String,
    rx: broadcast::Receiver<BrokerMessage<T>>,
}

impl<T: Clone + Send + 'static> Subscription<T> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Next message on the topic
    pub async fn recv(&mut self) -> Result<BrokerMessage<T>, BrokerError> {
        self.rx.recv().await.map_err(Into::into)
    }

    pub fn unsubscribe(self) {}

    pub(crate) fn into_receiver(self) -> broadcast::Receiver<BrokerMessage<T>> {
        self.rx
    }
}
