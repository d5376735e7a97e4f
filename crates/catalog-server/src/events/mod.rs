//! Best-effort change notifications.
//!
//! Every successful catalog write ends with a [`Notifier::notify`] call that
//! publishes a [`CatalogEvent`] to a pub/sub topic. Publishing is at-most-once:
//! a failed publish is logged and the event dropped, so consumers such as the
//! audit log must tolerate gaps.
//!
//! ```text
//! CatalogManager ──notify──► Notifier ──publish──► EventChannel
//!                                                   ├─ RedisChannel     (PUBLISH, multi-instance)
//!                                                   └─ BroadcastChannel (in-process)
//! ```

mod redis;

pub use self::redis::{RedisChannel, RedisEventSubscriber};

use std::sync::Arc;

use async_trait::async_trait;
use catalog_core::CatalogEvent;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Errors raised by a pub/sub channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Redis pool error: {0}")]
    Pool(String),

    #[error("Redis connection error: {0}")]
    Connection(String),

    #[error("Redis subscribe error: {0}")]
    Subscribe(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Message error: {0}")]
    Message(String),

    #[error("Redis pub/sub stream ended")]
    StreamEnded,
}

/// Fire-and-forget publish primitive.
#[async_trait]
pub trait EventChannel: Send + Sync {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), ChannelError>;

    fn name(&self) -> &'static str;
}

pub type DynChannel = Arc<dyn EventChannel>;

/// A message delivered through a [`BroadcastChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: String,
}

/// In-process channel used when Redis is disabled.
#[derive(Debug, Clone)]
pub struct BroadcastChannel {
    sender: broadcast::Sender<PublishedMessage>,
}

impl BroadcastChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedMessage> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastChannel {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventChannel for BroadcastChannel {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), ChannelError> {
        // No subscribers is not a failure, same as PUBLISH to an empty channel.
        let _ = self.sender.send(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "broadcast"
    }
}

/// Publishes catalog events to a fixed topic, never failing its caller.
#[derive(Clone)]
pub struct Notifier {
    channel: DynChannel,
    topic: String,
}

impl Notifier {
    pub fn new(channel: DynChannel, topic: impl Into<String>) -> Self {
        Self {
            channel,
            topic: topic.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub async fn notify(&self, event: CatalogEvent) {
        let payload = match event.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(event = %event, error = %e, "Failed to encode catalog event");
                return;
            }
        };

        match self.channel.publish(&self.topic, &payload).await {
            Ok(()) => debug!(
                topic = %self.topic,
                channel = self.channel.name(),
                event = %event,
                "Published catalog event"
            ),
            Err(e) => warn!(
                topic = %self.topic,
                channel = self.channel.name(),
                event = %event,
                error = %e,
                "Catalog event dropped"
            ),
        }
    }
}
