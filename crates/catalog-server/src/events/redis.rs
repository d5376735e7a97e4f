//! Redis pub/sub transport for catalog events.

use std::time::Duration;

use async_trait::async_trait;
use catalog_core::CatalogEvent;
use deadpool_redis::{Pool, redis::AsyncCommands};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{ChannelError, EventChannel};

/// Publishes through the shared Redis pool.
#[derive(Clone)]
pub struct RedisChannel {
    pool: Pool,
}

impl RedisChannel {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventChannel for RedisChannel {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), ChannelError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| ChannelError::Pool(e.to_string()))?;

        let _: () = conn
            .publish(topic, payload)
            .await
            .map_err(|e| ChannelError::Publish(e.to_string()))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Long-running subscriber that decodes every event published on a channel.
///
/// Connection failures are retried after `reconnect_delay` until the
/// shutdown token fires. Events published while disconnected are lost.
pub struct RedisEventSubscriber {
    redis_url: String,
    channel: String,
    reconnect_delay: Duration,
}

impl RedisEventSubscriber {
    pub fn new(redis_url: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            channel: channel.into(),
            reconnect_delay: Duration::from_secs(5),
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub async fn run<F>(&self, shutdown: CancellationToken, mut on_event: F)
    where
        F: FnMut(CatalogEvent) + Send,
    {
        info!(channel = %self.channel, "Starting catalog event subscriber");

        loop {
            let result = tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.subscribe_loop(&mut on_event) => result,
            };

            if let Err(e) = result {
                error!(
                    error = %e,
                    retry_in_ms = self.reconnect_delay.as_millis() as u64,
                    "Catalog event subscription failed, reconnecting"
                );
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        info!(channel = %self.channel, "Catalog event subscriber stopped");
    }

    async fn subscribe_loop<F>(&self, on_event: &mut F) -> Result<(), ChannelError>
    where
        F: FnMut(CatalogEvent) + Send,
    {
        use deadpool_redis::redis::Client;

        // SUBSCRIBE needs a dedicated connection, not a pooled one
        let client = Client::open(self.redis_url.as_str())
            .map_err(|e| ChannelError::Connection(e.to_string()))?;
        let mut pubsub = client
            .get_async_pubsub()
            .await
            .map_err(|e| ChannelError::Connection(e.to_string()))?;
        pubsub
            .subscribe(self.channel.as_str())
            .await
            .map_err(|e| ChannelError::Subscribe(e.to_string()))?;

        info!(channel = %self.channel, "Subscribed to catalog events");

        let mut stream = pubsub.on_message();
        while let Some(msg) = stream.next().await {
            let payload: String = msg
                .get_payload()
                .map_err(|e| ChannelError::Message(e.to_string()))?;

            match CatalogEvent::from_json(&payload) {
                Ok(event) => {
                    debug!(event = %event, "Received catalog event");
                    on_event(event);
                }
                Err(e) => warn!(error = %e, payload = %payload, "Ignoring malformed catalog event"),
            }
        }

        warn!("Redis pub/sub stream ended");
        Err(ChannelError::StreamEnded)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_subscriber_retries_until_shutdown() {
        // Nothing listens on port 1, so every connection attempt is refused.
        let subscriber = RedisEventSubscriber::new("redis://127.0.0.1:1", "reviews")
            .with_reconnect_delay(Duration::from_millis(10));
        let received = Arc::new(AtomicUsize::new(0));
        let shutdown = CancellationToken::new();

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let counter = received.clone();
        tokio::time::timeout(
            Duration::from_secs(5),
            subscriber.run(shutdown, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .await
        .expect("subscriber stops on shutdown");

        assert_eq!(received.load(Ordering::SeqCst), 0);
    }
}
