//! Channel publishing and subscriptions.

use futures::StreamExt;
use opentelemetry::KeyValue;
use redis::AsyncCommands;
use redis::aio::PubSub;
use tracing::{debug, warn};

use super::{Broker, Publish, Subscription};
use crate::error::Result;
use crate::model::Message;
use crate::telemetry::metrics;

impl Publish for Broker {
    async fn publish(&mut self, channel: &str, message: &str) -> Result<()> {
        let receivers: i64 = self.conn.publish(channel, message).await?;
        metrics::messages_published().add(1, &[KeyValue::new("channel", channel.to_string())]);
        debug!(channel, receivers, "published");
        Ok(())
    }
}

/// A Redis connection in subscriber mode.
pub struct RedisSubscription {
    pubsub: PubSub,
}

impl RedisSubscription {
    pub(crate) fn new(pubsub: PubSub) -> Self {
        Self { pubsub }
    }
}

impl Subscription for RedisSubscription {
    async fn subscribe(&mut self, channel: &str) -> Result<()> {
        self.pubsub.subscribe(channel).await?;
        debug!(channel, "subscribed");
        Ok(())
    }

    async fn unsubscribe(&mut self, channel: &str) -> Result<()> {
        self.pubsub.unsubscribe(channel).await?;
        debug!(channel, "unsubscribed");
        Ok(())
    }

    async fn next_message(&mut self) -> Option<Message> {
        let msg = {
            let mut stream = std::pin::pin!(self.pubsub.on_message());
            stream.next().await?
        };
        let payload: String = match msg.get_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(channel = msg.get_channel_name(), "non-utf8 payload: {e}");
                String::from_utf8_lossy(msg.get_payload_bytes()).into_owned()
            }
        };
        metrics::messages_received().add(
            1,
            &[KeyValue::new("channel", msg.get_channel_name().to_string())],
        );
        Some(Message::new(msg.get_channel_name(), payload))
    }

    async fn quit(self) -> Result<()> {
        // Dropping the subscriber connection closes the socket.
        drop(self.pubsub);
        debug!("subscriber connection closed");
        Ok(())
    }
}
