//! Redis connection handle and the seams the processes talk through.
//!
//! `Broker` owns one multiplexed command connection, used for publishing
//! and for the job queue. Subscriptions need a dedicated connection, since
//! a Redis connection in subscriber mode cannot issue other commands; see
//! [`pubsub::RedisSubscription`] and [`jobs::EventStream`].

pub mod jobs;
pub mod pubsub;

use std::future::Future;

use crate::config::DEFAULT_QUEUE_PREFIX;
use crate::error::{Error, Result};
use crate::event::JobEvent;
use crate::model::{JobId, Message, NewJob};
use redis::aio::MultiplexedConnection;
use tracing::{debug, info};

pub use jobs::EventStream;
pub use pubsub::RedisSubscription;

/// Fire-and-forget publishing onto a channel.
pub trait Publish {
    fn publish(&mut self, channel: &str, message: &str) -> impl Future<Output = Result<()>> + Send;
}

/// A connection dedicated to receiving channel messages.
pub trait Subscription {
    fn subscribe(&mut self, channel: &str) -> impl Future<Output = Result<()>> + Send;

    fn unsubscribe(&mut self, channel: &str) -> impl Future<Output = Result<()>> + Send;

    /// Wait for the next message. `None` means the connection is gone.
    fn next_message(&mut self) -> impl Future<Output = Option<Message>> + Send;

    /// Close the connection.
    fn quit(self) -> impl Future<Output = Result<()>> + Send;
}

/// Persists new jobs in the queue service.
pub trait JobStore {
    /// Save `job` and return the id the queue service assigned to it.
    fn save(&mut self, job: &NewJob) -> impl Future<Output = Result<JobId>> + Send;
}

/// A feed of job lifecycle events.
pub trait JobEvents {
    /// Wait for the next event. `None` means the feed is closed.
    fn next_event(&mut self) -> impl Future<Output = Option<JobEvent>> + Send;
}

/// Redis handle. Owns the client and the shared command connection.
#[derive(Clone)]
pub struct Broker {
    client: redis::Client,
    conn: MultiplexedConnection,
    prefix: String,
}

impl Broker {
    /// Connect to Redis. A single attempt: failures come back as
    /// [`Error::Connection`] and are never retried.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(Error::Connection)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(Error::Connection)?;
        info!("redis client connected");
        Ok(Self {
            client,
            conn,
            prefix: DEFAULT_QUEUE_PREFIX.to_string(),
        })
    }

    /// Open a dedicated subscriber connection without a command connection.
    pub async fn connect_subscriber(url: &str) -> Result<RedisSubscription> {
        let client = redis::Client::open(url).map_err(Error::Connection)?;
        let pubsub = client.get_async_pubsub().await.map_err(Error::Connection)?;
        info!("redis subscriber connected");
        Ok(RedisSubscription::new(pubsub))
    }

    /// Use `prefix` instead of the default for queue keys.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Round-trip a PING.
    pub async fn health_check(&mut self) -> Result<()> {
        let pong: String = redis::cmd("PING").query_async(&mut self.conn).await?;
        debug!(reply = %pong, "health check");
        Ok(())
    }

    /// Build a queue key: `key(&["job", "7"])` is `q:job:7`.
    pub(crate) fn key(&self, parts: &[&str]) -> String {
        queue_key(&self.prefix, parts)
    }
}

pub(crate) fn queue_key(prefix: &str, parts: &[&str]) -> String {
    let mut key = prefix.to_string();
    for part in parts {
        key.push(':');
        key.push_str(part);
    }
    key
}
