//! Subscriber: prints channel messages until it sees the sentinel.

use std::io::Write;
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{debug, info, warn};

use super::CONNECTED_LINE;
use crate::broker::Subscription;
use crate::console::Console;
use crate::error::{Error, Result};
use crate::model::{Message, SubscriberState};

enum Wake {
    Shutdown,
    Message(Option<Message>),
}

pub struct Subscriber<S> {
    conn: S,
    channel: String,
    state: SubscriberState,
    received: u64,
    shutdown: Arc<Notify>,
}

impl<S: Subscription> Subscriber<S> {
    /// Wrap an established subscriber connection.
    pub fn new(conn: S, channel: impl Into<String>) -> Self {
        Self {
            conn,
            channel: channel.into(),
            state: SubscriberState::Disconnected,
            received: 0,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Handle that stops [`Subscriber::run`] from another task.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    fn transition(&mut self, to: SubscriberState) -> Result<()> {
        if !self.state.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        debug!(from = %self.state, to = %to, "subscriber state");
        self.state = to;
        Ok(())
    }

    /// Subscribe, then print every message until the sentinel arrives, the
    /// connection drops, or shutdown is requested. Returns the number of
    /// messages received.
    ///
    /// On the sentinel the subscriber unsubscribes and then closes the
    /// connection; nothing is read after that.
    pub async fn run<O: Write, E: Write>(mut self, console: &mut Console<O, E>) -> Result<u64> {
        self.transition(SubscriberState::Connected)?;
        console.line(CONNECTED_LINE)?;

        match self.conn.subscribe(&self.channel).await {
            Ok(()) => {
                self.transition(SubscriberState::Subscribed)?;
                console.line(format_args!("Subscribed to {}", self.channel))?;
            }
            Err(e) => {
                warn!(channel = %self.channel, "subscribe failed: {e}");
                console.error(format_args!("Error subscribing to channel: {e}"))?;
            }
        }

        loop {
            let wake = tokio::select! {
                _ = self.shutdown.notified() => Wake::Shutdown,
                msg = self.conn.next_message() => Wake::Message(msg),
            };

            match wake {
                Wake::Shutdown => {
                    info!("subscriber shutting down");
                    return self.close(false).await;
                }
                Wake::Message(None) => {
                    console.error("Redis client not connected to the server: connection closed")?;
                    self.transition(SubscriberState::Terminated)?;
                    return Ok(self.received);
                }
                Wake::Message(Some(msg)) => {
                    self.received += 1;
                    console.line(&msg.payload)?;
                    if msg.is_sentinel() {
                        info!(channel = %msg.channel, "sentinel received");
                        return self.close(true).await;
                    }
                }
            }
        }
    }

    async fn close(mut self, unsubscribe: bool) -> Result<u64> {
        if unsubscribe && self.state == SubscriberState::Subscribed {
            if let Err(e) = self.conn.unsubscribe(&self.channel).await {
                warn!(channel = %self.channel, "unsubscribe failed: {e}");
            }
        }
        self.transition(SubscriberState::Terminated)?;
        let received = self.received;
        self.conn.quit().await?;
        Ok(received)
    }
}
