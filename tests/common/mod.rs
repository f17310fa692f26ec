//! In-memory stand-ins for Redis, shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use queuing_system::broker::{JobEvents, JobStore, Publish, Subscription};
use queuing_system::error::{Error, Result};
use queuing_system::event::JobEvent;
use queuing_system::model::{JobId, Message, NewJob};
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub channel: String,
    pub message: String,
    /// Time since the mock was created.
    pub at: Duration,
}

/// Records every publish with the (possibly paused) tokio clock.
#[derive(Clone)]
pub struct RecordingPublisher {
    pub sent: Arc<Mutex<Vec<Sent>>>,
    started: Instant,
    fail_on: Option<String>,
    reply_after: Duration,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            started: Instant::now(),
            fail_on: None,
            reply_after: Duration::ZERO,
        }
    }

    /// Publishing `message` records the attempt and then fails.
    pub fn failing_on(mut self, message: &str) -> Self {
        self.fail_on = Some(message.to_string());
        self
    }

    /// Every publish is recorded on arrival but only replies after `delay`.
    pub fn replying_after(mut self, delay: Duration) -> Self {
        self.reply_after = delay;
        self
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent().into_iter().map(|s| s.message).collect()
    }
}

impl Publish for RecordingPublisher {
    async fn publish(&mut self, channel: &str, message: &str) -> Result<()> {
        self.sent.lock().unwrap().push(Sent {
            channel: channel.to_string(),
            message: message.to_string(),
            at: self.started.elapsed(),
        });
        if !self.reply_after.is_zero() {
            tokio::time::sleep(self.reply_after).await;
        }
        if self.fail_on.as_deref() == Some(message) {
            return Err(Error::Other("publish rejected".to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Subscriber
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Subscribe(String),
    Unsubscribe(String),
    Next,
    Quit,
}

/// Delivers a scripted list of messages and records every call.
pub struct ScriptedSubscription {
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub pending: Arc<Mutex<VecDeque<Message>>>,
    fail_subscribe: bool,
    hang_when_empty: bool,
}

impl ScriptedSubscription {
    pub fn new(channel: &str, payloads: &[&str]) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            pending: Arc::new(Mutex::new(
                payloads.iter().map(|p| Message::new(channel, *p)).collect(),
            )),
            fail_subscribe: false,
            hang_when_empty: false,
        }
    }

    pub fn failing_subscribe(mut self) -> Self {
        self.fail_subscribe = true;
        self
    }

    /// Once the script runs out, wait forever instead of reporting a
    /// dropped connection.
    pub fn hanging(mut self) -> Self {
        self.hang_when_empty = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl Subscription for ScriptedSubscription {
    async fn subscribe(&mut self, channel: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Subscribe(channel.to_string()));
        if self.fail_subscribe {
            return Err(Error::Other("subscribe refused".to_string()));
        }
        Ok(())
    }

    async fn unsubscribe(&mut self, channel: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Unsubscribe(channel.to_string()));
        Ok(())
    }

    async fn next_message(&mut self) -> Option<Message> {
        self.calls.lock().unwrap().push(Call::Next);
        let next = self.pending.lock().unwrap().pop_front();
        if next.is_none() && self.hang_when_empty {
            std::future::pending::<()>().await;
        }
        next
    }

    async fn quit(self) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Quit);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Job queue
// ---------------------------------------------------------------------------

/// Hands out ids from `first_id` and keeps every saved job.
#[derive(Clone)]
pub struct RecordingStore {
    pub saved: Arc<Mutex<Vec<NewJob>>>,
    next_id: u64,
    fail: bool,
}

impl RecordingStore {
    pub fn new(first_id: u64) -> Self {
        Self {
            saved: Arc::new(Mutex::new(Vec::new())),
            next_id: first_id,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(1)
        }
    }

    pub fn saved(&self) -> Vec<NewJob> {
        self.saved.lock().unwrap().clone()
    }
}

impl JobStore for RecordingStore {
    async fn save(&mut self, job: &NewJob) -> Result<JobId> {
        if self.fail {
            return Err(Error::Other("queue unavailable".to_string()));
        }
        self.saved.lock().unwrap().push(job.clone());
        let id = JobId(self.next_id);
        self.next_id += 1;
        Ok(id)
    }
}

/// Replays a scripted list of events.
pub struct ScriptedEvents {
    pending: VecDeque<JobEvent>,
    hang_when_empty: bool,
}

impl ScriptedEvents {
    pub fn new(events: Vec<JobEvent>) -> Self {
        Self {
            pending: events.into(),
            hang_when_empty: false,
        }
    }

    pub fn hanging(mut self) -> Self {
        self.hang_when_empty = true;
        self
    }
}

impl JobEvents for ScriptedEvents {
    async fn next_event(&mut self) -> Option<JobEvent> {
        let next = self.pending.pop_front();
        if next.is_none() && self.hang_when_empty {
            std::future::pending::<()>().await;
        }
        next
    }
}
