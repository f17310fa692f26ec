//! Core data model.
//!
//! Messages travel over a single pub/sub channel. A job is a notification
//! request handed to the queue service, which assigns its id and reports its
//! lifecycle back as events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Channel shared by the publisher and the subscriber.
pub const CHANNEL: &str = "holberton school channel";

/// Payload that tells the subscriber to leave the channel and disconnect.
pub const KILL_SERVER: &str = "KILL_SERVER";

/// Queue (job type) notification jobs are created in.
pub const NOTIFICATION_QUEUE: &str = "push_notification_code";

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A message received on a subscribed channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub channel: String,
    pub payload: String,
}

impl Message {
    pub fn new(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }

    /// Exact comparison only: no trimming, no case folding.
    pub fn is_sentinel(&self) -> bool {
        self.payload == KILL_SERVER
    }
}

// ---------------------------------------------------------------------------
// Subscriber state
// ---------------------------------------------------------------------------

/// Lifecycle of a subscriber connection. There is no way back from
/// `Terminated` and no reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriberState {
    Disconnected,
    Connected,
    Subscribed,
    Terminated,
}

impl SubscriberState {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: SubscriberState) -> bool {
        use SubscriberState::*;
        matches!(
            (self, to),
            (Disconnected, Connected)
                | (Connected, Subscribed)
                | (Connected, Terminated)   // shutdown or lost before subscribing
                | (Subscribed, Terminated)
        )
    }
}

impl std::fmt::Display for SubscriberState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SubscriberState::Disconnected => "disconnected",
            SubscriberState::Connected => "connected",
            SubscriberState::Subscribed => "subscribed",
            SubscriberState::Terminated => "terminated",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// Identifier assigned by the queue service when a job is saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(JobId)
    }
}

/// The payload of a push notification job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub phone_number: String,
    pub message: String,
}

impl NotificationPayload {
    /// The notification sent when an account gets registered.
    pub fn account_registered() -> Self {
        Self {
            phone_number: "0123456789".to_string(),
            message: "Account registered".to_string(),
        }
    }
}

/// A job as persisted by the queue service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub job_type: String,
    pub data: serde_json::Value,
    pub priority: i32,
    pub state: JobState,
    pub attempts: u32,
    pub max_attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Job state
// ---------------------------------------------------------------------------

/// Lifecycle state of a job, named the way the queue service names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting for a worker.
    Inactive,
    /// A worker is processing it.
    Active,
    /// Done successfully. Terminal.
    Complete,
    /// Exhausted its attempts. Terminal unless requeued by hand.
    Failed,
    /// Waiting for its delay (or retry backoff) to expire.
    Delayed,
}

impl JobState {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, to),
            (Inactive, Active)
                | (Active, Complete)
                | (Active, Failed)
                | (Active, Inactive)    // failed attempt, retried
                | (Active, Delayed)     // failed attempt with backoff
                | (Delayed, Inactive)   // promotion
                | (Failed, Inactive) // manual requeue
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Complete | JobState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Inactive => "inactive",
            JobState::Active => "active",
            JobState::Complete => "complete",
            JobState::Failed => "failed",
            JobState::Delayed => "delayed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inactive" => Ok(JobState::Inactive),
            "active" => Ok(JobState::Active),
            "complete" => Ok(JobState::Complete),
            "failed" => Ok(JobState::Failed),
            "delayed" => Ok(JobState::Delayed),
            other => Err(format!("unknown job state: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Job priority. Lower scores are picked up first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn score(self) -> i32 {
        match self {
            Priority::Low => 10,
            Priority::Normal => 0,
            Priority::Medium => -5,
            Priority::High => -10,
            Priority::Critical => -15,
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            other => Err(format!(
                "unknown priority {other:?} (expected low, normal, medium, high or critical)"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// A job that has not been saved yet, so it has no id.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub(crate) job_type: String,
    pub(crate) data: serde_json::Value,
    pub(crate) priority: Priority,
    pub(crate) max_attempts: u32,
}

impl NewJob {
    pub fn new(job_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            job_type: job_type.into(),
            data,
            priority: Priority::default(),
            max_attempts: 1,
        }
    }

    /// Builds a job whose data is the JSON form of `payload`.
    pub fn with_payload<T: Serialize>(
        job_type: impl Into<String>,
        payload: &T,
    ) -> crate::error::Result<Self> {
        Ok(Self::new(job_type, serde_json::to_value(payload)?))
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Attempts allowed before the job fails for good. Clamped to at least 1.
    pub fn attempts(mut self, n: u32) -> Self {
        self.max_attempts = n.max(1);
        self
    }

    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    pub fn priority_score(&self) -> i32 {
        self.priority.score()
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
