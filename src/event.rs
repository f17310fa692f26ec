//! Job lifecycle events as published by the queue service.
//!
//! Every event travels on the `<prefix>:events` channel as a JSON object:
//! `{"id": 7, "event": "failed attempt", "args": ["failed attempt", "boom", 1]}`.
//! The first element of `args` repeats the event name; the rest are
//! event-specific.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{JobId, JobState};

/// A lifecycle event for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobEvent {
    pub id: JobId,
    pub kind: JobEventKind,
    /// Event-specific arguments, without the leading event name.
    pub args: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobEventKind {
    Enqueue,
    Start,
    Promotion,
    Progress,
    FailedAttempt,
    Failed,
    Complete,
    Remove,
}

impl JobEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobEventKind::Enqueue => "enqueue",
            JobEventKind::Start => "start",
            JobEventKind::Promotion => "promotion",
            JobEventKind::Progress => "progress",
            JobEventKind::FailedAttempt => "failed attempt",
            JobEventKind::Failed => "failed",
            JobEventKind::Complete => "complete",
            JobEventKind::Remove => "remove",
        }
    }

    /// The state a job is in right after this event, if the event implies one.
    pub fn resulting_state(self) -> Option<JobState> {
        match self {
            JobEventKind::Enqueue | JobEventKind::Promotion | JobEventKind::FailedAttempt => {
                Some(JobState::Inactive)
            }
            JobEventKind::Start => Some(JobState::Active),
            JobEventKind::Failed => Some(JobState::Failed),
            JobEventKind::Complete => Some(JobState::Complete),
            JobEventKind::Progress | JobEventKind::Remove => None,
        }
    }
}

impl std::fmt::Display for JobEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JobEventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "enqueue" => Ok(JobEventKind::Enqueue),
            "start" => Ok(JobEventKind::Start),
            "promotion" => Ok(JobEventKind::Promotion),
            "progress" => Ok(JobEventKind::Progress),
            "failed attempt" => Ok(JobEventKind::FailedAttempt),
            "failed" => Ok(JobEventKind::Failed),
            "complete" => Ok(JobEventKind::Complete),
            "remove" => Ok(JobEventKind::Remove),
            other => Err(Error::InvalidEvent(format!("unknown event kind {other:?}"))),
        }
    }
}

/// Job ids arrive as numbers from the process that saved the job, and as
/// strings from processes that loaded it back from Redis.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireId {
    Number(u64),
    Text(String),
}

#[derive(Serialize, Deserialize)]
struct WireEvent {
    id: WireId,
    event: String,
    #[serde(default)]
    args: Vec<serde_json::Value>,
}

impl JobEvent {
    pub fn new(id: JobId, kind: JobEventKind) -> Self {
        Self {
            id,
            kind,
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<serde_json::Value>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Parse an event from its channel payload.
    pub fn parse(payload: &str) -> Result<Self> {
        let wire: WireEvent = serde_json::from_str(payload)?;

        let id = match wire.id {
            WireId::Number(n) => JobId(n),
            WireId::Text(s) => s
                .parse()
                .map_err(|_| Error::InvalidEvent(format!("bad job id {s:?}")))?,
        };
        let kind: JobEventKind = wire.event.parse()?;

        let mut args = wire.args;
        if args.first().and_then(|a| a.as_str()) == Some(kind.as_str()) {
            args.remove(0);
        }

        Ok(Self { id, kind, args })
    }

    /// Render the channel payload for this event.
    pub fn to_payload(&self) -> Result<String> {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(serde_json::Value::from(self.kind.as_str()));
        args.extend(self.args.iter().cloned());

        let wire = WireEvent {
            id: WireId::Number(self.id.0),
            event: self.kind.as_str().to_string(),
            args,
        };
        Ok(serde_json::to_string(&wire)?)
    }
}
