//! Job queue operations over the queue service's Redis key layout.
//!
//! Keys, with the default `q` prefix:
//!
//! - `q:ids` counter handing out job ids,
//! - `q:job:<id>` hash holding the job,
//! - `q:job:types` set of known job types,
//! - `q:jobs`, `q:jobs:<state>`, `q:jobs:<type>:<state>` sorted sets scored
//!   by priority, with members in FIFO form (see [`fifo_key`]),
//! - `q:<type>:jobs` list that wakes up workers blocked on the type,
//! - `q:events` channel carrying lifecycle events.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use futures::StreamExt;
use opentelemetry::KeyValue;
use redis::AsyncCommands;
use redis::aio::PubSub;
use tracing::{debug, warn};

use super::{Broker, JobEvents, JobStore, queue_key};
use crate::error::{Error, Result};
use crate::event::{JobEvent, JobEventKind};
use crate::model::{Job, JobId, JobState, NewJob};
use crate::telemetry::metrics;

/// Sorted-set member for job `id`: the id prefixed with its zero-padded
/// length, so that lexical order within one score is creation order.
pub fn fifo_key(id: JobId) -> String {
    let id = id.0.to_string();
    format!("{:02}|{id}", id.len())
}

impl JobStore for Broker {
    async fn save(&mut self, job: &NewJob) -> Result<JobId> {
        let ids_key = self.key(&["ids"]);
        let id: u64 = self.conn.incr(&ids_key, 1).await?;
        let id = JobId(id);

        let now = Utc::now().timestamp_millis().to_string();
        let state = JobState::Inactive.as_str();
        let priority = job.priority_score();
        let zid = fifo_key(id);
        let fields = [
            ("type", job.job_type.clone()),
            ("data", serde_json::to_string(&job.data)?),
            ("priority", priority.to_string()),
            ("state", state.to_string()),
            ("max_attempts", job.max_attempts.to_string()),
            ("attempts", "0".to_string()),
            ("created_at", now.clone()),
            ("promote_at", now.clone()),
            ("updated_at", now),
        ];

        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset_multiple(self.key(&["job", &id.to_string()]), &fields)
            .ignore()
            .sadd(self.key(&["job", "types"]), &job.job_type)
            .ignore()
            .zadd(self.key(&["jobs"]), &zid, priority)
            .ignore()
            .zadd(self.key(&["jobs", state]), &zid, priority)
            .ignore()
            .zadd(self.key(&["jobs", &job.job_type, state]), &zid, priority)
            .ignore()
            .lpush(self.key(&[&job.job_type, "jobs"]), 1)
            .ignore();

        let saved: redis::RedisResult<()> = pipe.query_async(&mut self.conn).await;
        if let Err(e) = saved {
            metrics::jobs_created().add(
                1,
                &[
                    KeyValue::new("job_type", job.job_type.clone()),
                    KeyValue::new("result", "error"),
                ],
            );
            return Err(e.into());
        }

        metrics::jobs_created().add(
            1,
            &[
                KeyValue::new("job_type", job.job_type.clone()),
                KeyValue::new("result", "ok"),
            ],
        );
        debug!(id = %id, job_type = %job.job_type, "job saved");

        let enqueue = JobEvent::new(id, JobEventKind::Enqueue).with_arg(job.job_type.clone());
        let emitted = self.emit(&enqueue).await;
        Ok(announced(id, emitted))
    }
}

/// The job is stored before its `enqueue` event goes out, so a failed
/// announcement is logged and the save still succeeds.
fn announced(id: JobId, emitted: Result<()>) -> JobId {
    if let Err(e) = emitted {
        metrics::queue_operations().add(1, &[KeyValue::new("operation", "emit_failed")]);
        warn!(id = %id, "job saved but enqueue event not sent: {e}");
    }
    id
}

impl Broker {
    /// Publish a lifecycle event on the events channel.
    pub async fn emit(&mut self, event: &JobEvent) -> Result<()> {
        let payload = event.to_payload()?;
        let channel = self.key(&["events"]);
        let _: i64 = self.conn.publish(&channel, payload).await?;
        metrics::queue_operations().add(1, &[KeyValue::new("operation", "emit")]);
        debug!(id = %event.id, event = %event.kind, "event emitted");
        Ok(())
    }

    /// Load job `id` back from its hash.
    pub async fn get_job(&mut self, id: JobId) -> Result<Job> {
        let key = self.key(&["job", &id.to_string()]);
        let hash: HashMap<String, String> = self.conn.hgetall(&key).await?;
        metrics::queue_operations().add(1, &[KeyValue::new("operation", "get")]);
        if hash.is_empty() {
            return Err(Error::NotFound(id.to_string()));
        }
        job_from_hash(id, &hash)
    }

    /// Open a subscriber connection on the events channel.
    ///
    /// Open this before saving a job, or its `enqueue` event may be missed.
    pub async fn job_events(&self) -> Result<EventStream> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(Error::Connection)?;
        let channel = queue_key(&self.prefix, &["events"]);
        pubsub.subscribe(&channel).await?;
        debug!(%channel, "listening for job events");
        Ok(EventStream { pubsub })
    }
}

/// Lifecycle events read from the events channel.
pub struct EventStream {
    pubsub: PubSub,
}

impl JobEvents for EventStream {
    async fn next_event(&mut self) -> Option<JobEvent> {
        let mut stream = std::pin::pin!(self.pubsub.on_message());
        loop {
            let msg = stream.next().await?;
            let payload: String = match msg.get_payload() {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("dropping non-utf8 job event: {e}");
                    continue;
                }
            };
            match JobEvent::parse(&payload) {
                Ok(event) => {
                    metrics::job_events()
                        .add(1, &[KeyValue::new("event", event.kind.as_str())]);
                    return Some(event);
                }
                Err(e) => warn!(%payload, "dropping malformed job event: {e}"),
            }
        }
    }
}

fn job_from_hash(id: JobId, hash: &HashMap<String, String>) -> Result<Job> {
    let field = |name: &str| {
        hash.get(name)
            .map(String::as_str)
            .ok_or_else(|| Error::Other(format!("job {id} is missing field {name:?}")))
    };
    let number = |name: &str| -> Result<i64> {
        let raw = field(name)?;
        raw.parse()
            .map_err(|_| Error::Other(format!("job {id} has a bad {name}: {raw:?}")))
    };
    let timestamp = |name: &str| -> Result<DateTime<Utc>> {
        let millis = number(name)?;
        Utc.timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| Error::Other(format!("job {id} has an out of range {name}")))
    };

    let state = field("state")?;
    Ok(Job {
        id,
        job_type: field("type")?.to_string(),
        data: serde_json::from_str(field("data")?)?,
        priority: i32::try_from(number("priority")?)
            .map_err(|_| Error::Other(format!("job {id} has an out of range priority")))?,
        state: state.parse().map_err(Error::Other)?,
        attempts: hash
            .get("attempts")
            .and_then(|n| n.parse().ok())
            .unwrap_or(0),
        max_attempts: hash
            .get("max_attempts")
            .and_then(|n| n.parse().ok())
            .unwrap_or(1),
        created_at: timestamp("created_at")?,
        updated_at: timestamp("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn fifo_key_pads_id_length() {
        assert_eq!(fifo_key(JobId(7)), "01|7");
        assert_eq!(fifo_key(JobId(42)), "02|42");
        assert_eq!(fifo_key(JobId(123456)), "06|123456");
    }

    #[test]
    fn job_from_hash_reads_saved_fields() {
        let job = job_from_hash(
            JobId(3),
            &hash(&[
                ("type", "push_notification_code"),
                (
                    "data",
                    r#"{"phoneNumber":"0123456789","message":"Account registered"}"#,
                ),
                ("priority", "0"),
                ("state", "inactive"),
                ("attempts", "0"),
                ("max_attempts", "1"),
                ("created_at", "1700000000000"),
                ("updated_at", "1700000000500"),
            ]),
        )
        .unwrap();

        assert_eq!(job.id, JobId(3));
        assert_eq!(job.job_type, "push_notification_code");
        assert_eq!(job.state, JobState::Inactive);
        assert_eq!(job.data["phoneNumber"], "0123456789");
        assert_eq!(job.created_at.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn failed_announcement_still_returns_the_saved_id() {
        let emitted = Err(Error::Other("publish refused".to_string()));
        assert_eq!(announced(JobId(9), emitted), JobId(9));
        assert_eq!(announced(JobId(10), Ok(())), JobId(10));
    }

    #[test]
    fn job_from_hash_rejects_priority_outside_i32() {
        let result = job_from_hash(
            JobId(3),
            &hash(&[
                ("type", "t"),
                ("data", "{}"),
                ("priority", "4294967296"),
                ("state", "inactive"),
                ("created_at", "0"),
                ("updated_at", "0"),
            ]),
        );
        assert!(matches!(result, Err(Error::Other(msg)) if msg.contains("priority")));
    }

    #[test]
    fn job_from_hash_rejects_unknown_state() {
        let result = job_from_hash(
            JobId(3),
            &hash(&[
                ("type", "t"),
                ("data", "{}"),
                ("priority", "0"),
                ("state", "sleeping"),
                ("created_at", "0"),
                ("updated_at", "0"),
            ]),
        );
        assert!(result.is_err());
    }
}
