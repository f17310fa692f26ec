//! Job creator: saves one notification job and reports its lifecycle.

use std::io::Write;
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{Instrument, Span, debug, info, warn};

use crate::broker::{JobEvents, JobStore};
use crate::console::Console;
use crate::error::Result;
use crate::event::{JobEvent, JobEventKind};
use crate::model::{JobId, JobState, NOTIFICATION_QUEUE, NewJob, NotificationPayload, Priority};
use crate::telemetry::job::{record_state_transition, start_job_span};

/// How watching the job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(JobId),
    Failed(JobId),
    /// The event feed closed or shutdown was requested before the job
    /// reached a terminal state.
    Detached(JobId),
}

enum Wake {
    Shutdown,
    Event(Option<JobEvent>),
}

pub struct JobCreator<Q, V> {
    store: Q,
    events: V,
    priority: Priority,
    attempts: u32,
    state: Option<JobState>,
    shutdown: Arc<Notify>,
}

impl<Q: JobStore, V: JobEvents> JobCreator<Q, V> {
    /// `events` must already be listening, so that the job's `enqueue`
    /// event cannot slip past between saving and watching.
    pub fn new(store: Q, events: V) -> Self {
        Self {
            store,
            events,
            priority: Priority::default(),
            attempts: 1,
            state: None,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Priority the job is saved with. Defaults to normal.
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Attempts the queue allows before the job fails for good. Defaults to 1.
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Handle that stops [`JobCreator::run`] from another task.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// The job this process creates.
    pub fn notification_job() -> Result<NewJob> {
        NewJob::with_payload(NOTIFICATION_QUEUE, &NotificationPayload::account_registered())
    }

    /// Save the notification job, then log its enqueue, complete and
    /// failed-attempt events until it reaches a terminal state.
    ///
    /// A failed save is returned as an error; nothing is retried.
    pub async fn run<O: Write, E: Write>(
        mut self,
        console: &mut Console<O, E>,
    ) -> Result<JobOutcome> {
        let job = Self::notification_job()?
            .priority(self.priority)
            .attempts(self.attempts);
        let id = self.store.save(&job).await?;
        info!(id = %id, job_type = job.job_type(), "notification job saved");

        let span = start_job_span(job.job_type(), id);
        self.watch(id, console, &span).instrument(span.clone()).await
    }

    async fn watch<O: Write, E: Write>(
        &mut self,
        id: JobId,
        console: &mut Console<O, E>,
        span: &Span,
    ) -> Result<JobOutcome> {
        loop {
            let wake = tokio::select! {
                _ = self.shutdown.notified() => Wake::Shutdown,
                event = self.events.next_event() => Wake::Event(event),
            };

            let event = match wake {
                Wake::Shutdown => {
                    info!("job creator shutting down");
                    return Ok(JobOutcome::Detached(id));
                }
                Wake::Event(None) => {
                    warn!("job event feed closed");
                    return Ok(JobOutcome::Detached(id));
                }
                Wake::Event(Some(event)) if event.id != id => continue,
                Wake::Event(Some(event)) => event,
            };

            match event.kind {
                JobEventKind::Enqueue => {
                    console.line(format_args!("Notification job created: {id}"))?;
                }
                JobEventKind::Complete => console.line("Notification job completed")?,
                JobEventKind::FailedAttempt => console.line("Notification job failed")?,
                JobEventKind::Failed => {
                    warn!(id = %id, args = ?event.args, "notification job failed for good");
                }
                other => debug!(id = %id, event = %other, "job event"),
            }

            match self.track(event.kind, span) {
                Some(JobState::Complete) => return Ok(JobOutcome::Completed(id)),
                Some(state) if state.is_terminal() => return Ok(JobOutcome::Failed(id)),
                _ => {}
            }
        }
    }

    /// Follow the state an event implies and return it. Out-of-order events
    /// are logged, never fatal.
    fn track(&mut self, kind: JobEventKind, span: &Span) -> Option<JobState> {
        let next = kind.resulting_state()?;
        match self.state {
            None => {
                record_state_transition(span, "new", next.as_str());
            }
            Some(current) if current == next => {}
            Some(current) if current.can_transition_to(next) => {
                record_state_transition(span, current.as_str(), next.as_str());
            }
            Some(current) => {
                warn!(from = %current, to = %next, event = %kind, "unexpected job state transition");
            }
        }
        self.state = Some(next);
        self.state
    }
}
