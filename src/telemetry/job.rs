//! Job span helpers.
//!
//! A job span covers the time a process spends watching one job, and
//! carries the state transitions it observed.

use tracing::Span;

use crate::model::JobId;

/// Start a span for watching job `id`.
///
/// The `job.state` field is declared empty and updated by
/// [`record_state_transition`].
pub fn start_job_span(job_type: &str, id: JobId) -> Span {
    tracing::info_span!(
        "job.watch",
        "job.type" = job_type,
        "job.id" = %id,
        "job.state" = tracing::field::Empty,
    )
}

/// Record a state transition on the given span.
pub fn record_state_transition(span: &Span, from: &str, to: &str) {
    span.record("job.state", to);
    span.in_scope(|| {
        tracing::info!(from = from, to = to, "state_transition");
    });
}
