//! Metric instrument factories for queuing-system.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"queuing-system"` meter.

use opentelemetry::metrics::{Counter, Meter};

/// Returns the shared meter for queuing-system instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("queuing-system")
}

/// Counter: messages published on a channel.
/// Labels: `channel`.
pub fn messages_published() -> Counter<u64> {
    meter()
        .u64_counter("queuing.messages.published")
        .with_description("Number of messages published")
        .build()
}

/// Counter: messages delivered to a subscriber.
/// Labels: `channel`.
pub fn messages_received() -> Counter<u64> {
    meter()
        .u64_counter("queuing.messages.received")
        .with_description("Number of messages received by subscribers")
        .build()
}

/// Counter: jobs saved to the queue.
/// Labels: `job_type`, `result` ("ok" | "error").
pub fn jobs_created() -> Counter<u64> {
    meter()
        .u64_counter("queuing.jobs.created")
        .with_description("Number of jobs saved to the queue")
        .build()
}

/// Counter: job lifecycle events read from the events channel.
/// Labels: `event`.
pub fn job_events() -> Counter<u64> {
    meter()
        .u64_counter("queuing.jobs.events")
        .with_description("Number of job lifecycle events observed")
        .build()
}

/// Counter: other queue-level operations (emit, get).
/// Labels: `operation`.
pub fn queue_operations() -> Counter<u64> {
    meter()
        .u64_counter("queuing.queue.operations")
        .with_description("Number of queue operations")
        .build()
}
