//! # queuing-system
//!
//! Publish/subscribe messaging and job creation on Redis.
//!
//! Provides a publisher that sends timed messages to a channel, a subscriber
//! that prints them until a sentinel arrives, and a job creator that saves a
//! notification job in a Redis-backed queue and reports its lifecycle, plus
//! structured logging and optional OpenTelemetry export.

pub mod broker;
pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod event;
pub mod model;
pub mod telemetry;
