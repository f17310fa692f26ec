//! Error types for queuing-system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The broker could not be reached. This is the one failure the processes
    /// report and then stop on.
    #[error("Redis client not connected to the server: {0}")]
    Connection(#[source] redis::RedisError),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("job not found: {0}")]
    NotFound(String),

    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("invalid job event: {0}")]
    InvalidEvent(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
