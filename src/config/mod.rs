//! Typed configuration from environment variables.
//!
//! Loads once at startup. Every variable has a default matching the Redis
//! client's own defaults, so an empty environment talks to a local server.
//! The Redis URL is wrapped in secrecy::SecretString since it may carry a
//! password.

use crate::error::{Error, Result};
use secrecy::{ExposeSecret, SecretString};

/// Where the Redis client connects when `REDIS_URL` is not set.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/";

/// Key prefix the queue service uses for all of its keys.
pub const DEFAULT_QUEUE_PREFIX: &str = "q";

const REDIS_SCHEMES: &[&str] = &["redis://", "rediss://", "redis+unix://", "unix://"];

#[derive(Debug)]
pub struct Config {
    pub redis_url: SecretString,
    pub queue_prefix: String,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let redis_url = optional_var("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());
        if !REDIS_SCHEMES
            .iter()
            .any(|scheme| redis_url.starts_with(scheme))
        {
            return Err(Error::Config(
                "REDIS_URL must use the redis://, rediss:// or unix:// scheme".to_string(),
            ));
        }

        let queue_prefix =
            optional_var("QUEUE_PREFIX").unwrap_or_else(|| DEFAULT_QUEUE_PREFIX.to_string());
        if queue_prefix.contains(':') {
            return Err(Error::Config(format!(
                "QUEUE_PREFIX must not contain ':' (got {queue_prefix:?})"
            )));
        }

        Ok(Self {
            redis_url: SecretString::from(redis_url),
            queue_prefix,
            otel_endpoint: optional_var("OTEL_ENDPOINT"),
            log_level: optional_var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// The Redis URL, for handing to the client.
    pub fn redis_url(&self) -> &str {
        self.redis_url.expose_secret()
    }
}

/// Reads `name`, treating an empty value the same as an unset one.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
