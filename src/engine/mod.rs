//! The three processes: publisher, subscriber and job creator.
//!
//! Each one is handed an already-established connection. Connecting is the
//! caller's job; [`connected`] turns a failed attempt into the one error line
//! the processes print.

pub mod creator;
pub mod publisher;
pub mod subscriber;

pub use creator::{JobCreator, JobOutcome};
pub use publisher::{Publisher, Scheduled};
pub use subscriber::Subscriber;

use std::io::Write;

use crate::console::Console;
use crate::error::{Error, Result};
use tracing::error;

/// Printed once a broker connection is established.
pub const CONNECTED_LINE: &str = "Redis client connected to the server";

/// Unwrap a connection attempt. On failure, print the error line and return
/// `None` so the caller can stop without retrying.
pub fn connected<T, O: Write, E: Write>(
    attempt: Result<T>,
    console: &mut Console<O, E>,
) -> Result<Option<T>> {
    match attempt {
        Ok(conn) => Ok(Some(conn)),
        Err(e @ Error::Connection(_)) => {
            error!("connection failed: {e}");
            console.error(&e)?;
            Ok(None)
        }
        Err(e) => {
            error!("connection failed: {e}");
            console.error(format!("Redis client not connected to the server: {e}"))?;
            Ok(None)
        }
    }
}
