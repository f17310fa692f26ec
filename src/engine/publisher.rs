//! Publisher: sends a fixed schedule of messages, timed from connection.

use std::io::Write;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{info, warn};

use super::CONNECTED_LINE;
use crate::broker::Publish;
use crate::console::Console;
use crate::error::Result;
use crate::model::KILL_SERVER;

/// One message and how long after connecting it goes out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduled {
    pub message: String,
    pub delay: Duration,
}

impl Scheduled {
    pub fn new(message: impl Into<String>, delay: Duration) -> Self {
        Self {
            message: message.into(),
            delay,
        }
    }
}

/// The course announcements, with the sentinel third.
pub fn course_schedule() -> Vec<Scheduled> {
    vec![
        Scheduled::new(
            "Holberton Student #1 starts course",
            Duration::from_millis(100),
        ),
        Scheduled::new(
            "Holberton Student #2 starts course",
            Duration::from_millis(200),
        ),
        Scheduled::new(KILL_SERVER, Duration::from_millis(300)),
        Scheduled::new(
            "Holberton Student #3 starts course",
            Duration::from_millis(400),
        ),
    ]
}

pub struct Publisher<P> {
    conn: P,
    channel: String,
    schedule: Vec<Scheduled>,
}

impl<P: Publish + Clone + Send + 'static> Publisher<P> {
    /// The schedule is sorted by delay; entries with equal delays keep
    /// their given order.
    pub fn new(conn: P, channel: impl Into<String>, mut schedule: Vec<Scheduled>) -> Self {
        schedule.sort_by_key(|entry| entry.delay);
        Self {
            conn,
            channel: channel.into(),
            schedule,
        }
    }

    pub fn schedule(&self) -> &[Scheduled] {
        &self.schedule
    }

    /// Run the schedule to the end, then hand the connection back.
    ///
    /// Every entry fires at `connected_at + delay` on its own task, so a
    /// slow reply never holds back the entries after it. Delays are
    /// minimums. Failed publishes are logged once every entry has been
    /// sent.
    pub async fn run<O: Write, E: Write>(self, console: &mut Console<O, E>) -> Result<P> {
        let connected_at = Instant::now();
        console.line(CONNECTED_LINE)?;
        info!(channel = %self.channel, entries = self.schedule.len(), "publisher started");

        let mut in_flight = JoinSet::new();
        for entry in &self.schedule {
            tokio::time::sleep_until(connected_at + entry.delay).await;
            console.line(format_args!("About to send {}", entry.message))?;

            let mut conn = self.conn.clone();
            let channel = self.channel.clone();
            let message = entry.message.clone();
            in_flight.spawn(async move {
                let result = conn.publish(&channel, &message).await;
                (message, result)
            });
        }

        while let Some(joined) = in_flight.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((message, Err(e))) => {
                    warn!(channel = %self.channel, %message, "publish failed: {e}");
                }
                Err(e) => warn!(channel = %self.channel, "publish task failed: {e}"),
            }
        }

        info!("publisher finished");
        Ok(self.conn)
    }
}
