use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{conversation::messenger::Messenger, utils::clock::Clock};

pub const REMINDER_TEXT: &str = "Reminder: what are you doing? Answer the question above.";

/// Periodically nudges the user to record what they are doing.
///
/// The scheduler only ever talks through its [Messenger] and an optional external command. It is
/// never handed the category tree or the watermark, which is what lets it run next to the session
/// without any locking.
pub struct ReminderScheduler {
    interval: Duration,
    messenger: Arc<dyn Messenger>,
    clock: Arc<dyn Clock>,
    command: Option<PathBuf>,
    shutdown: CancellationToken,
}

impl ReminderScheduler {
    /// Returns [None] for a zero interval, reminders are then disabled for the whole run.
    pub fn new(
        interval: Duration,
        messenger: Arc<dyn Messenger>,
        clock: Arc<dyn Clock>,
        command: Option<PathBuf>,
        shutdown: CancellationToken,
    ) -> Option<Self> {
        if interval.is_zero() {
            info!("Reminders are disabled");
            return None;
        }
        Some(Self {
            interval,
            messenger,
            clock,
            command,
            shutdown,
        })
    }

    pub async fn run(self) -> Result<()> {
        let mut reminder_point = self.clock.instant();
        loop {
            reminder_point += self.interval;

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.clock.sleep_until(reminder_point) => ()
            }

            self.remind().await;
        }
    }

    async fn remind(&self) {
        debug!("Sending reminder");
        if let Err(e) = self.messenger.send(REMINDER_TEXT).await {
            warn!("Couldn't deliver reminder {e:?}");
        }

        let Some(command) = &self.command else {
            return;
        };
        match tokio::process::Command::new(command).status().await {
            Ok(status) if status.success() => {}
            Ok(status) => warn!("Reminder command {command:?} exited with {status}"),
            Err(e) => warn!("Failed to execute reminder command {command:?}: {e}"),
        }
    }
}
