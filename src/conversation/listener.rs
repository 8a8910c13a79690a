use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{messenger::Messenger, InputError};

/// One raw attempt at reading a line from the user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InputService: Send {
    async fn read_line(&mut self, timeout: Duration) -> Result<String, InputError>;
}

/// Wraps an [InputService] with validation and a bounded number of retries.
pub struct UserListener {
    service: Box<dyn InputService>,
    feedback: Arc<dyn Messenger>,
}

impl UserListener {
    pub fn new(service: Box<dyn InputService>, feedback: Arc<dyn Messenger>) -> Self {
        Self { service, feedback }
    }

    /// Tries to get input at most `max_retries + 1` times, with `timeout` applied to each attempt
    /// separately. A failed read and a rejection by `validator` both use up an attempt. End of
    /// input is returned right away since nothing more can arrive.
    pub async fn request_input(
        &mut self,
        timeout: Duration,
        max_retries: u32,
        validator: impl Fn(&str) -> Result<(), String>,
    ) -> Result<String, InputError> {
        let attempts = max_retries.saturating_add(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            let error = match self.service.read_line(timeout).await {
                Ok(text) => match validator(&text) {
                    Ok(()) => {
                        debug!("Accepted input {text:?} on attempt {attempt}");
                        return Ok(text);
                    }
                    Err(reason) => {
                        warn!("Rejected input {text:?}: {reason}");
                        // Best effort.
                        let feedback = format!("Invalid input: {reason}");
                        if let Err(e) = self.feedback.send(&feedback).await {
                            warn!("Couldn't report rejected input {e:?}");
                        }
                        InputError::Rejected(reason)
                    }
                },
                Err(InputError::Closed) => return Err(InputError::Closed),
                Err(e) => {
                    warn!("Failed to read input on attempt {attempt}: {e}");
                    e
                }
            };
            last_error = Some(error);
        }

        Err(InputError::Exhausted {
            attempts,
            last: Box::new(last_error.unwrap_or(InputError::Closed)),
        })
    }
}
