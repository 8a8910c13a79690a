//! Everything needed to talk to the user: a [Messenger](messenger::Messenger) for output and a
//! [UserListener](listener::UserListener) for validated input, bundled in a [Conversation].

pub mod listener;
pub mod messenger;
pub mod stdin;

use std::{sync::Arc, time::Duration};

use listener::UserListener;
use messenger::{Messenger, MessengerError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("timed out after {0:?} waiting for input")]
    Timeout(Duration),
    #[error("input was closed")]
    Closed,
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Rejected(String),
    #[error("failed after {attempts} attempts, last error: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<InputError>,
    },
}

/// Limits applied to every question asked during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputLimits {
    pub response_wait: Duration,
    pub max_retries: u32,
}

pub struct Conversation {
    messenger: Arc<dyn Messenger>,
    listener: UserListener,
    limits: InputLimits,
}

impl Conversation {
    pub fn new(messenger: Arc<dyn Messenger>, listener: UserListener, limits: InputLimits) -> Self {
        Self {
            messenger,
            listener,
            limits,
        }
    }

    pub async fn say(&self, text: &str) -> Result<(), MessengerError> {
        self.messenger.send(text).await
    }

    /// Waits for an answer accepted by `validator`, using the configured limits.
    pub async fn ask(
        &mut self,
        validator: impl Fn(&str) -> Result<(), String>,
    ) -> Result<String, InputError> {
        self.ask_with_retries(self.limits.max_retries, validator).await
    }

    pub async fn ask_with_retries(
        &mut self,
        max_retries: u32,
        validator: impl Fn(&str) -> Result<(), String>,
    ) -> Result<String, InputError> {
        self.listener
            .request_input(self.limits.response_wait, max_retries, validator)
            .await
    }
}
