use ansi_term::Colour;
use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
#[error("failed to deliver message: {0}")]
pub struct MessengerError(#[from] pub std::io::Error);

/// Anything able to show a message to the user. Shared between the session and the reminder
/// task, so implementations have to be usable from both at once.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), MessengerError>;
}

/// Prints messages to stdout. Lines starting with `ERROR:` are highlighted.
pub struct ConsoleMessenger {
    colored: bool,
}

impl ConsoleMessenger {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    fn decorate(&self, text: &str) -> String {
        if self.colored && text.starts_with("ERROR:") {
            Colour::Red.bold().paint(text).to_string()
        } else {
            text.to_owned()
        }
    }
}

#[async_trait]
impl Messenger for ConsoleMessenger {
    async fn send(&self, text: &str) -> Result<(), MessengerError> {
        let mut line = self.decorate(text);
        if !line.ends_with('\n') {
            line.push('\n');
        }
        let mut stdout = tokio::io::stdout();
        stdout.write_all(line.as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }
}
