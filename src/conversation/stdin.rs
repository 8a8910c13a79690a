use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

use super::{listener::InputService, InputError};

/// Reads answers line by line. Generic over the reader so that tests can feed it from memory.
pub struct LineInput<R> {
    lines: Lines<R>,
}

pub type StdinService = LineInput<BufReader<Stdin>>;

impl StdinService {
    pub fn stdin() -> Self {
        LineInput::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> LineInput<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> InputService for LineInput<R> {
    async fn read_line(&mut self, timeout: Duration) -> Result<String, InputError> {
        // `next_line` is cancel safe, a line that arrives after the timeout is kept for the next
        // attempt.
        match tokio::time::timeout(timeout, self.lines.next_line()).await {
            Err(_) => Err(InputError::Timeout(timeout)),
            Ok(Err(e)) => Err(InputError::Io(e)),
            Ok(Ok(None)) => Err(InputError::Closed),
            Ok(Ok(Some(line))) => Ok(line.trim().to_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;
    use tokio::io::{AsyncWriteExt, BufReader};

    use crate::conversation::{listener::InputService, InputError};

    use super::LineInput;

    #[tokio::test]
    async fn test_reads_trimmed_lines_until_closed() -> Result<()> {
        let mut input = LineInput::new(BufReader::new("  Books \n\n3\n".as_bytes()));
        let timeout = Duration::from_secs(1);

        assert_eq!(input.read_line(timeout).await?, "Books");
        assert_eq!(input.read_line(timeout).await?, "");
        assert_eq!(input.read_line(timeout).await?, "3");
        assert!(matches!(input.read_line(timeout).await, Err(InputError::Closed)));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_and_keeps_late_line() -> Result<()> {
        let (reader, mut writer) = tokio::io::duplex(64);
        let mut input = LineInput::new(BufReader::new(reader));

        let result = input.read_line(Duration::from_secs(60)).await;
        assert!(matches!(result, Err(InputError::Timeout(d)) if d == Duration::from_secs(60)));

        writer.write_all(b"late\n").await?;
        assert_eq!(input.read_line(Duration::from_secs(60)).await?, "late");
        Ok(())
    }
}
