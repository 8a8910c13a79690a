use std::{io::ErrorKind, path::PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs4::tokio::AsyncFileExt;
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::fs::operations::read_last_line;

use super::{entities::RecordedActivity, DataStore};

/// Stores records in a single append-only file on the local disk.
pub struct LocalDataStore {
    path: PathBuf,
}

impl LocalDataStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn open_existing(&self) -> Result<Option<File>> {
        match File::open(&self.path).await {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Couldn't open data file {:?}", self.path)),
        }
    }
}

#[async_trait]
impl DataStore for LocalDataStore {
    async fn append(&self, record: &RecordedActivity) -> Result<()> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            info!("No data file found at {:?}. Creating one.", self.path);
        }
        let mut file = File::options()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Couldn't open data file {:?}", self.path))?;

        let mut line = record.to_line();
        line.push('\n');

        file.lock_exclusive()?;
        let result = async {
            file.write_all(line.as_bytes()).await?;
            file.flush().await
        }
        .await;
        file.unlock_async().await?;
        result.context("Couldn't write record")?;

        debug!("Appended record {line:?}");
        Ok(())
    }

    async fn last_recorded_at(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(mut file) = self.open_existing().await? else {
            return Ok(None);
        };
        file.lock_shared()?;
        let line = read_last_line(&mut file, &mut vec![0; 1024]).await;
        file.unlock_async().await?;

        let Some(line) = line? else {
            return Ok(None);
        };
        match RecordedActivity::parse_line(&line) {
            Ok(record) => Ok(Some(record.timestamp)),
            Err(e) => {
                // Might happen if a write was cut off.
                warn!("Last record {line:?} in {:?} is corrupted: {e}", self.path);
                Ok(None)
            }
        }
    }

    async fn recent(&self, count: usize) -> Result<Vec<RecordedActivity>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e).context("Couldn't read data file"),
        };

        let mut records = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match RecordedActivity::parse_line(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping illegal record {line:?}: {e}");
                    None
                }
            })
            .collect::<Vec<_>>();

        let skip = records.len().saturating_sub(count);
        records.drain(..skip);
        Ok(records)
    }
}
