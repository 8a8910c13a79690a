//! Persistence of the two artifacts the assistant owns:
//!  - The schema, a JSON document with the whole category tree. It is always replaced as a whole.
//!  - The data log, an append-only file with one [RecordedActivity] per line.

pub mod data_store;
pub mod entities;
pub mod schema_store;

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entities::RecordedActivity;
use thiserror::Error;

use crate::tree::snapshot::Snapshot;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no schema found at {path:?}")]
    NotFound { path: PathBuf },
    #[error("schema already exists at {path:?}")]
    AlreadyExists { path: PathBuf },
    #[error("schema io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("schema is not a nested map of names: {0}")]
    Format(#[from] serde_json::Error),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Reads the persisted schema. [StoreError::NotFound] means there's nothing to read yet.
    async fn load(&self) -> Result<Snapshot, StoreError>;

    /// Replaces the persisted schema. Without `force` an existing schema is left untouched and
    /// [StoreError::AlreadyExists] is returned.
    async fn dump(&self, snapshot: &Snapshot, force: bool) -> Result<(), StoreError>;

    /// Persists and returns the built-in default schema.
    async fn init(&self) -> Result<Snapshot, StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn append(&self, record: &RecordedActivity) -> Result<()>;

    /// Timestamp of the newest record, if there is one.
    async fn last_recorded_at(&self) -> Result<Option<DateTime<Utc>>>;

    /// Up to `count` newest records, oldest first.
    async fn recent(&self, count: usize) -> Result<Vec<RecordedActivity>>;
}
