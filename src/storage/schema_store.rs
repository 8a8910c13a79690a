use std::{io::ErrorKind, path::PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::tree::snapshot::Snapshot;

use super::{SchemaStore, StoreError};

/// Schema written by [LocalSchemaStore::init] for users that start from scratch.
pub const DEFAULT_SCHEMA: &str = r#"{
    "Chores": null,
    "Exercise": null,
    "Leisure": {"Games": null, "Reading": null},
    "Sleep": null,
    "Work": {"Focus": null, "Meetings": null}
}"#;

/// Keeps the schema as a JSON file on the local disk.
pub struct LocalSchemaStore {
    path: PathBuf,
}

impl LocalSchemaStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn temporary_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

pub fn default_schema() -> Result<Snapshot, StoreError> {
    Ok(serde_json::from_str(DEFAULT_SCHEMA)?)
}

#[async_trait]
impl SchemaStore for LocalSchemaStore {
    async fn load(&self) -> Result<Snapshot, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    path: self.path.clone(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        let snapshot = serde_json::from_slice(&bytes)?;
        debug!("Loaded schema from {:?}", self.path);
        Ok(snapshot)
    }

    async fn dump(&self, snapshot: &Snapshot, force: bool) -> Result<(), StoreError> {
        if !force && tokio::fs::try_exists(&self.path).await? {
            return Err(StoreError::AlreadyExists {
                path: self.path.clone(),
            });
        }
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Replace as a whole, never leave a partially written schema behind.
        let temporary = self.temporary_path();
        tokio::fs::write(&temporary, serde_json::to_vec_pretty(snapshot)?).await?;
        tokio::fs::rename(&temporary, &self.path).await?;

        info!("Saved schema to {:?}", self.path);
        Ok(())
    }

    async fn init(&self) -> Result<Snapshot, StoreError> {
        let snapshot = default_schema()?;
        self.dump(&snapshot, false).await?;
        Ok(snapshot)
    }
}
