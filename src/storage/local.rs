//! Local filesystem state storage.
//!
//! Writes go to a sibling `.tmp` file which is then renamed over the target,
//! so an interrupted write never leaves a truncated state file behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::{NotificationState, StateFile, StateStorage};

/// JSON state file on local disk.
#[derive(Debug, Clone)]
pub struct LocalStateStore {
    path: PathBuf,
}

impl LocalStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Read bytes, returning None if the file doesn't exist.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl StateStorage for LocalStateStore {
    async fn load(&self) -> Result<NotificationState> {
        let Some(bytes) = self.read_bytes().await? else {
            log::debug!("No state file at {}; starting empty", self.path.display());
            return Ok(NotificationState::new());
        };

        let file: StateFile = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::state(format!("{} is not a valid state file: {e}", self.path.display()))
        })?;
        Ok(NotificationState::from(file))
    }

    async fn save(&self, state: &NotificationState) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&StateFile::from(state))?;
        self.write_bytes(&bytes).await?;
        log::debug!(
            "Saved {} notified key(s) to {}",
            state.len(),
            self.path.display()
        );
        Ok(())
    }
}
