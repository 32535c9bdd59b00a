use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::UploadTask;

/// Persistence seam for queue metadata. File bodies never pass through here;
/// which records survive a restart is decided by the queue, not the store.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Replace the stored snapshot with the given records.
    async fn save(&self, tasks: &[UploadTask]) -> Result<()>;

    /// Load the last stored snapshot; an absent snapshot is an empty one.
    async fn load(&self) -> Result<Vec<UploadTask>>;
}

/// One JSON array in one file, rewritten whole on every save.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn save(&self, tasks: &[UploadTask]) -> Result<()> {
        let data = serde_json::to_string_pretty(tasks)?;
        tokio::fs::write(&self.path, data).await?;

        Ok(())
    }

    async fn load(&self) -> Result<Vec<UploadTask>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let data = tokio::fs::read_to_string(&self.path).await?;
        let tasks = serde_json::from_str(&data)?;

        Ok(tasks)
    }
}
