//! File-backed [`HistoryStorage`].
//!
//! Directory structure:
//! ```text
//! base_dir/
//! ├── chat_history.json
//! └── <other_key>.json
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chatdash_core::{ChatError, HistoryStorage, Result};
use tokio::fs;

use super::atomic_file::AtomicFile;
use super::validate_key;

/// Stores each key in its own JSON file under `base_dir`.
///
/// File operations run on the blocking pool so the caller's runtime thread
/// never waits on fsync or the file lock.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    base_dir: PathBuf,
}

impl JsonFileStorage {
    /// Creates the storage, making sure `base_dir` exists.
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).await.map_err(|e| {
            ChatError::io(format!(
                "Failed to create storage directory {}: {}",
                base_dir.display(),
                e
            ))
        })?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the file backing `key`.
    pub fn record_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.base_dir.join(format!("{}.json", key)))
    }

    async fn run_blocking<T, F>(&self, key: &str, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(AtomicFile) -> Result<T> + Send + 'static,
    {
        let file = AtomicFile::new(self.record_path(key)?);
        tokio::task::spawn_blocking(move || op(file))
            .await
            .map_err(|e| ChatError::internal(format!("Failed to join task: {}", e)))?
    }
}

#[async_trait]
impl HistoryStorage for JsonFileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.run_blocking(key, |file| Ok(file.load()?)).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let bytes = value.len();
        let value = value.to_string();
        self.run_blocking(key, move |file| Ok(file.save(&value)?))
            .await?;
        tracing::debug!(key, bytes, "Record written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.run_blocking(key, |file| Ok(file.remove()?)).await?;
        tracing::debug!(key, "Record removed");
        Ok(())
    }
}
