//! Atomic text file operations.
//!
//! Provides a thin layer for safe concurrent access to a single record file.

use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur during atomic file operations.
#[derive(Debug, Error)]
pub enum AtomicFileError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// File locking error.
    #[error("Lock error: {0}")]
    Lock(String),
    /// The path cannot host a temp file next to it.
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

impl From<AtomicFileError> for chatdash_core::ChatError {
    fn from(err: AtomicFileError) -> Self {
        match err {
            AtomicFileError::Io(e) => e.into(),
            other => chatdash_core::ChatError::storage(other.to_string()),
        }
    }
}

/// A handle to a text file that is replaced atomically.
///
/// Provides:
/// - **Atomicity**: Writes go to a temp file that is renamed over the target
/// - **Isolation**: An exclusive lock file serializes writers
/// - **Durability**: Explicit fsync before rename
pub struct AtomicFile {
    path: PathBuf,
}

impl AtomicFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(String))`: File exists and is not blank
    /// - `Ok(None)`: File doesn't exist or is empty
    /// - `Err`: Failed to read the file
    pub fn load(&self) -> Result<Option<String>, AtomicFileError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(None),
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces the file content atomically.
    pub fn save(&self, content: &str) -> Result<(), AtomicFileError> {
        let _lock = FileLock::acquire(&self.path)?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(content.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Deletes the file. A missing file is not an error.
    pub fn remove(&self) -> Result<(), AtomicFileError> {
        let _lock = FileLock::acquire(&self.path)?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn temp_path(&self) -> Result<PathBuf, AtomicFileError> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| AtomicFileError::InvalidPath("no parent directory".to_string()))?;
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| AtomicFileError::InvalidPath("no file name".to_string()))?;

        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }
}

/// Exclusive lock held for the duration of a write.
///
/// The lock file itself is never deleted: every writer must contend on the
/// same inode.
struct FileLock {
    file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, AtomicFileError> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        fs2::FileExt::lock_exclusive(&file)
            .map_err(|e| AtomicFileError::Lock(format!("Failed to acquire lock: {}", e)))?;

        Ok(FileLock { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicFile::new(temp_dir.path().join("chat_history.json"));

        file.save("[1,2,3]").unwrap();
        assert_eq!(file.load().unwrap().as_deref(), Some("[1,2,3]"));

        file.save("[]").unwrap();
        assert_eq!(file.load().unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_load_missing_or_blank() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("blank.json");
        let file = AtomicFile::new(path.clone());

        assert!(file.load().unwrap().is_none());

        fs::write(&path, "  \n").unwrap();
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("chat_history.json");
        let file = AtomicFile::new(path.clone());

        file.save("{}").unwrap();

        assert!(path.exists());
        assert!(!temp_dir.path().join(".chat_history.json.tmp").exists());
    }

    #[test]
    fn test_lock_file_is_kept_between_writes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("chat_history.json");
        let lock_path = temp_dir.path().join("chat_history.lock");

        AtomicFile::new(path.clone()).save("[1]").unwrap();
        assert!(lock_path.exists());

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let file = AtomicFile::new(path.clone());
                std::thread::spawn(move || file.save(&format!("[{}]", i)))
            })
            .collect();
        for writer in writers {
            writer.join().unwrap().unwrap();
        }

        assert!(lock_path.exists());
        let content = AtomicFile::new(path).load().unwrap().unwrap();
        assert!(content.starts_with('[') && content.ends_with(']'));
        assert!(!temp_dir.path().join(".chat_history.json.tmp").exists());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("gone.json");
        let file = AtomicFile::new(path.clone());

        file.save("x").unwrap();
        file.remove().unwrap();
        assert!(!path.exists());
        file.remove().unwrap();
    }
}
