//! In-memory [`HistoryStorage`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chatdash_core::{ChatError, HistoryStorage, Result};
use tokio::sync::Mutex;

use super::validate_key;

/// Volatile key-value store.
///
/// Used for `--in-memory` runs and as a test double: reads and writes can be
/// made to fail on demand, and the number of successful writes is counted.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent `get` calls fail (or succeed again).
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent `set` and `remove` calls fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `set` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Raw access for seeding records.
    pub async fn insert_raw(&self, key: &str, value: &str) {
        self.records
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(ChatError::storage("storage is read-only"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl HistoryStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ChatError::storage("storage is unreadable"));
        }
        Ok(self.records.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.check_writable()?;
        self.records
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.check_writable()?;
        self.records.lock().await.remove(key);
        Ok(())
    }
}
