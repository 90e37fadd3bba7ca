//! Durable storage trait.
//!
//! Defines the key-value interface the history store persists through.

use async_trait::async_trait;

use crate::error::Result;

/// An abstract key-value store for durable records.
///
/// Values are opaque strings (the history store writes JSON). Implementations
/// decide where the data lives: files, memory, a browser-like origin store.
///
/// # Implementation Notes
///
/// - `remove` on an absent key must succeed.
/// - A successful `set` must be visible to the next `get`, including after
///   a process restart for durable backends.
#[async_trait]
pub trait HistoryStorage: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))`: Record found
    /// - `Ok(None)`: No record under this key
    /// - `Err(_)`: The backend could not be read
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the value stored under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Deletes the record under `key` (or does nothing if there is none).
    async fn remove(&self, key: &str) -> Result<()>;
}
