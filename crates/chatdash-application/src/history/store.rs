//! Ordered chat history with durable persistence.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chatdash_core::{AttachmentStore, ChatMessage, HistoryStorage, Notifier, Result};
use chatdash_infrastructure::{decode_history, encode_history};

use super::writer::{PersistCommand, PersistWriter};

#[derive(Default)]
struct HistoryState {
    messages: Vec<ChatMessage>,
    /// Bumped on every mutation that must reach storage.
    revision: u64,
}

/// Single source of truth for the message sequence.
///
/// Mutations update memory synchronously and queue the resulting snapshot
/// for the background writer. `flush` is the point at which the durable
/// record is known to match memory.
pub struct HistoryStore {
    key: String,
    storage: Arc<dyn HistoryStorage>,
    attachments: Arc<AttachmentStore>,
    state: Mutex<HistoryState>,
    writer: PersistWriter,
}

impl HistoryStore {
    /// Creates an empty store persisting under `key`.
    ///
    /// Must be called within a Tokio runtime (the writer task is spawned here).
    /// Call [`HistoryStore::load`] to restore what is already stored.
    pub fn new(
        storage: Arc<dyn HistoryStorage>,
        attachments: Arc<AttachmentStore>,
        key: impl Into<String>,
        notifier: Notifier,
    ) -> Self {
        let key = key.into();
        let writer = PersistWriter::spawn(storage.clone(), key.clone(), notifier);
        Self {
            key,
            storage,
            attachments,
            state: Mutex::new(HistoryState::default()),
            writer,
        }
    }

    fn state(&self) -> MutexGuard<'_, HistoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn attachments(&self) -> &Arc<AttachmentStore> {
        &self.attachments
    }

    /// Appends `message` and schedules persistence of the whole sequence.
    ///
    /// Returns the updated sequence immediately; storage failures are
    /// reported by the writer, never to the caller.
    ///
    /// Earlier messages whose handle is no longer live (e.g. superseded by a
    /// handle minted under the same name) lose their `file_url`.
    pub fn append(&self, message: ChatMessage) -> Vec<ChatMessage> {
        let mut state = self.state();
        if message.file_url.is_some() {
            for earlier in state.messages.iter_mut() {
                if earlier
                    .file_url
                    .as_ref()
                    .is_some_and(|handle| !self.attachments.is_live(handle))
                {
                    earlier.file_url = None;
                }
            }
        }
        state.messages.push(message);
        self.persist(&mut state);
        state.messages.clone()
    }

    /// Empties the history, deletes the durable record and revokes every
    /// attachment handle.
    ///
    /// Returns once the removal has been applied. Snapshots queued before the
    /// clear are superseded and never written. A failed removal is reported
    /// by the writer like any other write failure; the in-memory history is
    /// empty either way. Errors only if the writer is gone.
    pub async fn clear(&self) -> Result<()> {
        let revision = {
            let mut state = self.state();
            state.messages.clear();
            state.revision += 1;
            self.writer.submit(state.revision, PersistCommand::Remove);
            state.revision
        };

        let revoked = self.attachments.revoke_all();
        tracing::info!(key = %self.key, revoked, "Cleared chat history");

        let completed = self.writer.wait_for(revision).await?;
        match completed.error {
            Some(e) if completed.revision == revision => {
                tracing::warn!(key = %self.key, "Chat history record was not removed: {}", e);
            }
            _ => {}
        }
        Ok(())
    }

    /// Restores the history from storage, replacing the in-memory sequence.
    ///
    /// Missing, unreadable and malformed records all restore as an empty
    /// history; a malformed record is deleted. Handles are keyed by name, so
    /// only the most recent message carrying a given attachment name gets a
    /// freshly minted handle; earlier ones restore without `file_url`.
    pub async fn load(&self) -> Vec<ChatMessage> {
        // Anything still queued must land before we read it back.
        if let Err(e) = self.flush().await {
            tracing::warn!(key = %self.key, "Flush before load failed: {}", e);
        }

        let mut messages = match self.storage.get(&self.key).await {
            Ok(Some(raw)) => match decode_history(&raw) {
                Ok(messages) => messages,
                Err(e) => {
                    tracing::warn!(key = %self.key, "Discarding malformed chat history: {}", e);
                    if let Err(e) = self.storage.remove(&self.key).await {
                        tracing::error!(key = %self.key, "Failed to remove malformed chat history: {}", e);
                    }
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(key = %self.key, "Failed to read chat history: {}", e);
                Vec::new()
            }
        };

        // Handles from an earlier load are superseded by the ones minted below.
        self.attachments.revoke_all();
        let mut minted = HashSet::new();
        for message in messages.iter_mut().rev() {
            let handle = match message.durable_attachment() {
                Some((name, content)) if minted.insert(name.to_string()) => {
                    Some(self.attachments.mint(name, content))
                }
                _ => None,
            };
            message.file_url = handle;
        }
        let restored = minted.len();

        tracing::info!(
            key = %self.key,
            count = messages.len(),
            attachments = restored,
            "Loaded chat history"
        );

        let mut state = self.state();
        state.messages = messages;
        state.messages.clone()
    }

    /// Waits until every queued write has been applied.
    ///
    /// Write failures are reported through the notifier, not here.
    pub async fn flush(&self) -> Result<()> {
        let revision = self.state().revision;
        if revision == 0 {
            return Ok(());
        }
        self.writer.wait_for(revision).await.map(|_| ())
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state().messages.clone()
    }

    pub fn get(&self, index: usize) -> Option<ChatMessage> {
        self.state().messages.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.state().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self, state: &mut HistoryState) {
        match encode_history(&state.messages) {
            Ok(raw) => {
                state.revision += 1;
                self.writer
                    .submit(state.revision, PersistCommand::Write(raw.into()));
            }
            Err(e) => {
                // Not reachable with string-only fields, but never panic here.
                tracing::error!(key = %self.key, "Failed to encode chat history: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("key", &self.key)
            .field("len", &self.len())
            .finish()
    }
}
