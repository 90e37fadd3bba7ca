//! Background persistence writer.
//!
//! History mutations hand their encoded snapshot to a single writer task
//! through a `watch` channel. Only the newest snapshot is kept, so a burst of
//! appends collapses into fewer writes, and since one task performs every
//! write they can never land out of order.

use std::sync::Arc;

use chatdash_core::{ChatError, HistoryStorage, Notifier, Result};
use tokio::sync::watch;

/// What the durable record should become.
#[derive(Debug, Clone)]
pub(crate) enum PersistCommand {
    Write(Arc<str>),
    Remove,
}

#[derive(Debug, Clone, Default)]
struct Request {
    revision: u64,
    command: Option<PersistCommand>,
}

/// Last revision the writer has applied and how it went.
#[derive(Debug, Clone, Default)]
pub(crate) struct Completed {
    pub revision: u64,
    pub error: Option<ChatError>,
}

pub(crate) struct PersistWriter {
    requests: watch::Sender<Request>,
    completed: watch::Receiver<Completed>,
}

impl PersistWriter {
    /// Spawns the writer task. Must be called within a Tokio runtime.
    pub fn spawn(storage: Arc<dyn HistoryStorage>, key: String, notifier: Notifier) -> Self {
        let (requests, request_rx) = watch::channel(Request::default());
        let (completed_tx, completed) = watch::channel(Completed::default());

        // Dropping the writer closes `requests`; the task applies whatever is
        // still unseen and then exits.
        tokio::spawn(run(storage, key, notifier, request_rx, completed_tx));

        Self {
            requests,
            completed,
        }
    }

    /// Replaces any not-yet-applied request with `command`.
    pub fn submit(&self, revision: u64, command: PersistCommand) {
        self.requests.send_replace(Request {
            revision,
            command: Some(command),
        });
    }

    /// Waits until `revision` (or a newer one) has been applied.
    pub async fn wait_for(&self, revision: u64) -> Result<Completed> {
        let mut completed = self.completed.clone();
        let done = completed
            .wait_for(|c| c.revision >= revision)
            .await
            .map_err(|_| ChatError::internal("persistence writer stopped"))?;
        Ok(done.clone())
    }
}

async fn run(
    storage: Arc<dyn HistoryStorage>,
    key: String,
    notifier: Notifier,
    mut requests: watch::Receiver<Request>,
    completed: watch::Sender<Completed>,
) {
    while requests.changed().await.is_ok() {
        let request = requests.borrow_and_update().clone();
        let Some(command) = request.command else {
            continue;
        };

        let result = match &command {
            PersistCommand::Write(raw) => storage.set(&key, raw).await,
            PersistCommand::Remove => storage.remove(&key).await,
        };

        let error = match result {
            Ok(()) => {
                tracing::trace!(key = %key, revision = request.revision, "Persisted chat history");
                None
            }
            Err(e) => {
                tracing::error!(key = %key, revision = request.revision, "Failed to persist chat history: {}", e);
                notifier.warning(format!("Failed to save chat history: {}", e));
                Some(e)
            }
        };

        completed.send_replace(Completed {
            revision: request.revision,
            error,
        });
    }

    tracing::debug!(key = %key, "Persistence writer stopped");
}
