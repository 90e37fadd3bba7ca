//! Chat session controller.
//!
//! Drives one round-trip at a time: the user's message is appended, the
//! session goes `Pending`, and a background task appends the reply after the
//! configured delay. The reply task is bound to the session through a
//! cancellation token so a torn-down session is never mutated.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chatdash_core::{
    Attachment, AttachmentStore, ChatConfig, ChatError, ChatMessage, HistoryStorage, Notifier,
    Result,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::responder::Responder;
use crate::history::HistoryStore;

const RESPONSE_READY: &str = "Message processed and file generated!";
const HISTORY_CLEARED: &str = "Chat history cleared";
const DOWNLOAD_FAILED: &str = "Failed to download file";

/// Whether a reply is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Pending,
}

/// Result of [`ChatSession::send_user_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The message was appended and a reply is on its way.
    Sent,
    /// The input was blank; nothing happened.
    Ignored,
    /// A reply is still pending; the input was rejected.
    Busy,
    /// The session has been shut down.
    Closed,
}

struct SessionInner {
    history: HistoryStore,
    attachments: Arc<AttachmentStore>,
    responder: Arc<dyn Responder>,
    notifier: Notifier,
    response_delay: Duration,
    state: watch::Sender<SessionState>,
    cancel: CancellationToken,
}

/// One in-memory chat session, from load to shutdown.
pub struct ChatSession {
    inner: Arc<SessionInner>,
    reply_task: Mutex<Option<JoinHandle<()>>>,
}

impl ChatSession {
    /// Opens a session and restores the stored history.
    ///
    /// Must be called within a Tokio runtime.
    pub async fn open(
        storage: Arc<dyn HistoryStorage>,
        responder: Arc<dyn Responder>,
        config: &ChatConfig,
        notifier: Notifier,
    ) -> Self {
        let attachments = Arc::new(AttachmentStore::new());
        let history = HistoryStore::new(
            storage,
            attachments.clone(),
            config.storage_key.clone(),
            notifier.clone(),
        );
        history.load().await;

        let (state, _) = watch::channel(SessionState::Idle);

        tracing::info!(
            "[ChatSession] Opened with {} message(s), key={}",
            history.len(),
            config.storage_key
        );

        Self {
            inner: Arc::new(SessionInner {
                history,
                attachments,
                responder,
                notifier,
                response_delay: config.response_delay(),
                state,
                cancel: CancellationToken::new(),
            }),
            reply_task: Mutex::new(None),
        }
    }

    /// Appends the user's message and starts the reply.
    ///
    /// Blank input is ignored and input while a reply is pending is rejected;
    /// neither is reported as an error.
    pub fn send_user_message(&self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Ignored;
        }
        if self.inner.cancel.is_cancelled() {
            return SendOutcome::Closed;
        }

        let acquired = self.inner.state.send_if_modified(|state| {
            if *state == SessionState::Idle {
                *state = SessionState::Pending;
                true
            } else {
                false
            }
        });
        if !acquired {
            tracing::debug!("[ChatSession] Rejected input while a reply is pending");
            return SendOutcome::Busy;
        }

        self.inner.history.append(ChatMessage::user(text));

        let task = tokio::spawn(simulate_response(self.inner.clone()));
        let mut slot = self
            .reply_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(task);

        SendOutcome::Sent
    }

    /// Clears the history and revokes every attachment handle.
    pub async fn clear_history(&self) -> Result<()> {
        let result = self.inner.history.clear().await;
        match &result {
            Ok(()) => self.inner.notifier.success(HISTORY_CLEARED),
            Err(e) => tracing::error!("[ChatSession] Failed to clear history: {}", e),
        }
        result
    }

    /// Reads the attachment of the message at `index` for download.
    ///
    /// A missing or revoked handle is reported to the user and returned.
    pub fn download(&self, index: usize) -> Result<Attachment> {
        let result = self
            .inner
            .history
            .get(index)
            .and_then(|message| message.file_url)
            .ok_or(ChatError::AttachmentMissing { index })
            .and_then(|handle| self.inner.attachments.resolve(&handle));

        if let Err(e) = &result {
            tracing::warn!("[ChatSession] Download of message #{} failed: {}", index, e);
            self.inner.notifier.error(DOWNLOAD_FAILED);
        }
        result
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.inner.history.messages()
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Watches `Idle`/`Pending` transitions (e.g. to disable input).
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Waits until no reply is pending.
    pub async fn wait_idle(&self) {
        let mut state = self.inner.state.subscribe();
        // The sender lives in `inner`, which we hold, so this cannot close.
        let _ = state.wait_for(|s| *s == SessionState::Idle).await;
    }

    pub fn attachments(&self) -> &Arc<AttachmentStore> {
        &self.inner.attachments
    }

    pub fn is_closed(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Tears the session down: stops the pending reply, flushes history and
    /// revokes every handle. Safe to call more than once.
    pub async fn shutdown(&self) -> Result<()> {
        self.inner.cancel.cancel();

        let task = self
            .reply_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            // The task either saw the cancellation or finished its append.
            if let Err(e) = task.await {
                tracing::warn!("[ChatSession] Reply task ended abnormally: {}", e);
            }
        }

        let flushed = self.inner.history.flush().await;
        let revoked = self.inner.attachments.revoke_all();
        tracing::info!("[ChatSession] Shut down, revoked {} handle(s)", revoked);
        flushed
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.inner.cancel.cancel();
        if let Some(task) = self
            .reply_task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        self.inner.attachments.revoke_all();
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("history", &self.inner.history)
            .field("state", &self.state())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Background half of a round-trip: wait, ask the responder, append.
async fn simulate_response(inner: Arc<SessionInner>) {
    tokio::select! {
        _ = inner.cancel.cancelled() => {
            tracing::debug!("[ChatSession] Reply cancelled during delay");
            return;
        }
        _ = tokio::time::sleep(inner.response_delay) => {}
    }

    let history = inner.history.messages();
    let reply = tokio::select! {
        _ = inner.cancel.cancelled() => {
            tracing::debug!("[ChatSession] Reply cancelled while generating");
            return;
        }
        reply = inner.responder.respond(&history) => reply,
    };

    // Liveness check right before touching state.
    if inner.cancel.is_cancelled() {
        return;
    }

    match reply {
        Ok(reply) => {
            let mut message = ChatMessage::system(reply.content);
            if let Some(attachment) = reply.attachment {
                let handle = inner
                    .attachments
                    .mint(&attachment.file_name, &attachment.file_content);
                message = message.with_attachment(
                    attachment.file_name,
                    attachment.file_content,
                    handle,
                );
            }
            inner.history.append(message);
            inner.state.send_replace(SessionState::Idle);
            inner.notifier.success(RESPONSE_READY);
        }
        Err(e) => {
            tracing::error!("[ChatSession] Failed to generate reply: {}", e);
            inner.state.send_replace(SessionState::Idle);
            inner
                .notifier
                .error(format!("Failed to generate response: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::responder::{Reply, SimulatedResponder};
    use async_trait::async_trait;
    use chatdash_core::Notification;
    use chatdash_infrastructure::{MemoryStorage, decode_history};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn fast_config() -> ChatConfig {
        ChatConfig {
            response_delay_ms: 10,
            ..ChatConfig::default()
        }
    }

    async fn open_session(
        storage: Arc<MemoryStorage>,
        config: &ChatConfig,
    ) -> (ChatSession, UnboundedReceiver<Notification>) {
        let (notifier, rx) = Notifier::channel();
        let session = ChatSession::open(
            storage,
            Arc::new(SimulatedResponder::new(config.response.clone())),
            config,
            notifier,
        )
        .await;
        (session, rx)
    }

    struct FailingResponder;

    #[async_trait]
    impl Responder for FailingResponder {
        async fn respond(&self, _history: &[ChatMessage]) -> Result<Reply> {
            Err(ChatError::internal("backend unavailable"))
        }
    }

    #[tokio::test]
    async fn test_hello_round_trip() {
        let storage = Arc::new(MemoryStorage::new());
        let (session, mut notifications) = open_session(storage.clone(), &fast_config()).await;

        assert_eq!(session.send_user_message("hello"), SendOutcome::Sent);
        assert_eq!(session.state(), SessionState::Pending);

        let history = session.messages();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "hello");
        assert!(history[0].is_user);

        session.wait_idle().await;

        let history = session.messages();
        assert_eq!(history.len(), 2);
        let reply = &history[1];
        assert!(!reply.is_user);
        assert_eq!(reply.file_name.as_deref(), Some("response.txt"));
        assert_eq!(reply.file_content.as_deref(), Some("Sample file content"));
        assert!(reply.file_url.is_some());
        assert_eq!(
            notifications.recv().await,
            Some(Notification::Success(RESPONSE_READY.to_string()))
        );

        session.shutdown().await.unwrap();
        let raw = storage.get("chat_history").await.unwrap().unwrap();
        let persisted = decode_history(&raw).unwrap();
        assert_eq!(persisted.len(), 2);
        assert_eq!(persisted[1].file_content.as_deref(), Some("Sample file content"));
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let (session, _rx) = open_session(Arc::new(MemoryStorage::new()), &fast_config()).await;

        assert_eq!(session.send_user_message("   \n\t"), SendOutcome::Ignored);
        assert!(session.messages().is_empty());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_input_is_trimmed() {
        let (session, _rx) = open_session(Arc::new(MemoryStorage::new()), &fast_config()).await;
        session.send_user_message("  spaced out  ");
        assert_eq!(session.messages()[0].content, "spaced out");
    }

    #[tokio::test]
    async fn test_second_send_while_pending_is_rejected() {
        let config = ChatConfig {
            response_delay_ms: 200,
            ..ChatConfig::default()
        };
        let (session, _rx) = open_session(Arc::new(MemoryStorage::new()), &config).await;

        assert_eq!(session.send_user_message("first"), SendOutcome::Sent);
        assert_eq!(session.send_user_message("second"), SendOutcome::Busy);
        assert_eq!(session.messages().len(), 1);

        session.wait_idle().await;
        assert_eq!(session.send_user_message("second"), SendOutcome::Sent);
        session.wait_idle().await;

        let contents: Vec<String> = session
            .messages()
            .into_iter()
            .filter(|m| m.is_user)
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_clear_history_revokes_handles() {
        let storage = Arc::new(MemoryStorage::new());
        let (session, mut notifications) = open_session(storage.clone(), &fast_config()).await;

        session.send_user_message("hello");
        session.wait_idle().await;
        let handle = session.messages()[1].file_url.clone().unwrap();
        let _ = notifications.recv().await;

        session.clear_history().await.unwrap();

        assert!(session.messages().is_empty());
        assert!(!session.attachments().is_live(&handle));
        assert!(storage.get("chat_history").await.unwrap().is_none());
        assert_eq!(
            notifications.recv().await,
            Some(Notification::Success(HISTORY_CLEARED.to_string()))
        );
    }

    #[tokio::test]
    async fn test_download() {
        let (session, mut notifications) =
            open_session(Arc::new(MemoryStorage::new()), &fast_config()).await;
        session.send_user_message("hello");
        session.wait_idle().await;
        let _ = notifications.recv().await;

        let attachment = session.download(1).unwrap();
        assert_eq!(attachment.name, "response.txt");
        assert_eq!(attachment.content, "Sample file content");
        assert_eq!(attachment.mime_type, "text/plain");

        // The user message has nothing to download.
        assert!(matches!(
            session.download(0),
            Err(ChatError::AttachmentMissing { index: 0 })
        ));
        assert_eq!(
            notifications.recv().await,
            Some(Notification::Error(DOWNLOAD_FAILED.to_string()))
        );
    }

    #[tokio::test]
    async fn test_download_of_revoked_handle_fails() {
        let (session, mut notifications) =
            open_session(Arc::new(MemoryStorage::new()), &fast_config()).await;
        session.send_user_message("hello");
        session.wait_idle().await;
        let _ = notifications.recv().await;

        session.attachments().revoke("response.txt");

        assert!(matches!(
            session.download(1),
            Err(ChatError::HandleRevoked { .. })
        ));
        assert_eq!(
            notifications.recv().await,
            Some(Notification::Error(DOWNLOAD_FAILED.to_string()))
        );
    }

    #[tokio::test]
    async fn test_restore_regenerates_handles() {
        let storage = Arc::new(MemoryStorage::new());
        let config = fast_config();
        let old_handle = {
            let (session, _rx) = open_session(storage.clone(), &config).await;
            session.send_user_message("hello");
            session.wait_idle().await;
            let handle = session.messages()[1].file_url.clone().unwrap();
            session.shutdown().await.unwrap();
            handle
        };

        let (session, _rx) = open_session(storage, &config).await;
        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        let new_handle = messages[1].file_url.clone().unwrap();
        assert_ne!(new_handle, old_handle);
        assert_eq!(session.download(1).unwrap().content, "Sample file content");
    }

    #[tokio::test]
    async fn test_repeated_replies_never_expose_dead_handles() {
        let storage = Arc::new(MemoryStorage::new());
        let config = fast_config();
        {
            let (session, _rx) = open_session(storage.clone(), &config).await;
            for text in ["first", "second"] {
                session.send_user_message(text);
                session.wait_idle().await;
            }

            let messages = session.messages();
            assert!(messages[1].file_url.is_none());
            assert!(session.attachments().is_live(messages[3].file_url.as_ref().unwrap()));
            session.shutdown().await.unwrap();
        }

        let (session, mut notifications) = open_session(storage, &config).await;
        let messages = session.messages();
        assert_eq!(messages.len(), 4);
        for message in &messages {
            if let Some(handle) = &message.file_url {
                assert!(session.attachments().is_live(handle));
            }
        }
        // The earlier reply keeps its content but has nothing to download.
        assert_eq!(messages[1].file_content.as_deref(), Some("Sample file content"));
        assert!(messages[1].file_url.is_none());
        assert!(matches!(
            session.download(1),
            Err(ChatError::AttachmentMissing { index: 1 })
        ));
        assert_eq!(
            notifications.recv().await,
            Some(Notification::Error(DOWNLOAD_FAILED.to_string()))
        );
        assert_eq!(session.download(3).unwrap().content, "Sample file content");
    }

    #[tokio::test]
    async fn test_shutdown_while_pending_ignores_late_reply() {
        let config = ChatConfig {
            response_delay_ms: 50,
            ..ChatConfig::default()
        };
        let storage = Arc::new(MemoryStorage::new());
        let (session, _rx) = open_session(storage.clone(), &config).await;

        session.send_user_message("hello");
        session.shutdown().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(session.messages().len(), 1);
        assert!(session.attachments().is_empty());
        assert_eq!(session.send_user_message("again"), SendOutcome::Closed);

        let raw = storage.get("chat_history").await.unwrap().unwrap();
        assert_eq!(decode_history(&raw).unwrap().len(), 1);

        // Second shutdown is a no-op.
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_responder_failure_returns_to_idle() {
        let (notifier, mut notifications) = Notifier::channel();
        let session = ChatSession::open(
            Arc::new(MemoryStorage::new()),
            Arc::new(FailingResponder),
            &fast_config(),
            notifier,
        )
        .await;

        session.send_user_message("hello");
        session.wait_idle().await;

        assert_eq!(session.messages().len(), 1);
        match notifications.recv().await {
            Some(Notification::Error(message)) => assert!(message.contains("backend unavailable")),
            other => panic!("unexpected notification: {:?}", other),
        }
        assert_eq!(session.send_user_message("retry"), SendOutcome::Sent);
    }

    #[tokio::test]
    async fn test_drop_revokes_handles() {
        let (session, _rx) = open_session(Arc::new(MemoryStorage::new()), &fast_config()).await;
        session.send_user_message("hello");
        session.wait_idle().await;

        let attachments = session.attachments().clone();
        assert_eq!(attachments.len(), 1);
        drop(session);
        assert!(attachments.is_empty());
    }
}
