//! Chat message types.
//!
//! A message optionally carries an attachment in two forms: the durable
//! payload (`file_content`) and a live handle (`file_url`) minted from it.
//! Only the payload is ever written to storage.

use crate::attachment::AttachmentHandle;

/// A single entry in the chat history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Markdown for system messages, plain text for user messages.
    pub content: String,
    /// Creation time (RFC 3339, UTC).
    pub timestamp: String,
    /// `true` for user input, `false` for system responses.
    pub is_user: bool,
    /// Human-readable name of the attached file.
    pub file_name: Option<String>,
    /// Durable attachment payload, survives restore.
    pub file_content: Option<String>,
    /// Session-local download handle; regenerated on every load.
    pub file_url: Option<AttachmentHandle>,
}

impl ChatMessage {
    /// Creates a user message stamped with the current time.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp: now_timestamp(),
            is_user: true,
            file_name: None,
            file_content: None,
            file_url: None,
        }
    }

    /// Creates a system message stamped with the current time.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp: now_timestamp(),
            is_user: false,
            file_name: None,
            file_content: None,
            file_url: None,
        }
    }

    /// Attaches a durable payload together with its live handle.
    pub fn with_attachment(
        mut self,
        file_name: impl Into<String>,
        file_content: impl Into<String>,
        handle: AttachmentHandle,
    ) -> Self {
        self.file_name = Some(file_name.into());
        self.file_content = Some(file_content.into());
        self.file_url = Some(handle);
        self
    }

    /// Returns the name and payload when the attachment can survive a restore.
    pub fn durable_attachment(&self) -> Option<(&str, &str)> {
        match (&self.file_name, &self.file_content) {
            (Some(name), Some(content)) => Some((name.as_str(), content.as_str())),
            _ => None,
        }
    }

    /// Compares everything except the live handle.
    pub fn same_content(&self, other: &ChatMessage) -> bool {
        self.content == other.content
            && self.timestamp == other.timestamp
            && self.is_user == other.is_user
            && self.file_name == other.file_name
            && self.file_content == other.file_content
    }
}

fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
