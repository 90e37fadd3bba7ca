//! Stored form of the chat history.
//!
//! The durable record is a JSON array of [`StoredChatMessage`]. The stored
//! form has no field for the live attachment handle, so a handle can never
//! reach disk; restoring mints fresh ones from `fileContent`.

use chatdash_core::{ChatMessage, Result};
use serde::{Deserialize, Serialize};

/// One element of the `chat_history` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredChatMessage {
    pub content: String,
    pub timestamp: String,
    pub is_user: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_content: Option<String>,
}

/// Convert domain model to the stored DTO, dropping the live handle.
impl From<&ChatMessage> for StoredChatMessage {
    fn from(message: &ChatMessage) -> Self {
        StoredChatMessage {
            content: message.content.clone(),
            timestamp: message.timestamp.clone(),
            is_user: message.is_user,
            file_name: message.file_name.clone(),
            file_content: message.file_content.clone(),
        }
    }
}

/// Convert a stored DTO back to the domain model. Handles are attached later.
impl From<StoredChatMessage> for ChatMessage {
    fn from(stored: StoredChatMessage) -> Self {
        ChatMessage {
            content: stored.content,
            timestamp: stored.timestamp,
            is_user: stored.is_user,
            file_name: stored.file_name,
            file_content: stored.file_content,
            file_url: None,
        }
    }
}

/// Serializes a message sequence into the record format.
pub fn encode_history(messages: &[ChatMessage]) -> Result<String> {
    let stored: Vec<StoredChatMessage> = messages.iter().map(StoredChatMessage::from).collect();
    Ok(serde_json::to_string(&stored)?)
}

/// Parses a record into messages without handles.
pub fn decode_history(raw: &str) -> Result<Vec<ChatMessage>> {
    let stored: Vec<StoredChatMessage> = serde_json::from_str(raw)?;
    Ok(stored.into_iter().map(ChatMessage::from).collect())
}
