//! Reply generation.
//!
//! The session asks a [`Responder`] for the assistant's reply. The only
//! implementation here is [`SimulatedResponder`], which returns a fixed
//! markdown answer with a small text attachment; a real completion backend
//! would implement the same trait.

use async_trait::async_trait;
use chatdash_core::{ChatMessage, ResponseConfig, Result};

/// A file produced alongside a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyAttachment {
    pub file_name: String,
    pub file_content: String,
}

/// The assistant's answer to the current history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    pub attachment: Option<ReplyAttachment>,
}

#[async_trait]
pub trait Responder: Send + Sync {
    /// Produces a reply given the history so far (last message is the user's).
    async fn respond(&self, history: &[ChatMessage]) -> Result<Reply>;
}

/// Canned reply, configured through [`ResponseConfig`].
#[derive(Debug, Clone)]
pub struct SimulatedResponder {
    config: ResponseConfig,
}

impl SimulatedResponder {
    pub fn new(config: ResponseConfig) -> Self {
        Self { config }
    }
}

impl Default for SimulatedResponder {
    fn default() -> Self {
        Self::new(ResponseConfig::default())
    }
}

#[async_trait]
impl Responder for SimulatedResponder {
    async fn respond(&self, history: &[ChatMessage]) -> Result<Reply> {
        tracing::debug!(history_len = history.len(), "Generating simulated reply");
        Ok(Reply {
            content: self.config.content.clone(),
            attachment: Some(ReplyAttachment {
                file_name: self.config.file_name.clone(),
                file_content: self.config.file_content.clone(),
            }),
        })
    }
}
