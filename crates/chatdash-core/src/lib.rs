//! Domain layer for chatdash.
//!
//! Holds the message model, the attachment handle registry, the durable
//! storage trait and the shared error type. No I/O happens here.

pub mod attachment;
pub mod config;
pub mod error;
pub mod message;
pub mod notification;
pub mod repository;

pub use attachment::{Attachment, AttachmentHandle, AttachmentStore};
pub use config::{ChatConfig, ResponseConfig};
pub use error::{ChatError, Result};
pub use message::ChatMessage;
pub use notification::{Notification, Notifier};
pub use repository::HistoryStorage;
