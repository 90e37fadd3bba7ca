//! Error types for chatdash.

use thiserror::Error;

/// A shared error type for the chatdash crates.
///
/// Variants are structured so callers can tell recoverable storage problems
/// apart from attachment failures that should be shown to the user.
#[derive(Error, Debug, Clone)]
pub enum ChatError {
    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Durable storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON"
        message: String,
    },

    /// The attachment handle was revoked or never existed.
    #[error("Attachment handle is no longer live: {handle}")]
    HandleRevoked { handle: String },

    /// The message at `index` does not exist or carries no attachment.
    #[error("No attachment on message #{index}")]
    AttachmentMissing { index: usize },

    /// Storage key contains characters that cannot be used as a file name.
    #[error("Invalid storage key: '{0}'")]
    InvalidKey(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is a serialization error
    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }

    /// Check if this error means an attachment could not be downloaded.
    pub fn is_download_failure(&self) -> bool {
        matches!(
            self,
            Self::HandleRevoked { .. } | Self::AttachmentMissing { .. }
        )
    }
}

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ChatError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, ChatError>`.
pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_is_serialization() {
        let err: ChatError = serde_json::from_str::<Vec<u8>>("not json")
            .unwrap_err()
            .into();
        assert!(err.is_serialization());
        assert!(err.to_string().starts_with("Serialization error: JSON"));
    }

    #[test]
    fn test_download_failures() {
        let revoked = ChatError::HandleRevoked {
            handle: "blob:abc".to_string(),
        };
        assert!(revoked.is_download_failure());
        assert!(ChatError::AttachmentMissing { index: 3 }.is_download_failure());
        assert!(!ChatError::storage("disk full").is_download_failure());
    }
}
