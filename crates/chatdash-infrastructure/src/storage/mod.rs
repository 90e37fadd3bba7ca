//! Storage layer: atomic files and the key-value backends built on them.

mod atomic_file;
mod json_file_storage;
mod memory_storage;

pub use atomic_file::{AtomicFile, AtomicFileError};
pub use json_file_storage::JsonFileStorage;
pub use memory_storage::MemoryStorage;

use chatdash_core::{ChatError, Result};

/// Checks that a storage key can be used as a file stem.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ChatError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("chat_history").is_ok());
        assert!(validate_key("session-2").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("a b").is_err());
    }
}
