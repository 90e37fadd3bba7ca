//! Path resolution for chatdash files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/chatdash/          # Config directory
//! └── config.toml
//!
//! ~/.local/share/chatdash/     # Data directory
//! ├── chat_history.json
//! └── logs/
//!     └── chatdash.log.YYYY-MM-DD
//! ```

use std::path::PathBuf;

use chatdash_core::{ChatError, Result};

const APP_DIR: &str = "chatdash";

pub struct ChatPaths;

impl ChatPaths {
    /// Returns the chatdash configuration directory (e.g. `~/.config/chatdash/`).
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| ChatError::config("Cannot determine config directory"))
    }

    /// Returns the chatdash data directory (e.g. `~/.local/share/chatdash/`).
    pub fn data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| ChatError::config("Cannot determine data directory"))
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Log directory under the given (or default) data directory.
    pub fn log_dir(data_dir: Option<&PathBuf>) -> Result<PathBuf> {
        match data_dir {
            Some(dir) => Ok(dir.join("logs")),
            None => Ok(Self::data_dir()?.join("logs")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_dir_under_override() {
        let base = PathBuf::from("/tmp/chatdash-test");
        assert_eq!(
            ChatPaths::log_dir(Some(&base)).unwrap(),
            PathBuf::from("/tmp/chatdash-test/logs")
        );
    }
}
