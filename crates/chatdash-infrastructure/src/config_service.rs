//! Configuration service.
//!
//! Loads [`ChatConfig`] from `config.toml` and caches it.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use chatdash_core::{ChatConfig, Result};

use crate::paths::ChatPaths;

/// Loads and caches the configuration file.
///
/// A missing file yields defaults. A malformed file is logged and also
/// yields defaults, so a typo never prevents the app from starting.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: Option<PathBuf>,
    config: Arc<RwLock<Option<ChatConfig>>>,
}

impl ConfigService {
    /// Uses the platform config file location.
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Uses an explicit config file.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> ChatConfig {
        {
            let read_lock = self.config.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = match self.load_config() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {}", e);
                ChatConfig::default()
            }
        };

        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = Some(loaded.clone());
        loaded
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = None;
    }

    fn load_config(&self) -> Result<ChatConfig> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => ChatPaths::config_file()?,
        };

        match std::fs::read_to_string(&path) {
            Ok(content) => {
                tracing::debug!(path = %path.display(), "Loaded config file");
                ChatConfig::from_toml_str(&content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ChatConfig::default()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::with_path(temp_dir.path().join("config.toml"));
        assert_eq!(service.get_config(), ChatConfig::default());
    }

    #[test]
    fn test_reads_and_caches() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "response_delay_ms = 5\n").unwrap();

        let service = ConfigService::with_path(path.clone());
        assert_eq!(service.get_config().response_delay_ms, 5);

        std::fs::write(&path, "response_delay_ms = 7\n").unwrap();
        assert_eq!(service.get_config().response_delay_ms, 5);

        service.invalidate_cache();
        assert_eq!(service.get_config().response_delay_ms, 7);
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();

        let service = ConfigService::with_path(path);
        assert_eq!(service.get_config(), ChatConfig::default());
    }
}
