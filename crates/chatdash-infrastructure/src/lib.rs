pub mod config_service;
pub mod dto;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::dto::{StoredChatMessage, decode_history, encode_history};
pub use crate::paths::ChatPaths;
pub use crate::storage::{JsonFileStorage, MemoryStorage};
