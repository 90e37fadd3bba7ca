//! Runtime configuration.
//!
//! Every field has a default, so a partial (or missing) `config.toml` is fine:
//!
//! ```toml
//! storage_key = "chat_history"
//! response_delay_ms = 500
//!
//! [response]
//! file_name = "answer.txt"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;

/// Key of the durable history record.
pub const DEFAULT_STORAGE_KEY: &str = "chat_history";

/// Delay before the simulated response arrives.
pub const DEFAULT_RESPONSE_DELAY_MS: u64 = 2000;

pub const DEFAULT_RESPONSE_FILE_NAME: &str = "response.txt";
pub const DEFAULT_RESPONSE_FILE_CONTENT: &str = "Sample file content";

/// Markdown body of the simulated response.
pub const DEFAULT_RESPONSE_CONTENT: &str = r#"
# Response Title

Here's the information you requested:

## Section 1
- First bullet point
- Second bullet point
- Third bullet point

## Code Example
```javascript
function exampleCode() {
  const greeting = "Hello, world!";
  console.log(greeting);
  return greeting;
}
```

> This is a blockquote with important information.

Visit [Example Link](https://example.com) for more details.
"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Key the history is stored under.
    pub storage_key: String,
    /// Milliseconds before the simulated response is appended.
    pub response_delay_ms: u64,
    /// Overrides the platform data directory for history files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    pub response: ResponseConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            response_delay_ms: DEFAULT_RESPONSE_DELAY_MS,
            data_dir: None,
            response: ResponseConfig::default(),
        }
    }
}

impl ChatConfig {
    /// Parses a TOML document, filling absent fields with defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn response_delay(&self) -> Duration {
        Duration::from_millis(self.response_delay_ms)
    }
}

/// Shape of the simulated assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    pub content: String,
    pub file_name: String,
    pub file_content: String,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            content: DEFAULT_RESPONSE_CONTENT.to_string(),
            file_name: DEFAULT_RESPONSE_FILE_NAME.to_string(),
            file_content: DEFAULT_RESPONSE_FILE_CONTENT.to_string(),
        }
    }
}
