//! REPL input parsing.

use std::path::PathBuf;

/// Slash commands offered for completion.
pub const COMMANDS: &[&str] = &["/clear", "/download", "/help", "/history", "/quit"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text to send as a user message.
    Message(String),
    Clear,
    /// Save the attachment of message `index` (1-based in the UI) to `dir`.
    Download { index: usize, dir: Option<PathBuf> },
    History,
    Help,
    Quit,
    /// Malformed or unknown slash command, with a usage hint.
    Invalid(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if !trimmed.starts_with('/') {
            return Self::Message(trimmed.to_string());
        }

        let mut parts = trimmed.split_whitespace();
        let name = parts.next().unwrap_or_default();
        match name {
            "/clear" => Self::Clear,
            "/history" => Self::History,
            "/help" => Self::Help,
            "/quit" | "/exit" => Self::Quit,
            "/download" => match parts.next().map(str::parse::<usize>) {
                Some(Ok(n)) if n > 0 => Self::Download {
                    index: n - 1,
                    dir: parts.next().map(PathBuf::from),
                },
                _ => Self::Invalid("Usage: /download <message number> [directory]".to_string()),
            },
            other => Self::Invalid(format!("Unknown command: {}", other)),
        }
    }
}

pub const HELP: &str = "\
/history                   Show the conversation with message numbers
/download <n> [directory]  Save the attachment of message <n>
/clear                     Delete the conversation and its attachments
/help                      Show this help
/quit                      Exit";
