use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use tokio::sync::mpsc::UnboundedReceiver;

use chatdash_application::{ChatSession, SendOutcome, SessionState, SimulatedResponder};
use chatdash_core::{ChatConfig, ChatError, HistoryStorage, Notification, Notifier};
use chatdash_infrastructure::{ChatPaths, ConfigService, JsonFileStorage, MemoryStorage};

mod commands;
mod helper;
mod logging;
mod render;

use commands::{Command, HELP};
use helper::ReplHelper;

#[derive(Parser, Debug)]
#[command(name = "chatdash")]
#[command(about = "Chat dashboard with persistent history and downloadable attachments", long_about = None)]
struct Args {
    /// Config file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the chat history record
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Delay before the simulated response, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Keep history in memory only
    #[arg(long)]
    in_memory: bool,

    /// Directory for log files (defaults to <data-dir>/logs)
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn resolve_config(args: &Args) -> ChatConfig {
    let service = match &args.config {
        Some(path) => ConfigService::with_path(path.clone()),
        None => ConfigService::new(),
    };
    let mut config = service.get_config();
    if let Some(delay_ms) = args.delay_ms {
        config.response_delay_ms = delay_ms;
    }
    if let Some(dir) = &args.data_dir {
        config.data_dir = Some(dir.clone());
    }
    config
}

async fn open_storage(in_memory: bool, data_dir: &Path) -> Result<Arc<dyn HistoryStorage>> {
    if in_memory {
        return Ok(Arc::new(MemoryStorage::new()));
    }
    let storage = JsonFileStorage::new(data_dir)
        .await
        .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;
    Ok(Arc::new(storage))
}

/// Prints notifications and each reply as soon as the session goes idle.
async fn watch_session(
    session: Arc<ChatSession>,
    mut notifications: UnboundedReceiver<Notification>,
) {
    let mut state = session.subscribe_state();
    loop {
        tokio::select! {
            notification = notifications.recv() => match notification {
                Some(notification) => render::print_notification(&notification),
                None => break,
            },
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                if *state.borrow_and_update() == SessionState::Idle {
                    let messages = session.messages();
                    if let Some(last) = messages.last().filter(|m| !m.is_user) {
                        render::print_message(messages.len() - 1, last);
                    }
                }
            }
        }
    }
}

async fn download(session: &ChatSession, index: usize, dir: Option<PathBuf>) -> Result<PathBuf> {
    let attachment = session.download(index)?;
    let dir = match dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    // Never let a stored name escape the target directory.
    let file_name = Path::new(&attachment.name)
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "attachment.txt".into());
    let target = dir.join(file_name);

    tokio::fs::create_dir_all(&dir).await?;
    tokio::fs::write(&target, attachment.content.as_bytes())
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;
    tracing::info!(path = %target.display(), mime = %attachment.mime_type, "Saved attachment");
    Ok(target)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = resolve_config(&args);

    let data_dir = match &config.data_dir {
        Some(dir) => dir.clone(),
        None => ChatPaths::data_dir()?,
    };
    let log_dir = match &args.log_dir {
        Some(dir) => dir.clone(),
        None => ChatPaths::log_dir(Some(&data_dir))?,
    };
    let _log_guard = logging::init(&log_dir)?;
    tracing::info!(data_dir = %data_dir.display(), in_memory = args.in_memory, "chatdash starting");

    // ===== Session =====
    let storage = open_storage(args.in_memory, &data_dir).await?;
    let (notifier, notifications) = Notifier::channel();
    let responder = Arc::new(SimulatedResponder::new(config.response.clone()));
    let session = Arc::new(ChatSession::open(storage, responder, &config, notifier).await);

    let watcher = tokio::spawn(watch_session(session.clone(), notifications));

    // ===== REPL =====
    let mut rl: Editor<ReplHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(ReplHelper));

    println!("{}", "=== chatdash ===".bright_magenta().bold());
    println!("{}", "Type a message, or /help for commands.".bright_black());
    println!();
    render::print_history(&session.messages());

    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let command = Command::parse(&line);
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.as_str());
                }

                match command {
                    Command::Message(text) => match session.send_user_message(&text) {
                        SendOutcome::Sent => {
                            let messages = session.messages();
                            if let Some(last) = messages.last() {
                                render::print_message(messages.len() - 1, last);
                            }
                            println!("{}", "Thinking...".bright_black());
                        }
                        SendOutcome::Busy => {
                            println!("{}", "Still waiting for the previous reply.".yellow());
                        }
                        SendOutcome::Ignored => {}
                        SendOutcome::Closed => break,
                    },
                    Command::Clear => {
                        if let Err(e) = session.clear_history().await {
                            eprintln!("{}", format!("Failed to clear history: {}", e).red());
                        }
                    }
                    Command::Download { index, dir } => match download(&session, index, dir).await {
                        Ok(path) => println!("{}", format!("Saved {}", path.display()).bright_green()),
                        Err(e) => {
                            tracing::warn!("Download of message #{} failed: {:#}", index + 1, e);
                            // Handle failures were already reported by the session.
                            let notified = e
                                .downcast_ref::<ChatError>()
                                .is_some_and(ChatError::is_download_failure);
                            if !notified {
                                eprintln!("{}", format!("Download failed: {:#}", e).red());
                            }
                        }
                    },
                    Command::History => render::print_history(&session.messages()),
                    Command::Help => println!("{}", HELP.bright_black()),
                    Command::Quit => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    Command::Invalid(hint) => println!("{}", hint.yellow()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type '/quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    if let Err(e) = session.shutdown().await {
        tracing::warn!("Shutdown did not flush cleanly: {}", e);
    }
    watcher.abort();
    tracing::info!("chatdash stopped");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_download_writes_attachment() {
        let temp_dir = TempDir::new().unwrap();
        let config = ChatConfig {
            response_delay_ms: 5,
            ..ChatConfig::default()
        };
        let session = ChatSession::open(
            Arc::new(MemoryStorage::new()),
            Arc::new(SimulatedResponder::new(config.response.clone())),
            &config,
            Notifier::disabled(),
        )
        .await;
        session.send_user_message("hello");
        session.wait_idle().await;

        let target = download(&session, 1, Some(temp_dir.path().to_path_buf()))
            .await
            .unwrap();
        assert_eq!(target, temp_dir.path().join("response.txt"));
        assert_eq!(std::fs::read_to_string(target).unwrap(), "Sample file content");

        assert!(download(&session, 0, Some(temp_dir.path().to_path_buf())).await.is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "chatdash",
            "--config",
            "/nonexistent/chatdash/config.toml",
            "--delay-ms",
            "15",
            "--data-dir",
            "/tmp/chatdash-data",
        ]);
        let config = resolve_config(&args);
        assert_eq!(config.response_delay_ms, 15);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/chatdash-data")));
        assert_eq!(config.storage_key, "chat_history");
    }
}
