//! Terminal rendering of messages and notifications.

use colored::Colorize;

use chatdash_core::{ChatMessage, Notification};

/// `HH:MM:SS` out of an RFC 3339 timestamp, or the raw value if it is short.
fn clock(timestamp: &str) -> &str {
    timestamp.get(11..19).unwrap_or(timestamp)
}

/// Prints message `index` (0-based) with its 1-based number.
pub fn print_message(index: usize, message: &ChatMessage) {
    let number = format!("#{}", index + 1);
    let time = clock(&message.timestamp);

    if message.is_user {
        println!(
            "{} {} {}",
            number.bright_black(),
            "You".green().bold(),
            time.bright_black()
        );
        for line in message.content.lines() {
            println!("  {}", line.green());
        }
    } else {
        println!(
            "{} {} {}",
            number.bright_black(),
            "Assistant".bright_blue().bold(),
            time.bright_black()
        );
        for line in message.content.trim().lines() {
            println!("  {}", line.bright_blue());
        }
    }

    if let Some(name) = &message.file_name {
        match &message.file_url {
            Some(handle) => println!(
                "  {} {} {}",
                "📎".yellow(),
                name.yellow(),
                format!("({}, /download {})", handle, index + 1).bright_black()
            ),
            None => println!("  {} {}", "📎".yellow(), format!("{} (unavailable)", name).bright_black()),
        }
    }
    println!();
}

pub fn print_history(messages: &[ChatMessage]) {
    if messages.is_empty() {
        println!("{}", "No messages yet.".bright_black());
        return;
    }
    for (index, message) in messages.iter().enumerate() {
        print_message(index, message);
    }
}

pub fn print_notification(notification: &Notification) {
    let message = notification.message();
    match notification {
        Notification::Success(_) => println!("{}", format!("✔ {}", message).bright_green()),
        Notification::Warning(_) => println!("{}", format!("⚠ {}", message).yellow()),
        Notification::Error(_) => eprintln!("{}", format!("✖ {}", message).red()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock() {
        assert_eq!(clock("2024-05-01T10:11:12.345Z"), "10:11:12");
        assert_eq!(clock("short"), "short");
    }
}
