//! Transient user-facing notifications.
//!
//! Sessions report outcomes (file generated, history cleared, failed
//! downloads, failed writes) through a [`Notifier`]. The front-end drains the
//! receiving side and shows each one briefly; nothing here is fatal.

use serde::Serialize;
use tokio::sync::mpsc;

/// Severity-tagged notification text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "level", content = "message", rename_all = "lowercase")]
pub enum Notification {
    Success(String),
    Warning(String),
    Error(String),
}

impl Notification {
    pub fn message(&self) -> &str {
        match self {
            Self::Success(m) | Self::Warning(m) | Self::Error(m) => m,
        }
    }
}

/// Sending half of the notification channel.
///
/// Cloneable; a notifier without a receiver only logs.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    sender: Option<mpsc::UnboundedSender<Notification>>,
}

impl Notifier {
    /// Creates a notifier together with the receiver the front-end listens on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// A notifier that drops everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn success(&self, message: impl Into<String>) {
        self.send(Notification::Success(message.into()));
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.send(Notification::Warning(message.into()));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(Notification::Error(message.into()));
    }

    fn send(&self, notification: Notification) {
        tracing::debug!(?notification, "Notification");
        if let Some(sender) = &self.sender {
            // Receiver gone means the front-end is shutting down; skip.
            let _ = sender.send(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_delivers_in_order() {
        let (notifier, mut rx) = Notifier::channel();
        notifier.success("saved");
        notifier.error("failed");

        assert_eq!(rx.try_recv().unwrap(), Notification::Success("saved".into()));
        assert_eq!(rx.try_recv().unwrap().message(), "failed");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_disabled_and_closed_notifiers_do_not_panic() {
        Notifier::disabled().warning("nobody listens");

        let (notifier, rx) = Notifier::channel();
        drop(rx);
        notifier.success("still fine");
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(Notification::Warning("disk".into())).unwrap();
        assert_eq!(json, serde_json::json!({"level": "warning", "message": "disk"}));
    }
}
