use futures_util::future::BoxFuture;
use log::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub recipient: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("Could not reach the email service. {0}")]
    Transport(String),
    #[error("The email service rejected the message with status {status}. {message}")]
    Rejected { status: u16, message: String },
    #[error("Notifier is not configured. {0}")]
    Configuration(String),
}

/// Anything that can deliver an [`EmailMessage`].
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    fn send<'a>(&'a self, message: &'a EmailMessage) -> BoxFuture<'a, Result<(), NotificationError>>;
}

/// Writes messages to the log instead of sending them. Used when no email service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    fn send<'a>(&'a self, message: &'a EmailMessage) -> BoxFuture<'a, Result<(), NotificationError>> {
        Box::pin(async move {
            info!("📬️ [email to {}] {}", message.recipient, message.subject);
            trace!("📬️ {}", message.text);
            Ok(())
        })
    }
}
