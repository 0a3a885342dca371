//! Best-effort email notifications.
//!
//! The engine never sends email from inside an operation. Operations publish events after their database work has
//! committed; the [`NotificationDispatcher`] subscribes to those events, renders them into [`EmailMessage`]s and hands
//! them to a [`Notifier`]. Delivery failures are logged and dropped.
mod dispatcher;
mod notifier;
mod templates;

pub use dispatcher::NotificationDispatcher;
pub use notifier::{EmailMessage, LogNotifier, NotificationError, Notifier};
pub use templates::{order_messages, payment_messages, payout_messages};
