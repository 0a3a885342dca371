use std::sync::Arc;

use log::*;

use crate::{
    events::EventHooks,
    notifications::{order_messages, payment_messages, payout_messages, EmailMessage, Notifier},
};

/// Turns engine events into emails and delivers them through a [`Notifier`].
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Sends every message. Failures are logged and otherwise ignored.
    pub async fn deliver(&self, messages: Vec<EmailMessage>) -> usize {
        let mut sent = 0;
        for msg in &messages {
            match self.notifier.send(msg).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    let via = self.notifier.name();
                    warn!("📬️ Could not deliver '{}' to {} via {via}. {e}", msg.subject, msg.recipient);
                },
            }
        }
        sent
    }

    /// Event hooks that route every engine event through this dispatcher.
    pub fn hooks(&self) -> EventHooks {
        let mut hooks = EventHooks::default();
        let d = self.clone();
        hooks.on_order_event(move |ev| {
            let d = d.clone();
            Box::pin(async move {
                d.deliver(order_messages(&ev)).await;
            })
        });
        let d = self.clone();
        hooks.on_payment_event(move |ev| {
            let d = d.clone();
            Box::pin(async move {
                d.deliver(payment_messages(&ev)).await;
            })
        });
        let d = self.clone();
        hooks.on_payout_event(move |ev| {
            let d = d.clone();
            Box::pin(async move {
                d.deliver(payout_messages(&ev)).await;
            })
        });
        hooks
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use futures_util::future::BoxFuture;

    use super::*;
    use crate::notifications::NotificationError;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<String>>,
    }

    impl Notifier for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn send<'a>(&'a self, message: &'a EmailMessage) -> BoxFuture<'a, Result<(), NotificationError>> {
            Box::pin(async move {
                if message.recipient.starts_with("bounce") {
                    return Err(NotificationError::Rejected { status: 550, message: "mailbox unavailable".into() });
                }
                self.sent.lock().unwrap().push(message.recipient.clone());
                Ok(())
            })
        }
    }

    fn msg(to: &str) -> EmailMessage {
        EmailMessage { recipient: to.into(), subject: "s".into(), html: "h".into(), text: "t".into() }
    }

    #[tokio::test]
    async fn failures_do_not_stop_delivery() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = NotificationDispatcher::new(recorder.clone());
        let sent = dispatcher.deliver(vec![msg("a@x.com"), msg("bounce@x.com"), msg("b@x.com")]).await;
        assert_eq!(sent, 2);
        assert_eq!(*recorder.sent.lock().unwrap(), vec!["a@x.com".to_string(), "b@x.com".to_string()]);
    }
}
