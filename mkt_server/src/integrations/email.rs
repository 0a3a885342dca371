use std::time::Duration;

use futures::future::BoxFuture;
use log::*;
use mkt_common::Secret;
use mkt_engine::notifications::{EmailMessage, NotificationError, Notifier};
use reqwest::Client;
use serde::Serialize;

use crate::config::EmailConfig;

const EMAIL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

/// Sends notifications by POSTing them as JSON to an external email service.
#[derive(Clone)]
pub struct HttpEmailNotifier {
    client: Client,
    url: String,
    api_key: Secret<String>,
    sender: String,
}

impl HttpEmailNotifier {
    pub fn new(config: &EmailConfig) -> Result<Self, NotificationError> {
        let url = config
            .service_url
            .clone()
            .ok_or_else(|| NotificationError::Configuration("No email service URL".into()))?;
        let client = Client::builder()
            .timeout(EMAIL_TIMEOUT)
            .build()
            .map_err(|e| NotificationError::Configuration(e.to_string()))?;
        Ok(Self { client, url, api_key: config.api_key.clone(), sender: config.sender.clone() })
    }
}

impl Notifier for HttpEmailNotifier {
    fn name(&self) -> &'static str {
        "http"
    }

    fn send<'a>(&'a self, message: &'a EmailMessage) -> BoxFuture<'a, Result<(), NotificationError>> {
        Box::pin(async move {
            let body = OutgoingEmail {
                from: &self.sender,
                to: &message.recipient,
                subject: &message.subject,
                html: &message.html,
                text: &message.text,
            };
            let mut req = self.client.post(&self.url).json(&body);
            if !self.api_key.is_empty() {
                req = req.bearer_auth(self.api_key.reveal());
            }
            let response = req.send().await.map_err(|e| NotificationError::Transport(e.to_string()))?;
            let status = response.status();
            if status.is_success() {
                debug!("📬️ Email '{}' sent to {}", message.subject, message.recipient);
                Ok(())
            } else {
                let message = response.text().await.unwrap_or_default();
                Err(NotificationError::Rejected { status: status.as_u16(), message })
            }
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn needs_a_service_url() {
        let config = EmailConfig::default();
        assert!(matches!(HttpEmailNotifier::new(&config), Err(NotificationError::Configuration(_))));
        let config = EmailConfig { service_url: Some("http://127.0.0.1:9/send".into()), ..Default::default() };
        let notifier = HttpEmailNotifier::new(&config).unwrap();
        assert_eq!(notifier.name(), "http");
    }
}
