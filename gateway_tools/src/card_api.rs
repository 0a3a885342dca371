use std::sync::Arc;

use chrono::Utc;
use log::*;
use mkt_common::Money;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Method,
};
use serde::de::DeserializeOwned;

use crate::{
    signature::verify_signature,
    CardProcessor,
    CardProcessorConfig,
    CardRefund,
    CardWebhookEvent,
    GatewayApiError,
    NewPaymentIntent,
    PaymentIntent,
};

/// REST client for the card processor.
#[derive(Clone)]
pub struct CardProcessorApi {
    config: CardProcessorConfig,
    client: Arc<Client>,
}

impl CardProcessorApi {
    pub fn new(config: CardProcessorConfig) -> Result<Self, GatewayApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let val = HeaderValue::from_str(&bearer).map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        headers.insert(AUTHORIZATION, val);
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_base)
    }

    /// Sends a form-encoded request. The processor's error envelope is `{"error": {"message": ...}}`.
    async fn form_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: &[(String, String)],
        idempotency_key: Option<&str>,
    ) -> Result<T, GatewayApiError> {
        let url = self.url(path);
        trace!("🔌️ Sending card processor request: {method} {url}");
        let mut req = self.client.request(method, url).form(form);
        if let Some(key) = idempotency_key {
            req = req.header("Idempotency-Key", key);
        }
        let response = req.send().await?;
        if response.status().is_success() {
            trace!("🔌️ Card processor request successful. {}", response.status());
            response.json::<T>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let body = response.text().await?;
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(String::from))
                .unwrap_or(body);
            Err(GatewayApiError::QueryError { status, message })
        }
    }
}

impl CardProcessor for CardProcessorApi {
    async fn create_payment_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, GatewayApiError> {
        let mut form = vec![
            ("amount".to_string(), intent.amount.value().to_string()),
            ("currency".to_string(), intent.currency.to_lowercase()),
            ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
            ("metadata[transaction_number]".to_string(), intent.transaction_number.clone()),
            ("metadata[order_number]".to_string(), intent.order_number.clone()),
        ];
        if let Some(email) = intent.receipt_email {
            form.push(("receipt_email".to_string(), email));
        }
        let key = format!("intent-{}", intent.transaction_number);
        let result = self.form_query::<PaymentIntent>(Method::POST, "/payment_intents", &form, Some(&key)).await?;
        info!("🔌️ Created payment intent {} for transaction {}", result.id, intent.transaction_number);
        Ok(result)
    }

    async fn create_refund(&self, intent_id: &str, amount: Money, reason: &str) -> Result<CardRefund, GatewayApiError> {
        let form = vec![
            ("payment_intent".to_string(), intent_id.to_string()),
            ("amount".to_string(), amount.value().to_string()),
            ("metadata[reason]".to_string(), reason.to_string()),
        ];
        let key = format!("refund-{intent_id}-{}", amount.value());
        let result = self.form_query::<CardRefund>(Method::POST, "/refunds", &form, Some(&key)).await?;
        info!("🔌️ Created refund {} of {amount} for intent {intent_id}", result.id);
        Ok(result)
    }

    fn verify_webhook(&self, payload: &[u8], signature_header: &str) -> Result<CardWebhookEvent, GatewayApiError> {
        let secret = self.config.webhook_secret.reveal();
        let now = Utc::now().timestamp();
        verify_signature(secret, payload, signature_header, now, self.config.signature_tolerance_secs)?;
        serde_json::from_slice::<CardWebhookEvent>(payload).map_err(|e| GatewayApiError::JsonError(e.to_string()))
    }
}
