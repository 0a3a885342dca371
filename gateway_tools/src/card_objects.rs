use std::collections::HashMap;

use mkt_common::Money;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::GatewayApiError;

/// The parameters used to create a payment intent on the card processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPaymentIntent {
    pub amount: Money,
    /// Lower-case ISO currency code
    pub currency: String,
    /// Our own ledger reference. It is sent as metadata and also used as the idempotency key, so that a retried
    /// request never creates a second intent.
    pub transaction_number: String,
    pub order_number: String,
    pub receipt_email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub latest_charge: Option<String>,
    #[serde(default)]
    pub last_payment_error: Option<PaymentError>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl PaymentIntent {
    pub fn transaction_number(&self) -> Option<&str> {
        self.metadata.get("transaction_number").map(String::as_str)
    }

    pub fn failure_message(&self) -> String {
        self.last_payment_error
            .as_ref()
            .and_then(|e| e.message.clone().or_else(|| e.code.clone()))
            .unwrap_or_else(|| "The card payment failed".to_string())
    }
}

/// A charge object, as delivered with `charge.refunded` events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardCharge {
    pub id: String,
    pub amount: i64,
    /// Cumulative refunded amount for the charge
    #[serde(default)]
    pub amount_refunded: i64,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardRefund {
    pub id: String,
    pub amount: i64,
    pub status: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookEventData {
    pub object: Value,
}

/// The envelope the card processor posts to the webhook endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardWebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: i64,
    pub data: WebhookEventData,
}

impl CardWebhookEvent {
    pub fn payment_intent(&self) -> Result<PaymentIntent, GatewayApiError> {
        serde_json::from_value(self.data.object.clone())
            .map_err(|e| GatewayApiError::JsonError(format!("Event {} is not a payment intent. {e}", self.id)))
    }

    pub fn charge(&self) -> Result<CardCharge, GatewayApiError> {
        serde_json::from_value(self.data.object.clone())
            .map_err(|e| GatewayApiError::JsonError(format!("Event {} is not a charge. {e}", self.id)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn deserialize_intent_event() {
        let json = r#"{
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "created": 1700000000,
            "data": { "object": {
                "id": "pi_123", "amount": 94500, "currency": "bdt", "status": "succeeded",
                "metadata": { "transaction_number": "TXN-1" }, "latest_charge": "ch_9"
            }}
        }"#;
        let event: CardWebhookEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, "payment_intent.succeeded");
        let intent = event.payment_intent().unwrap();
        assert_eq!(intent.id, "pi_123");
        assert_eq!(intent.amount, 94500);
        assert_eq!(intent.transaction_number(), Some("TXN-1"));
        assert_eq!(intent.latest_charge.as_deref(), Some("ch_9"));
        assert_eq!(intent.failure_message(), "The card payment failed");
    }

    #[test]
    fn deserialize_charge_event() {
        let json = r#"{
            "id": "evt_2",
            "type": "charge.refunded",
            "data": { "object": { "id": "ch_9", "amount": 94500, "amount_refunded": 50000, "payment_intent": "pi_123" }}
        }"#;
        let event: CardWebhookEvent = serde_json::from_str(json).unwrap();
        let charge = event.charge().unwrap();
        assert_eq!(charge.amount_refunded, 50000);
        assert_eq!(charge.payment_intent.as_deref(), Some("pi_123"));
    }
}
