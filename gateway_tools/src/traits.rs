use mkt_common::Money;

use crate::{
    CardRefund,
    CardWebhookEvent,
    GatewayApiError,
    NewPaymentIntent,
    PaymentIntent,
    RedirectSession,
    RedirectSessionRequest,
    RedirectValidation,
};

/// Behaviour the marketplace needs from a card processor with an intent/webhook flow.
#[allow(async_fn_in_trait)]
pub trait CardProcessor {
    async fn create_payment_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, GatewayApiError>;

    /// Refunds `amount` of the charge behind `intent_id`.
    async fn create_refund(&self, intent_id: &str, amount: Money, reason: &str) -> Result<CardRefund, GatewayApiError>;

    /// Checks the signature header against the raw request body and, if valid, parses the event.
    fn verify_webhook(&self, payload: &[u8], signature_header: &str) -> Result<CardWebhookEvent, GatewayApiError>;
}

/// Behaviour the marketplace needs from a hosted-checkout gateway with browser redirects and IPN.
#[allow(async_fn_in_trait)]
pub trait RedirectGateway {
    async fn init_session(&self, request: RedirectSessionRequest) -> Result<RedirectSession, GatewayApiError>;

    /// Asks the gateway whether `val_id` is a genuine, successful payment.
    async fn validate(&self, val_id: &str) -> Result<RedirectValidation, GatewayApiError>;
}
