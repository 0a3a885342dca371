//! Gateway callbacks, one variant per payment method, and their conversion into a [`SettlementEvent`].
use gateway_tools::{CardWebhookEvent, PaymentIntent, RedirectValidation};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::PaymentMethod,
    mkt_api::ledger_objects::{SettlementEvent, TransactionRef},
    traits::{MarketplaceError, SettlementDetails},
};

pub const INTENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const INTENT_FAILED: &str = "payment_intent.payment_failed";
pub const INTENT_CANCELED: &str = "payment_intent.canceled";
pub const CHARGE_REFUNDED: &str = "charge.refunded";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "payment_method", rename_all = "snake_case")]
pub enum GatewayCallback {
    /// A verified card-processor webhook
    Card { event: CardWebhookEvent },
    /// The validation API's answer for a redirect-gateway `val_id`
    Redirect { validation: RedirectValidation },
    /// A redirect-gateway payment that failed before (or instead of) validation
    RedirectFailure { transaction_number: String, reason: String },
    /// An admin's decision on a manual payment
    Manual { transaction_id: i64, approved: bool, admin_id: i64, notes: Option<String> },
}

impl GatewayCallback {
    pub fn payment_method(&self) -> PaymentMethod {
        match self {
            GatewayCallback::Card { .. } => PaymentMethod::Card,
            GatewayCallback::Redirect { .. } | GatewayCallback::RedirectFailure { .. } => PaymentMethod::Redirect,
            GatewayCallback::Manual { .. } => PaymentMethod::Manual,
        }
    }

    /// The settlement this callback stands for. `None` means the callback carries no verdict on a payment (e.g. a
    /// card webhook of a type we don't act on).
    pub fn into_settlement(self) -> Result<Option<SettlementEvent>, MarketplaceError> {
        match self {
            GatewayCallback::Card { event } => card_settlement(&event),
            GatewayCallback::Redirect { validation } => Ok(Some(redirect_settlement(validation))),
            GatewayCallback::RedirectFailure { transaction_number, reason } => Ok(Some(SettlementEvent::failure(
                TransactionRef::number(transaction_number),
                reason,
                SettlementDetails::default(),
            ))),
            GatewayCallback::Manual { transaction_id, approved, admin_id, notes } => {
                let details = SettlementDetails {
                    verified_by: Some(admin_id),
                    admin_notes: notes.clone(),
                    ..Default::default()
                };
                let transaction_ref = TransactionRef::id(transaction_id);
                let event = if approved {
                    SettlementEvent::success(transaction_ref, details)
                } else {
                    let reason = notes.unwrap_or_else(|| "Payment proof was rejected".to_string());
                    SettlementEvent::failure(transaction_ref, reason, details)
                };
                Ok(Some(event))
            },
        }
    }
}

/// Intents carry our transaction number in their metadata. It is preferred over the intent id, because a fast
/// webhook can arrive before the intent id has been stored against the transaction.
pub fn intent_ref(intent: &PaymentIntent) -> TransactionRef {
    match intent.transaction_number() {
        Some(number) => TransactionRef::number(number),
        None => TransactionRef::gateway(PaymentMethod::Card, intent.id.clone()),
    }
}

fn card_settlement(event: &CardWebhookEvent) -> Result<Option<SettlementEvent>, MarketplaceError> {
    let reason = match event.event_type.as_str() {
        INTENT_SUCCEEDED => None,
        INTENT_FAILED => Some(event.payment_intent()?.failure_message()),
        INTENT_CANCELED => Some("The card payment was cancelled".to_string()),
        _ => return Ok(None),
    };
    let intent = event.payment_intent()?;
    let details = SettlementDetails {
        gateway_transaction_id: intent.latest_charge.clone(),
        gateway_response: Some(event.data.object.clone()),
        ..Default::default()
    };
    let transaction_ref = intent_ref(&intent);
    let settlement = match reason {
        None => SettlementEvent::success(transaction_ref, details),
        Some(reason) => SettlementEvent::failure(transaction_ref, reason, details),
    };
    Ok(Some(settlement))
}

fn redirect_settlement(validation: RedirectValidation) -> SettlementEvent {
    let transaction_ref = TransactionRef::number(validation.tran_id.clone());
    let details = SettlementDetails {
        validation_id: Some(validation.val_id.clone()).filter(|v| !v.is_empty()),
        gateway_transaction_id: validation.bank_tran_id.clone(),
        gateway_response: serde_json::to_value(&validation).ok(),
        ..Default::default()
    };
    if validation.is_valid() {
        SettlementEvent::success(transaction_ref, details)
    } else {
        let reason = format!("The gateway reported the payment as {}", validation.status);
        SettlementEvent::failure(transaction_ref, reason, details)
    }
}
