use gateway_tools::{CardProcessor, CardWebhookEvent, GatewayApiError, NewPaymentIntent};
use log::*;
use mkt_common::Money;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Actor, OrderNumber, PaymentMethod, Transaction},
    gateways::callback::{intent_ref, GatewayCallback, CHARGE_REFUNDED},
    mkt_api::{
        ledger_api::LedgerApi,
        ledger_objects::{SettlementEvent, SettlementOutcome, SettlementResult, TransactionRef},
        order_objects::required,
    },
    traits::{CatalogManagement, LedgerManagement, MarketplaceError, OrderManagement, RefundOutcome},
};

/// What the client needs to confirm a card payment with the processor's SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardIntent {
    pub transaction_number: String,
    pub intent_id: String,
    pub client_secret: Option<String>,
    pub amount: Money,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "handled", content = "result", rename_all = "snake_case")]
pub enum WebhookOutcome {
    Settlement(SettlementResult),
    Refund(Option<RefundOutcome>),
    /// Not an event we act on, or about a payment we don't know. Acknowledged so the processor stops retrying.
    Ignored,
}

/// Card payments with a payment-intent / signed-webhook flow.
pub struct CardAdapter<B, C> {
    ledger: LedgerApi<B>,
    processor: C,
}

impl<B, C> CardAdapter<B, C> {
    pub fn new(ledger: LedgerApi<B>, processor: C) -> Self {
        Self { ledger, processor }
    }

    pub fn ledger(&self) -> &LedgerApi<B> {
        &self.ledger
    }
}

impl<B, C> CardAdapter<B, C>
where
    B: CatalogManagement + OrderManagement + LedgerManagement,
    C: CardProcessor,
{
    /// Opens a payment attempt and a matching intent on the processor.
    ///
    /// If the processor refuses, the attempt is kept as `failed` with the processor's reason and a `Gateway` error is
    /// returned.
    pub async fn create_intent(&self, actor: &Actor, number: &OrderNumber) -> Result<CardIntent, MarketplaceError> {
        let (order, transaction) = self.ledger.initiate(actor, number, PaymentMethod::Card, None).await?;
        let receipt_email = match self.ledger.db().fetch_user(order.customer_id).await {
            Ok(user) => user.map(|u| u.email),
            Err(e) => {
                warn!("🔌️ Could not load customer #{} for the receipt email. {e}", order.customer_id);
                None
            },
        };
        let request = NewPaymentIntent {
            amount: transaction.amount,
            currency: transaction.currency.to_lowercase(),
            transaction_number: transaction.transaction_number.clone(),
            order_number: order.order_number.to_string(),
            receipt_email,
        };
        let intent = match self.processor.create_payment_intent(request).await {
            Ok(intent) => intent,
            Err(e) => {
                error!("🔌️ Could not create a payment intent for {}. {e}", transaction.transaction_number);
                self.record_failure(&transaction, format!("Could not create payment intent. {e}")).await;
                return Err(e.into());
            },
        };
        let transaction = self.ledger.db().set_gateway_reference(transaction.id, &intent.id).await?;
        info!(
            "🔌️ Payment intent {} created for {} ({})",
            intent.id, transaction.transaction_number, order.order_number
        );
        Ok(CardIntent {
            transaction_number: transaction.transaction_number,
            intent_id: intent.id,
            client_secret: intent.client_secret,
            amount: transaction.amount,
            currency: transaction.currency,
        })
    }

    /// Handles a webhook delivery. A bad signature is a `Validation` error and changes nothing.
    pub async fn handle_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookOutcome, MarketplaceError> {
        let event = self.processor.verify_webhook(payload, signature).map_err(|e| match e {
            GatewayApiError::InvalidSignature(msg) => {
                warn!("🔌️ Rejected a card webhook with an invalid signature. {msg}");
                MarketplaceError::Validation("Invalid webhook signature".into())
            },
            other => MarketplaceError::Validation(format!("Invalid webhook payload. {other}")),
        })?;
        debug!("🔌️ Card webhook {} ({}) received", event.id, event.event_type);
        if event.event_type == CHARGE_REFUNDED {
            return self.handle_refund_event(&event).await;
        }
        let Some(settlement) = GatewayCallback::Card { event: event.clone() }.into_settlement()? else {
            debug!("🔌️ Ignoring card webhook {} of type {}", event.id, event.event_type);
            return Ok(WebhookOutcome::Ignored);
        };
        let settlement = self.check_amount(&event, settlement).await?;
        match self.ledger.settle(settlement).await {
            Ok(result) => Ok(WebhookOutcome::Settlement(result)),
            Err(MarketplaceError::NotFound(what)) => {
                warn!("🔌️ Card webhook {} refers to an unknown payment ({what}). Ignoring it.", event.id);
                Ok(WebhookOutcome::Ignored)
            },
            Err(MarketplaceError::InvalidState(reason)) => {
                error!("🔌️ Card webhook {} cannot be applied and needs manual review. {reason}", event.id);
                Ok(WebhookOutcome::Ignored)
            },
            Err(e) => Err(e),
        }
    }

    /// Refunds part or all of a settled card payment at the processor, then records it. Admins only.
    ///
    /// The ledger is updated with the processor's running total, so the `charge.refunded` webhook for the same
    /// refund does nothing when it arrives.
    pub async fn refund(
        &self,
        actor: &Actor,
        transaction_id: i64,
        amount: Money,
        reason: Option<String>,
    ) -> Result<Transaction, MarketplaceError> {
        if !actor.role.is_admin() {
            return Err(MarketplaceError::forbidden("Only admins can issue refunds"));
        }
        let reason = required(reason, "refund reason")?;
        let transaction = self.ledger.check_refundable(transaction_id, amount).await?;
        if transaction.payment_method != PaymentMethod::Card {
            return Err(MarketplaceError::InvalidState(format!(
                "Transaction {} is not a card payment",
                transaction.transaction_number
            )));
        }
        let intent_id = transaction.gateway_reference.clone().ok_or_else(|| {
            let number = &transaction.transaction_number;
            MarketplaceError::InvalidState(format!("Transaction {number} has no payment intent"))
        })?;
        let refund_now = amount.min(transaction.remaining_refundable());
        let refund = self.processor.create_refund(&intent_id, refund_now, &reason).await?;
        info!("🔌️ Card refund {} of {refund_now} issued for {}", refund.id, transaction.transaction_number);
        let cumulative = transaction.refund_amount + refund_now;
        let outcome = self
            .ledger
            .apply_gateway_refund(TransactionRef::id(transaction.id), cumulative, &reason, Some(actor.id))
            .await?;
        match outcome {
            Some(outcome) => Ok(outcome.payment),
            None => self.ledger.fetch_transaction(actor, transaction.id).await,
        }
    }

    async fn handle_refund_event(&self, event: &CardWebhookEvent) -> Result<WebhookOutcome, MarketplaceError> {
        let charge = event.charge()?;
        let transaction_ref = match (&charge.payment_intent, charge.metadata.get("transaction_number")) {
            (Some(intent_id), _) => TransactionRef::gateway(PaymentMethod::Card, intent_id.clone()),
            (None, Some(number)) => TransactionRef::number(number.clone()),
            (None, None) => {
                warn!("🔌️ Refund event {} has no payment intent. Ignoring it.", event.id);
                return Ok(WebhookOutcome::Ignored);
            },
        };
        let cumulative = Money::from(charge.amount_refunded);
        let reason = "Refunded at the card processor";
        match self.ledger.apply_gateway_refund(transaction_ref, cumulative, reason, None).await {
            Ok(outcome) => Ok(WebhookOutcome::Refund(outcome)),
            Err(MarketplaceError::NotFound(what)) => {
                warn!("🔌️ Refund event {} refers to an unknown payment ({what}). Ignoring it.", event.id);
                Ok(WebhookOutcome::Ignored)
            },
            Err(e) => Err(e),
        }
    }

    /// A success for a different amount than the ledger expects is turned into a failure.
    async fn check_amount(
        &self,
        event: &CardWebhookEvent,
        settlement: SettlementEvent,
    ) -> Result<SettlementEvent, MarketplaceError> {
        if settlement.outcome != SettlementOutcome::Success {
            return Ok(settlement);
        }
        let intent = event.payment_intent()?;
        let Some(transaction) = self.ledger.resolve(&intent_ref(&intent)).await? else {
            return Ok(settlement);
        };
        if intent.amount == transaction.amount.value() {
            return Ok(settlement);
        }
        let reason = format!(
            "Amount mismatch. The processor charged {} but {} was expected",
            Money::from(intent.amount),
            transaction.amount
        );
        error!("🔌️ {reason} for {}", transaction.transaction_number);
        Ok(SettlementEvent::failure(settlement.transaction_ref, reason, settlement.metadata))
    }

    async fn record_failure(&self, transaction: &Transaction, reason: String) {
        if let Err(e) = self.ledger.fail(TransactionRef::id(transaction.id), &reason).await {
            error!("🔌️ Could not record the failure of {}. {e}", transaction.transaction_number);
        }
    }
}
