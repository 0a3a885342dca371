use std::fmt::Display;

use gateway_tools::{GatewayApiError, RedirectCallback, RedirectGateway, RedirectSessionRequest, RedirectValidation};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Actor, OrderNumber, PaymentMethod, Transaction},
    gateways::{callback::GatewayCallback, GatewayConfig},
    mkt_api::{
        ledger_api::LedgerApi,
        ledger_objects::{SettlementEvent, SettlementResult, TransactionRef},
    },
    traits::{CatalogManagement, LedgerManagement, MarketplaceError, OrderManagement},
};

const NOT_PROVIDED: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectInit {
    pub transaction_number: String,
    pub gateway_url: String,
    pub session_key: Option<String>,
}

/// Which endpoint the gateway (or the customer's browser) called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectCallbackKind {
    Success,
    Fail,
    Cancel,
    Ipn,
}

impl Display for RedirectCallbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RedirectCallbackKind::Success => "success",
            RedirectCallbackKind::Fail => "fail",
            RedirectCallbackKind::Cancel => "cancel",
            RedirectCallbackKind::Ipn => "ipn",
        };
        write!(f, "{s}")
    }
}

enum ValidationVerdict {
    Settle(SettlementEvent),
    Abandon(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectOutcome {
    pub result: SettlementResult,
    /// Where to send the customer's browser
    pub redirect_url: String,
}

/// Hosted-checkout payments. The browser is sent to the gateway and back, and the gateway separately posts an IPN.
///
/// The browser callbacks and the IPN all end up in [`LedgerApi::settle`], so whichever arrives first settles the
/// payment and the others are no-ops. Nothing in a callback body is trusted: a success is only acted on once the
/// gateway's validation API has confirmed the `val_id`, and the validated transaction id, amount and currency match the
/// ledger.
pub struct RedirectAdapter<B, G> {
    ledger: LedgerApi<B>,
    gateway: G,
    config: GatewayConfig,
}

impl<B, G> RedirectAdapter<B, G> {
    pub fn new(ledger: LedgerApi<B>, gateway: G, config: GatewayConfig) -> Self {
        Self { ledger, gateway, config }
    }

    pub fn ledger(&self) -> &LedgerApi<B> {
        &self.ledger
    }
}

impl<B, G> RedirectAdapter<B, G>
where
    B: CatalogManagement + OrderManagement + LedgerManagement,
    G: RedirectGateway,
{
    /// Opens a payment attempt and a checkout session, returning the URL to send the customer to.
    pub async fn init(&self, actor: &Actor, number: &OrderNumber) -> Result<RedirectInit, MarketplaceError> {
        let (order, transaction) = self.ledger.initiate(actor, number, PaymentMethod::Redirect, None).await?;
        let customer = match self.ledger.db().fetch_user(order.customer_id).await {
            Ok(c) => c,
            Err(e) => {
                warn!("🔌️ Could not load customer #{} for the checkout session. {e}", order.customer_id);
                None
            },
        };
        let request = RedirectSessionRequest {
            transaction_number: transaction.transaction_number.clone(),
            amount: transaction.amount,
            currency: transaction.currency.clone(),
            success_url: self.config.redirect_callback_url("success"),
            fail_url: self.config.redirect_callback_url("fail"),
            cancel_url: self.config.redirect_callback_url("cancel"),
            ipn_url: self.config.redirect_callback_url("ipn"),
            product_name: order.service_name.clone(),
            customer_name: customer.as_ref().map(|c| c.name.clone()).unwrap_or_else(|| NOT_PROVIDED.into()),
            customer_email: customer.as_ref().map(|c| c.email.clone()).unwrap_or_else(|| NOT_PROVIDED.into()),
            customer_phone: customer.and_then(|c| c.phone).unwrap_or_else(|| NOT_PROVIDED.into()),
        };
        let session = match self.gateway.init_session(request).await {
            Ok(session) if session.is_success() => session,
            Ok(session) => {
                let reason = session.failed_reason.unwrap_or_else(|| format!("status {}", session.status));
                error!("🔌️ Gateway refused a session for {}. {reason}", transaction.transaction_number);
                self.record_failure(&transaction, format!("Gateway refused the session. {reason}")).await;
                return Err(MarketplaceError::Gateway(GatewayApiError::Rejected(reason)));
            },
            Err(e) => {
                error!("🔌️ Could not open a session for {}. {e}", transaction.transaction_number);
                self.record_failure(&transaction, format!("Could not open a checkout session. {e}")).await;
                return Err(e.into());
            },
        };
        let reference = session.session_key.clone().unwrap_or_else(|| transaction.transaction_number.clone());
        self.ledger.db().set_gateway_reference(transaction.id, &reference).await?;
        info!("🔌️ Checkout session opened for {} ({})", transaction.transaction_number, order.order_number);
        Ok(RedirectInit {
            transaction_number: transaction.transaction_number,
            gateway_url: session.gateway_page_url.unwrap_or_default(),
            session_key: session.session_key,
        })
    }

    /// Handles a browser redirect or an IPN.
    ///
    /// * `success` and IPN posts with a `val_id` are validated with the gateway and settled (or failed on an amount
    ///   mismatch). A `val_id` for another transaction is a `Validation` error, and if the validation call itself
    ///   fails a `Gateway` error is returned. Nothing changes in either case.
    /// * `fail`, `cancel` and failed IPNs only tell us what the customer saw, so the payment is failed as abandoned.
    ///   A validated success arriving later still settles it.
    pub async fn handle_callback(
        &self,
        kind: RedirectCallbackKind,
        callback: RedirectCallback,
    ) -> Result<RedirectOutcome, MarketplaceError> {
        let transaction_ref = TransactionRef::number(callback.tran_id.clone());
        let transaction = self
            .ledger
            .resolve(&transaction_ref)
            .await?
            .ok_or_else(|| MarketplaceError::not_found(format!("Transaction {}", callback.tran_id)))?;
        if transaction.payment_method != PaymentMethod::Redirect {
            return Err(MarketplaceError::validation("Not a redirect-gateway payment"));
        }
        debug!("🔌️ Redirect {kind} callback for {}", transaction.transaction_number);
        let val_id = callback.val_id.as_deref().map(str::trim).filter(|v| !v.is_empty());
        let result = match (kind, val_id) {
            (RedirectCallbackKind::Success | RedirectCallbackKind::Ipn, Some(val_id)) => {
                let validation = self.gateway.validate(val_id).await?;
                match self.check_validation(&transaction, validation)? {
                    ValidationVerdict::Settle(settlement) => self.ledger.settle(settlement).await?,
                    ValidationVerdict::Abandon(reason) => self.ledger.abandon(transaction_ref, &reason).await?,
                }
            },
            (RedirectCallbackKind::Success, None) => {
                return Err(MarketplaceError::validation("The success callback did not include a validation id"));
            },
            (RedirectCallbackKind::Ipn, None) if !reports_failure(&callback) => {
                return Err(MarketplaceError::validation("The IPN did not include a validation id"));
            },
            (RedirectCallbackKind::Cancel, _) => {
                self.ledger.abandon(transaction_ref, "The customer cancelled the payment").await?
            },
            (RedirectCallbackKind::Fail | RedirectCallbackKind::Ipn, _) => {
                let reason = callback
                    .error
                    .clone()
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| "The gateway reported the payment as failed".to_string());
                self.ledger.abandon(transaction_ref, &reason).await?
            },
        };
        let order_number = match self.ledger.db().fetch_order(transaction.order_id).await? {
            Some(order) => order.order_number.to_string(),
            None => String::default(),
        };
        let outcome = match (&result, kind) {
            (r, _) if r.is_paid() => "success",
            (_, RedirectCallbackKind::Cancel) => "cancel",
            _ => "fail",
        };
        let redirect_url = self.config.client_result_url(outcome, &order_number, &transaction.transaction_number);
        Ok(RedirectOutcome { result, redirect_url })
    }

    /// Checks the gateway's validation against the ledger entry.
    ///
    /// A validation for some other transaction is refused and leaves the payment alone, since anyone can post a
    /// callback with a borrowed `val_id`. A validation that is not `VALID` only abandons the attempt. A validated
    /// payment whose amount or currency differs from the ledger fails outright.
    fn check_validation(
        &self,
        transaction: &Transaction,
        validation: RedirectValidation,
    ) -> Result<ValidationVerdict, MarketplaceError> {
        if validation.tran_id != transaction.transaction_number {
            warn!(
                "🔌️ Validation {} belongs to transaction '{}', not {}. Ignoring the callback.",
                validation.val_id, validation.tran_id, transaction.transaction_number
            );
            return Err(MarketplaceError::validation("The validation does not belong to this transaction"));
        }
        if !validation.is_valid() {
            return Ok(ValidationVerdict::Abandon(format!("The gateway reported the payment as {}", validation.status)));
        }
        let transaction_ref = TransactionRef::id(transaction.id);
        let mismatch = if !validation.currency.eq_ignore_ascii_case(&transaction.currency) {
            Some(format!("Validated currency {} does not match {}", validation.currency, transaction.currency))
        } else {
            match validation.amount() {
                Ok(amount) if amount == transaction.amount => None,
                Ok(amount) => Some(format!("Validated amount {amount} does not match {}", transaction.amount)),
                Err(e) => Some(format!("Validated amount is unreadable. {e}")),
            }
        };
        if let Some(reason) = mismatch {
            error!("🔌️ {reason} for {}", transaction.transaction_number);
            return Ok(ValidationVerdict::Settle(SettlementEvent::failure(transaction_ref, reason, Default::default())));
        }
        let mut settlement = GatewayCallback::Redirect { validation }
            .into_settlement()?
            .ok_or_else(|| MarketplaceError::invalid_state("The validation carried no verdict"))?;
        settlement.transaction_ref = transaction_ref;
        Ok(ValidationVerdict::Settle(settlement))
    }

    async fn record_failure(&self, transaction: &Transaction, reason: String) {
        if let Err(e) = self.ledger.fail(TransactionRef::id(transaction.id), &reason).await {
            error!("🔌️ Could not record the failure of {}. {e}", transaction.transaction_number);
        }
    }
}

/// The gateway's IPN status values for payments that did not go through.
fn reports_failure(callback: &RedirectCallback) -> bool {
    callback
        .status
        .as_deref()
        .map(|s| matches!(s.to_ascii_uppercase().as_str(), "FAILED" | "CANCELLED" | "UNATTEMPTED" | "EXPIRED"))
        .unwrap_or(false)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ipn_failure_statuses() {
        let mut callback = RedirectCallback { tran_id: "TXN-1".into(), ..Default::default() };
        assert!(!reports_failure(&callback));
        callback.status = Some("FAILED".into());
        assert!(reports_failure(&callback));
        callback.status = Some("cancelled".into());
        assert!(reports_failure(&callback));
        callback.status = Some("VALID".into());
        assert!(!reports_failure(&callback));
    }
}
