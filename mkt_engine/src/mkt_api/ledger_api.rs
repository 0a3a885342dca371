use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;
use mkt_common::{Money, Percent};

use crate::{
    db_types::{
        Actor,
        NewTransaction,
        Order,
        OrderNumber,
        OrderStatusType,
        PaymentMethod,
        PaymentProof,
        PaymentStatus,
        Role,
        Transaction,
        TransactionStatus,
        TransactionType,
    },
    events::{EventProducers, PaymentEvent, PaymentEventKind},
    helpers::{new_transaction_number, with_fresh_number},
    mkt_api::{
        access::{authorize_order, load_contacts, vendor_for_actor},
        ledger_objects::{SettlementEvent, SettlementOutcome, SettlementResult, TransactionRef},
        order_objects::required,
    },
    traits::{
        CatalogManagement,
        FailResult,
        LedgerManagement,
        MarketplaceError,
        OrderManagement,
        RefundAmount,
        RefundOutcome,
        RefundRequest,
        TransactionQueryFilter,
        TransactionStats,
    },
};

pub const PAYMENT_TIMED_OUT: &str = "payment timed out";
const SUPERSEDED: &str = "superseded by a new payment attempt";

/// The transaction ledger API. Gateway adapters and admin tooling go through here; nothing else writes to the
/// transactions table.
#[derive(Clone)]
pub struct LedgerApi<B> {
    db: B,
    producers: EventProducers,
    default_commission_rate: Percent,
}

impl<B> Debug for LedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerApi (commission {})", self.default_commission_rate)
    }
}

impl<B> LedgerApi<B> {
    pub fn new(db: B, producers: EventProducers, default_commission_rate: Percent) -> Self {
        Self { db, producers, default_commission_rate }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> LedgerApi<B>
where B: CatalogManagement + OrderManagement + LedgerManagement
{
    /// Opens a payment attempt for an order.
    ///
    /// The order must be accepted or completed and not yet paid. An unfinished card or redirect attempt for the same
    /// order is expired first; an unfinished manual payment blocks new attempts until an admin has decided on it.
    /// The commission is taken at the vendor's own rate if it has one, otherwise at the platform default.
    /// Manual payments carry the customer's proof of payment and start out as `processing`.
    pub async fn initiate(
        &self,
        actor: &Actor,
        number: &OrderNumber,
        method: PaymentMethod,
        proof: Option<PaymentProof>,
    ) -> Result<(Order, Transaction), MarketplaceError> {
        let order = self.order_by_number(number).await?;
        if actor.role == Role::Vendor {
            return Err(MarketplaceError::forbidden("Vendors cannot pay for orders"));
        }
        authorize_order(&self.db, actor, &order, false).await?;
        if !matches!(order.status, OrderStatusType::Accepted | OrderStatusType::Completed) {
            return Err(MarketplaceError::InvalidState(format!(
                "Order {number} is {} and cannot be paid for yet",
                order.status
            )));
        }
        if order.payment_status == PaymentStatus::Paid {
            return Err(MarketplaceError::Conflict(format!("Order {number} has already been paid")));
        }
        if let Some(existing) = self.db.in_flight_transaction_for_order(order.id).await? {
            if existing.payment_method == PaymentMethod::Manual {
                return Err(MarketplaceError::Conflict(format!(
                    "Payment {} for order {number} is awaiting verification",
                    existing.transaction_number
                )));
            }
            info!("💳️ Expiring unfinished payment {} for order [{number}]", existing.transaction_number);
            self.db.expire_transaction(existing.id, SUPERSEDED).await?;
        }
        let vendor = self
            .db
            .fetch_vendor(order.vendor_id)
            .await?
            .ok_or_else(|| MarketplaceError::not_found(format!("Vendor {}", order.vendor_id)))?;
        let rate = vendor.commission_rate.unwrap_or(self.default_commission_rate);
        let transaction = with_fresh_number(new_transaction_number, |n| {
            let mut payment = NewTransaction::payment(&order, method, rate, n);
            payment.payment_proof = proof.clone();
            self.db.insert_transaction(payment)
        })
        .await?;
        info!(
            "💳️ Payment {} opened for order [{number}]: {} {} by {method}, commission {} at {rate}",
            transaction.transaction_number,
            transaction.amount,
            transaction.currency,
            transaction.commission_amount
        );
        Ok((order, transaction))
    }

    pub async fn resolve(&self, transaction_ref: &TransactionRef) -> Result<Option<Transaction>, MarketplaceError> {
        match transaction_ref {
            TransactionRef::Id { id } => self.db.fetch_transaction(*id).await,
            TransactionRef::Number { number } => self.db.fetch_transaction_by_number(number).await,
            TransactionRef::Gateway { method, reference } => {
                self.db.fetch_transaction_by_gateway_reference(*method, reference).await
            },
        }
    }

    async fn resolve_payment(&self, transaction_ref: &TransactionRef) -> Result<Transaction, MarketplaceError> {
        let transaction = self
            .resolve(transaction_ref)
            .await?
            .ok_or_else(|| MarketplaceError::not_found(format!("Transaction {transaction_ref}")))?;
        if transaction.transaction_type != TransactionType::Payment {
            return Err(MarketplaceError::InvalidState(format!(
                "Transaction {} is a refund entry",
                transaction.transaction_number
            )));
        }
        Ok(transaction)
    }

    /// Applies a gateway's verdict to a payment.
    ///
    /// Repeated confirmations are harmless: the storage layer only settles a payment that is still in flight, so a
    /// second webhook, IPN or redirect for the same payment comes back as [`SettlementResult::AlreadySettled`]. In the
    /// same way, a failure report for a payment that is already final is returned as [`SettlementResult::Unchanged`].
    pub async fn settle(&self, event: SettlementEvent) -> Result<SettlementResult, MarketplaceError> {
        let transaction = self.resolve_payment(&event.transaction_ref).await?;
        let number = transaction.transaction_number.clone();
        match event.outcome {
            SettlementOutcome::Success => {
                let result = self.db.settle_transaction(transaction.id, event.metadata).await?;
                if result.is_new() {
                    info!("💳️ Payment {number} settled for {}", transaction.amount);
                    self.publish(result.transaction().clone(), PaymentEventKind::Settled).await;
                    self.warn_on_double_payment(result.transaction()).await;
                } else {
                    info!("💳️ Payment {number} was already settled. Ignoring the repeated confirmation.");
                }
                Ok(result.into())
            },
            SettlementOutcome::Failure { reason } => {
                let result = self.db.fail_transaction(transaction.id, &reason, event.metadata).await?;
                Ok(self.on_fail_result(result, reason).await)
            },
        }
    }

    /// Records an adapter-level failure, e.g. the gateway refused to open a session.
    pub async fn fail(
        &self,
        transaction_ref: TransactionRef,
        reason: &str,
    ) -> Result<SettlementResult, MarketplaceError> {
        let event = SettlementEvent::failure(transaction_ref, reason, Default::default());
        self.settle(event).await
    }

    /// Marks a payment as failed on local evidence only (the customer abandoned the checkout, or it timed out).
    /// A confirmed success from the gateway arriving later still settles it.
    pub async fn abandon(
        &self,
        transaction_ref: TransactionRef,
        reason: &str,
    ) -> Result<SettlementResult, MarketplaceError> {
        let transaction = self.resolve_payment(&transaction_ref).await?;
        let result = self.db.expire_transaction(transaction.id, reason).await?;
        Ok(self.on_fail_result(result, reason.to_string()).await)
    }

    async fn on_fail_result(&self, result: FailResult, reason: String) -> SettlementResult {
        match result {
            FailResult::Failed(t) => {
                info!("💳️ Payment {} failed. {reason}", t.transaction_number);
                self.publish(t.clone(), PaymentEventKind::Failed { reason }).await;
                SettlementResult::Failed(t)
            },
            FailResult::Unchanged(t) => {
                debug!(
                    "💳️ Payment {} is already {}. Ignoring failure report: {reason}",
                    t.transaction_number, t.status
                );
                SettlementResult::Unchanged(t)
            },
        }
    }

    /// Checks that `amount` could be refunded from the payment right now, without changing anything.
    pub async fn check_refundable(&self, id: i64, amount: Money) -> Result<Transaction, MarketplaceError> {
        let transaction = self.resolve_payment(&TransactionRef::id(id)).await?;
        if !matches!(transaction.status, TransactionStatus::Completed | TransactionStatus::PartiallyRefunded) {
            return Err(MarketplaceError::InvalidState(format!(
                "Transaction {} is {} and cannot be refunded",
                transaction.transaction_number, transaction.status
            )));
        }
        if !amount.is_positive() {
            return Err(MarketplaceError::validation("Refund amount must be positive"));
        }
        if amount > transaction.amount {
            return Err(MarketplaceError::Validation(format!(
                "Refund amount {amount} exceeds the transaction amount {}",
                transaction.amount
            )));
        }
        Ok(transaction)
    }

    /// Records a refund that was made outside any gateway (or for a manual payment). Admins only.
    ///
    /// Amounts above what is left to refund are capped. Refunding everything that is left moves the payment to
    /// `refunded`, anything less to `partially_refunded`. The order's payment status becomes `refunded` either way.
    pub async fn refund(
        &self,
        actor: &Actor,
        id: i64,
        amount: Money,
        reason: Option<String>,
    ) -> Result<RefundOutcome, MarketplaceError> {
        if !actor.role.is_admin() {
            return Err(MarketplaceError::forbidden("Only admins can issue refunds"));
        }
        let reason = required(reason, "refund reason")?;
        self.check_refundable(id, amount).await?;
        self.record_refund(id, RefundAmount::Increment(amount), reason, Some(actor.id))
            .await?
            .ok_or_else(|| MarketplaceError::invalid_state("Nothing left to refund"))
    }

    /// Brings the ledger in line with a gateway's running refund total for a payment. Only the part that has not been
    /// recorded yet is applied, so replayed refund notifications do nothing.
    pub async fn apply_gateway_refund(
        &self,
        transaction_ref: TransactionRef,
        cumulative: Money,
        reason: &str,
        refunded_by: Option<i64>,
    ) -> Result<Option<RefundOutcome>, MarketplaceError> {
        let transaction = self.resolve_payment(&transaction_ref).await?;
        self.record_refund(transaction.id, RefundAmount::CumulativeTotal(cumulative), reason.to_string(), refunded_by)
            .await
    }

    async fn record_refund(
        &self,
        id: i64,
        amount: RefundAmount,
        reason: String,
        refunded_by: Option<i64>,
    ) -> Result<Option<RefundOutcome>, MarketplaceError> {
        let outcome = with_fresh_number(new_transaction_number, |entry_number| {
            let request = RefundRequest { amount, reason: reason.clone(), refunded_by, entry_number };
            self.db.refund_transaction(id, request)
        })
        .await?;
        if let Some(outcome) = &outcome {
            info!(
                "💳️ Refunded {} of payment {}. It is now {}",
                outcome.refunded_now(),
                outcome.payment.transaction_number,
                outcome.payment.status
            );
            let kind = PaymentEventKind::Refunded { amount: outcome.refunded_now() };
            self.publish(outcome.payment.clone(), kind).await;
        }
        Ok(outcome)
    }

    /// Ledger statistics. Vendors always get their own figures only.
    pub async fn transaction_stats(
        &self,
        actor: &Actor,
        filter: TransactionQueryFilter,
    ) -> Result<TransactionStats, MarketplaceError> {
        let filter = match actor.role {
            Role::Admin | Role::SuperAdmin => filter,
            Role::Vendor => {
                let vendor = vendor_for_actor(&self.db, actor).await?;
                filter.with_vendor_id(vendor.id)
            },
            Role::Customer => return Err(MarketplaceError::forbidden("Customers cannot view ledger statistics")),
        };
        self.db.transaction_stats(filter).await
    }

    pub async fn transactions_for_order(
        &self,
        actor: &Actor,
        number: &OrderNumber,
    ) -> Result<Vec<Transaction>, MarketplaceError> {
        let order = self.order_by_number(number).await?;
        authorize_order(&self.db, actor, &order, false).await?;
        self.db.transactions_for_order(order.id).await
    }

    /// Fetches a transaction the actor is allowed to see.
    pub async fn fetch_transaction(&self, actor: &Actor, id: i64) -> Result<Transaction, MarketplaceError> {
        let transaction = self
            .db
            .fetch_transaction(id)
            .await?
            .ok_or_else(|| MarketplaceError::not_found(format!("Transaction #{id}")))?;
        if !actor.role.is_admin() {
            let order = self
                .db
                .fetch_order(transaction.order_id)
                .await?
                .ok_or_else(|| MarketplaceError::not_found(format!("Order #{}", transaction.order_id)))?;
            authorize_order(&self.db, actor, &order, false).await?;
        }
        Ok(transaction)
    }

    pub async fn fetch_by_number(&self, number: &str) -> Result<Option<Transaction>, MarketplaceError> {
        self.db.fetch_transaction_by_number(number).await
    }

    /// Fails card and redirect payments that have been in flight for longer than `max_age`. The failures are flagged
    /// as locally inferred, so a late confirmation from the gateway still wins.
    pub async fn expire_stale_transactions(&self, max_age: Duration) -> Result<Vec<Transaction>, MarketplaceError> {
        let cutoff = Utc::now() - max_age;
        let expired = self.db.expire_stale_transactions(cutoff, PAYMENT_TIMED_OUT).await?;
        for t in &expired {
            info!("💳️ Payment {} timed out", t.transaction_number);
            self.publish(t.clone(), PaymentEventKind::Failed { reason: PAYMENT_TIMED_OUT.into() }).await;
        }
        Ok(expired)
    }

    /// A second attempt can settle after the first one was expired locally but then confirmed by the gateway. Both
    /// stay settled; the duplicate has to be refunded by an admin.
    async fn warn_on_double_payment(&self, settled: &Transaction) {
        let others = match self.db.transactions_for_order(settled.order_id).await {
            Ok(list) => list,
            Err(e) => {
                warn!("💳️ Could not check order #{} for duplicate payments. {e}", settled.order_id);
                return;
            },
        };
        let duplicates = others
            .iter()
            .filter(|t| t.id != settled.id && t.transaction_type == TransactionType::Payment && t.status.is_settled())
            .map(|t| t.transaction_number.as_str())
            .collect::<Vec<_>>();
        if !duplicates.is_empty() {
            warn!(
                "💳️ Order #{} has been paid more than once. {} settled alongside {}. A refund is required.",
                settled.order_id,
                settled.transaction_number,
                duplicates.join(", ")
            );
        }
    }

    async fn order_by_number(&self, number: &OrderNumber) -> Result<Order, MarketplaceError> {
        self.db
            .fetch_order_by_number(number)
            .await?
            .ok_or_else(|| MarketplaceError::not_found(format!("Order {number}")))
    }

    async fn publish(&self, transaction: Transaction, kind: PaymentEventKind) {
        let order_number = match self.db.fetch_order(transaction.order_id).await {
            Ok(Some(order)) => order.order_number,
            Ok(None) => OrderNumber::default(),
            Err(e) => {
                warn!("📬️ Could not load order #{} for a payment event. {e}", transaction.order_id);
                OrderNumber::default()
            },
        };
        let contacts = load_contacts(&self.db, transaction.customer_id, transaction.vendor_id).await;
        let event = PaymentEvent { transaction, order_number, kind, contacts };
        self.producers.publish_payment_event(event).await;
    }
}
