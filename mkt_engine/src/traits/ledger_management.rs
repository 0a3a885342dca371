use chrono::{DateTime, Utc};

use crate::{
    db_types::{NewTransaction, PaymentMethod, Transaction},
    traits::{
        FailResult,
        MarketplaceError,
        RefundOutcome,
        RefundRequest,
        SettleResult,
        SettlementDetails,
        TransactionQueryFilter,
        TransactionStats,
    },
};

/// The transaction ledger.
///
/// Every status change is a conditional update on the current status, so concurrent callbacks for the same
/// transaction cannot apply the same effect twice.
#[allow(async_fn_in_trait)]
pub trait LedgerManagement {
    async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction, MarketplaceError>;

    async fn fetch_transaction(&self, id: i64) -> Result<Option<Transaction>, MarketplaceError>;

    async fn fetch_transaction_by_number(&self, number: &str) -> Result<Option<Transaction>, MarketplaceError>;

    async fn fetch_transaction_by_gateway_reference(
        &self,
        method: PaymentMethod,
        reference: &str,
    ) -> Result<Option<Transaction>, MarketplaceError>;

    async fn transactions_for_order(&self, order_id: i64) -> Result<Vec<Transaction>, MarketplaceError>;

    /// The pending or processing payment for the order, if there is one.
    async fn in_flight_transaction_for_order(&self, order_id: i64) -> Result<Option<Transaction>, MarketplaceError>;

    /// Records the gateway's own identifier once the gateway has accepted the payment attempt.
    async fn set_gateway_reference(&self, id: i64, reference: &str) -> Result<Transaction, MarketplaceError>;

    /// Marks the payment as completed, sets the order's payment status to paid and credits the vendor, all in one
    /// database transaction.
    ///
    /// A transaction that is already settled yields [`SettleResult::AlreadySettled`] and changes nothing. A failure
    /// that was only inferred locally (`expired`) is overridden by a confirmed success.
    async fn settle_transaction(
        &self,
        id: i64,
        details: SettlementDetails,
    ) -> Result<SettleResult, MarketplaceError>;

    /// Marks an in-flight payment as failed. The order's payment status becomes `failed` if it is still pending.
    /// Transactions that are no longer in flight are returned unchanged.
    async fn fail_transaction(
        &self,
        id: i64,
        reason: &str,
        details: SettlementDetails,
    ) -> Result<FailResult, MarketplaceError>;

    /// Like [`Self::fail_transaction`], but flags the failure as locally inferred (timeout, abandoned checkout),
    /// so that a late gateway confirmation can still settle it.
    async fn expire_transaction(&self, id: i64, reason: &str) -> Result<FailResult, MarketplaceError>;

    /// Expires all in-flight card and redirect payments created before `cutoff`.
    async fn expire_stale_transactions(
        &self,
        cutoff: DateTime<Utc>,
        reason: &str,
    ) -> Result<Vec<Transaction>, MarketplaceError>;

    /// Refunds (part of) a settled payment. Returns `None` if there was nothing left to apply, which happens when a
    /// gateway reports a cumulative refund total that is already recorded.
    async fn refund_transaction(
        &self,
        id: i64,
        request: RefundRequest,
    ) -> Result<Option<RefundOutcome>, MarketplaceError>;

    async fn transaction_stats(&self, filter: TransactionQueryFilter) -> Result<TransactionStats, MarketplaceError>;
}
