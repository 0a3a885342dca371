use chrono::{DateTime, Utc};
use mkt_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::{
    OrderNumber,
    OrderStatusType,
    PaymentMethod,
    PaymentStatus,
    PayoutMethod,
    Role,
    Transaction,
    TransactionStatus,
};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

//--------------------------------------     Pagination      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, limit: DEFAULT_PAGE_SIZE }
    }
}

impl Pagination {
    /// Pages are 1-based. Out-of-range values are clamped rather than rejected.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: Pagination, total: i64) -> Self {
        let pages = (total + pagination.limit - 1) / pagination.limit;
        Self { items, page: pagination.page, limit: pagination.limit, total, pages }
    }
}

//--------------------------------------  OrderQueryFilter   ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderQueryFilter {
    pub order_number: Option<OrderNumber>,
    pub customer_id: Option<i64>,
    pub vendor_id: Option<i64>,
    pub status: Option<Vec<OrderStatusType>>,
    pub payment_status: Option<PaymentStatus>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_customer_id(mut self, id: i64) -> Self {
        self.customer_id = Some(id);
        self
    }

    pub fn with_vendor_id(mut self, id: i64) -> Self {
        self.vendor_id = Some(id);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn with_payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }

    pub fn with_order_number(mut self, number: OrderNumber) -> Self {
        self.order_number = Some(number);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.order_number.is_none()
            && self.customer_id.is_none()
            && self.vendor_id.is_none()
            && self.status.as_ref().map(|s| s.is_empty()).unwrap_or(true)
            && self.payment_status.is_none()
            && self.since.is_none()
            && self.until.is_none()
    }
}

//--------------------------------------     OrderChange     ---------------------------------------------------------
/// A single status-changing (or schedule-changing) edit to an order. Applied with compare-and-set on the prior status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderChange {
    Accept { notes: Option<String> },
    Reject { reason: String },
    Start,
    Complete { notes: Option<String> },
    Cancel { reason: String, by: Role },
    Reschedule { date: DateTime<Utc>, time: String, reason: Option<String> },
}

impl OrderChange {
    /// The status the order lands in after this change, given the status it is in now.
    pub fn target_status(&self, current: OrderStatusType) -> OrderStatusType {
        match self {
            OrderChange::Accept { .. } => OrderStatusType::Accepted,
            OrderChange::Reject { .. } => OrderStatusType::Rejected,
            OrderChange::Start => OrderStatusType::InProgress,
            OrderChange::Complete { .. } => OrderStatusType::Completed,
            OrderChange::Cancel { .. } => OrderStatusType::Cancelled,
            OrderChange::Reschedule { .. } => current,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OrderChange::Accept { .. } => "accept",
            OrderChange::Reject { .. } => "reject",
            OrderChange::Start => "start",
            OrderChange::Complete { .. } => "complete",
            OrderChange::Cancel { .. } => "cancel",
            OrderChange::Reschedule { .. } => "reschedule",
        }
    }
}

//--------------------------------------     Settlement      ---------------------------------------------------------
/// Gateway data recorded alongside a settlement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettlementDetails {
    pub validation_id: Option<String>,
    pub gateway_transaction_id: Option<String>,
    pub gateway_response: Option<serde_json::Value>,
    pub verified_by: Option<i64>,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleResult {
    /// This call moved the transaction to `completed`
    Settled(Transaction),
    /// The transaction had already been settled. Nothing was changed.
    AlreadySettled(Transaction),
}

impl SettleResult {
    pub fn transaction(&self) -> &Transaction {
        match self {
            SettleResult::Settled(t) | SettleResult::AlreadySettled(t) => t,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, SettleResult::Settled(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailResult {
    Failed(Transaction),
    /// The transaction was already in a final state and kept it
    Unchanged(Transaction),
}

impl FailResult {
    pub fn transaction(&self) -> &Transaction {
        match self {
            FailResult::Failed(t) | FailResult::Unchanged(t) => t,
        }
    }
}

//--------------------------------------       Refunds       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefundAmount {
    /// Refund this much more on top of what has already been refunded
    Increment(Money),
    /// The gateway's running total of refunded money. Only the part not yet recorded is applied.
    CumulativeTotal(Money),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRequest {
    pub amount: RefundAmount,
    pub reason: String,
    pub refunded_by: Option<i64>,
    /// Transaction number for the refund ledger entry
    pub entry_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundOutcome {
    pub payment: Transaction,
    pub refund_entry: Transaction,
}

impl RefundOutcome {
    pub fn refunded_now(&self) -> Money {
        self.refund_entry.amount
    }
}

//--------------------------------------     Statistics      ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionQueryFilter {
    pub vendor_id: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TransactionQueryFilter {
    pub fn with_vendor_id(mut self, id: i64) -> Self {
        self.vendor_id = Some(id);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusStats {
    pub status: TransactionStatus,
    pub count: i64,
    pub amount: Money,
}

/// Aggregates over payment entries. Refund ledger entries only contribute to `refunded`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStats {
    pub by_status: Vec<StatusStats>,
    pub total_count: i64,
    pub gross_volume: Money,
    pub commission: Money,
    pub vendor_earnings: Money,
    pub refunded: Money,
}

impl TransactionStats {
    pub fn for_status(&self, status: TransactionStatus) -> Option<&StatusStats> {
        self.by_status.iter().find(|s| s.status == status)
    }
}

//--------------------------------------       Payouts       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayout {
    pub vendor_id: i64,
    pub method: PayoutMethod,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub transaction_count: i64,
    pub amount: Money,
}
