//! `SqliteDatabase` is the concrete marketplace backend. It implements every trait in [`crate::traits`].
//!
//! Multi-step writes (settlement, refunds, coupon redemption, payout requests) each run inside one sqlx transaction,
//! and the first statement of each is the conditional update that guards it.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use mkt_common::Money;
use sqlx::{migrate, SqlitePool};

use super::db::{catalog, coupons, db_url, new_pool, orders, payouts, transactions};
use crate::{
    db_types::{
        Coupon,
        NewCoupon,
        NewOrder,
        NewService,
        NewTransaction,
        NewUser,
        NewVendor,
        Order,
        OrderNumber,
        OrderStatusType,
        PaymentMethod,
        PaymentStatus,
        Payout,
        PayoutStatus,
        Service,
        Transaction,
        TransactionStatus,
        UserProfile,
        Vendor,
        VendorStatus,
    },
    traits::{
        Balance,
        CatalogManagement,
        CouponManagement,
        FailResult,
        LedgerManagement,
        MarketplaceDatabase,
        MarketplaceError,
        NewPayout,
        OrderChange,
        OrderManagement,
        OrderQueryFilter,
        Page,
        Pagination,
        PayoutManagement,
        RefundAmount,
        RefundOutcome,
        RefundRequest,
        SettleResult,
        SettlementDetails,
        TransactionQueryFilter,
        TransactionStats,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `MKT_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    /// Runs the embedded migrations. Safe to call on every start-up.
    pub async fn migrate(&self) -> Result<(), MarketplaceError> {
        migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&mut self) -> Result<(), MarketplaceError> {
        self.pool.close().await;
        Ok(())
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn create_user(&self, user: NewUser) -> Result<UserProfile, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let user = catalog::insert_user(user, &mut tx).await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn fetch_user(&self, id: i64) -> Result<Option<UserProfile>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_user(id, &mut conn).await?)
    }

    async fn create_vendor(&self, vendor: NewVendor) -> Result<Vendor, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let vendor = catalog::insert_vendor(vendor, &mut tx).await?;
        tx.commit().await?;
        Ok(vendor)
    }

    async fn fetch_vendor(&self, id: i64) -> Result<Option<Vendor>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_vendor(id, &mut conn).await?)
    }

    async fn fetch_vendor_by_user(&self, user_id: i64) -> Result<Option<Vendor>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_vendor_by_user(user_id, &mut conn).await?)
    }

    async fn update_vendor_status(
        &self,
        vendor_id: i64,
        status: VendorStatus,
        is_active: bool,
    ) -> Result<Vendor, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let vendor = catalog::update_vendor_status(vendor_id, status, is_active, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::not_found(format!("Vendor #{vendor_id}")))?;
        tx.commit().await?;
        Ok(vendor)
    }

    async fn create_service(&self, service: NewService) -> Result<Service, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let service = catalog::insert_service(service, &mut tx).await?;
        tx.commit().await?;
        Ok(service)
    }

    async fn fetch_service(&self, id: i64) -> Result<Option<Service>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_service(id, &mut conn).await?)
    }

    async fn set_service_availability(
        &self,
        service_id: i64,
        is_active: bool,
        is_available: bool,
    ) -> Result<Service, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let service = catalog::set_service_availability(service_id, is_active, is_available, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::not_found(format!("Service #{service_id}")))?;
        tx.commit().await?;
        Ok(service)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(id, &mut conn).await?)
    }

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_number(number, &mut conn).await?)
    }

    async fn search_orders(
        &self,
        query: OrderQueryFilter,
        pagination: Pagination,
    ) -> Result<Page<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(query, pagination, &mut conn).await?)
    }

    async fn transition_order(
        &self,
        order_id: i64,
        expected: OrderStatusType,
        change: OrderChange,
    ) -> Result<Option<Order>, MarketplaceError> {
        let is_completion = matches!(change, OrderChange::Complete { .. });
        let mut tx = self.pool.begin().await?;
        let order = orders::transition_order(order_id, expected, change, &mut tx).await?;
        if let (Some(order), true) = (&order, is_completion) {
            catalog::increment_completed_orders(order.vendor_id, &mut tx).await?;
        }
        tx.commit().await?;
        Ok(order)
    }
}

impl CouponManagement for SqliteDatabase {
    async fn create_coupon(&self, coupon: NewCoupon) -> Result<Coupon, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let coupon = coupons::insert_coupon(coupon, &mut tx).await?;
        tx.commit().await?;
        Ok(coupon)
    }

    async fn fetch_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(coupons::fetch_coupon_by_code(code, &mut conn).await?)
    }

    async fn coupon_usage_for_user(&self, coupon_id: i64, user_id: i64) -> Result<i64, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(coupons::usage_for_user(coupon_id, user_id, &mut conn).await?)
    }

    async fn redeem_coupon(&self, coupon: &Coupon, order: &Order, discount: Money) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        if !coupons::increment_usage(coupon.id, &mut tx).await? {
            return Err(MarketplaceError::Conflict(format!("Coupon {} has reached its usage limit", coupon.code)));
        }
        if let Some(limit) = coupon.per_user_limit {
            // The increment above holds the write lock, so this count cannot move under us
            let used = coupons::usage_for_user(coupon.id, order.customer_id, &mut tx).await?;
            if used >= limit {
                return Err(MarketplaceError::Conflict(format!(
                    "Coupon {} has already been used the maximum number of times",
                    coupon.code
                )));
            }
        }
        coupons::record_usage(coupon.id, order.customer_id, order.id, discount, &mut tx).await?;
        let updated = orders::apply_coupon(order.id, &coupon.code, discount, &mut tx).await?.ok_or_else(|| {
            MarketplaceError::invalid_state("A coupon can only be applied once, to a pending order")
        })?;
        tx.commit().await?;
        debug!("🗃️ Coupon {} redeemed on order [{}] for {discount}", coupon.code, updated.order_number);
        Ok(updated)
    }
}

impl LedgerManagement for SqliteDatabase {
    async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction, MarketplaceError> {
        let mut db_tx = self.pool.begin().await?;
        let inserted = transactions::insert_transaction(tx, &mut db_tx).await?;
        db_tx.commit().await?;
        Ok(inserted)
    }

    async fn fetch_transaction(&self, id: i64) -> Result<Option<Transaction>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::fetch_transaction(id, &mut conn).await?)
    }

    async fn fetch_transaction_by_number(&self, number: &str) -> Result<Option<Transaction>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::fetch_transaction_by_number(number, &mut conn).await?)
    }

    async fn fetch_transaction_by_gateway_reference(
        &self,
        method: PaymentMethod,
        reference: &str,
    ) -> Result<Option<Transaction>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::fetch_transaction_by_gateway_reference(method, reference, &mut conn).await?)
    }

    async fn transactions_for_order(&self, order_id: i64) -> Result<Vec<Transaction>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::transactions_for_order(order_id, &mut conn).await?)
    }

    async fn in_flight_transaction_for_order(&self, order_id: i64) -> Result<Option<Transaction>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::in_flight_for_order(order_id, &mut conn).await?)
    }

    async fn set_gateway_reference(&self, id: i64, reference: &str) -> Result<Transaction, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let updated = transactions::set_gateway_reference(id, reference, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::not_found(format!("Transaction #{id}")))?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn settle_transaction(&self, id: i64, details: SettlementDetails) -> Result<SettleResult, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        if let Some(settled) = transactions::settle(id, details, &mut tx).await? {
            let order = orders::set_payment_status(
                settled.order_id,
                PaymentStatus::Paid,
                Some(settled.payment_method),
                &mut tx,
            )
            .await?
            .ok_or_else(|| MarketplaceError::not_found(format!("Order #{}", settled.order_id)))?;
            catalog::adjust_vendor_earnings(
                settled.vendor_id,
                settled.vendor_amount.value(),
                settled.commission_amount.value(),
                &mut tx,
            )
            .await?;
            tx.commit().await?;
            debug!(
                "🗃️ Transaction {} settled. Order [{}] is paid and vendor #{} credited {}",
                settled.transaction_number, order.order_number, settled.vendor_id, settled.vendor_amount
            );
            return Ok(SettleResult::Settled(settled));
        }
        let current = transactions::fetch_transaction(id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::not_found(format!("Transaction #{id}")))?;
        tx.rollback().await?;
        if current.status.is_settled() {
            trace!("🗃️ Transaction {} was already settled", current.transaction_number);
            Ok(SettleResult::AlreadySettled(current))
        } else {
            Err(MarketplaceError::InvalidState(format!(
                "Transaction {} is {} and cannot be settled",
                current.transaction_number, current.status
            )))
        }
    }

    async fn fail_transaction(
        &self,
        id: i64,
        reason: &str,
        details: SettlementDetails,
    ) -> Result<FailResult, MarketplaceError> {
        self.fail_in_flight(id, reason, false, details).await
    }

    async fn expire_transaction(&self, id: i64, reason: &str) -> Result<FailResult, MarketplaceError> {
        self.fail_in_flight(id, reason, true, SettlementDetails::default()).await
    }

    async fn expire_stale_transactions(
        &self,
        cutoff: DateTime<Utc>,
        reason: &str,
    ) -> Result<Vec<Transaction>, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let expired = transactions::expire_stale(cutoff, reason, &mut tx).await?;
        for t in &expired {
            orders::mark_payment_failed(t.order_id, &mut tx).await?;
        }
        tx.commit().await?;
        Ok(expired)
    }

    async fn refund_transaction(
        &self,
        id: i64,
        request: RefundRequest,
    ) -> Result<Option<RefundOutcome>, MarketplaceError> {
        let current = self
            .fetch_transaction(id)
            .await?
            .ok_or_else(|| MarketplaceError::not_found(format!("Transaction #{id}")))?;
        let Some(plan) = RefundPlan::new(&current, request.amount)? else {
            trace!("🗃️ Refund on {} is already recorded", current.transaction_number);
            return Ok(None);
        };
        let mut tx = self.pool.begin().await?;
        let payment = transactions::apply_refund(
            id,
            current.refund_amount,
            plan.new_total,
            plan.status,
            &request.reason,
            request.refunded_by,
            &mut tx,
        )
        .await?
        .ok_or_else(|| {
            MarketplaceError::Conflict(format!(
                "Transaction {} was refunded concurrently. Please retry.",
                current.transaction_number
            ))
        })?;
        // Commission is refunded as the difference of the commission on the running totals, so repeated partial
        // refunds can never return more commission than was taken.
        let commission =
            plan.new_total.percent(current.commission_rate) - current.refund_amount.percent(current.commission_rate);
        let entry = transactions::insert_refund_entry(
            &payment,
            &request.entry_number,
            plan.delta,
            commission,
            &request.reason,
            request.refunded_by,
            &mut tx,
        )
        .await?;
        orders::set_payment_status(payment.order_id, PaymentStatus::Refunded, None, &mut tx).await?;
        catalog::adjust_vendor_earnings(
            payment.vendor_id,
            -(plan.delta - commission).value(),
            -commission.value(),
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        debug!(
            "🗃️ Refunded {} of transaction {}. It is now {}",
            plan.delta, payment.transaction_number, payment.status
        );
        Ok(Some(RefundOutcome { payment, refund_entry: entry }))
    }

    async fn transaction_stats(&self, filter: TransactionQueryFilter) -> Result<TransactionStats, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::transaction_stats(filter, &mut conn).await?)
    }
}

impl SqliteDatabase {
    async fn fail_in_flight(
        &self,
        id: i64,
        reason: &str,
        expired: bool,
        details: SettlementDetails,
    ) -> Result<FailResult, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        if let Some(failed) = transactions::fail(id, reason, expired, details, &mut tx).await? {
            orders::mark_payment_failed(failed.order_id, &mut tx).await?;
            tx.commit().await?;
            return Ok(FailResult::Failed(failed));
        }
        let current = transactions::fetch_transaction(id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::not_found(format!("Transaction #{id}")))?;
        tx.rollback().await?;
        Ok(FailResult::Unchanged(current))
    }
}

/// What a refund request amounts to, given the current state of the payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RefundPlan {
    delta: Money,
    new_total: Money,
    status: TransactionStatus,
}

impl RefundPlan {
    /// Returns `None` when there is nothing new to apply.
    fn new(current: &Transaction, amount: RefundAmount) -> Result<Option<Self>, MarketplaceError> {
        let refundable = matches!(current.status, TransactionStatus::Completed | TransactionStatus::PartiallyRefunded);
        let remaining = current.remaining_refundable();
        let (new_total, fully) = match amount {
            RefundAmount::Increment(amount) => {
                if !refundable {
                    return Err(MarketplaceError::InvalidState(format!(
                        "Transaction {} is {} and cannot be refunded",
                        current.transaction_number, current.status
                    )));
                }
                if !amount.is_positive() {
                    return Err(MarketplaceError::validation("Refund amount must be positive"));
                }
                if amount > current.amount {
                    return Err(MarketplaceError::Validation(format!(
                        "Refund amount {amount} exceeds the transaction amount {}",
                        current.amount
                    )));
                }
                (current.refund_amount + amount.min(remaining), amount >= remaining)
            },
            RefundAmount::CumulativeTotal(total) => {
                let total = total.min(current.amount);
                if total <= current.refund_amount {
                    return Ok(None);
                }
                if !refundable {
                    return Err(MarketplaceError::InvalidState(format!(
                        "Transaction {} is {} and cannot be refunded",
                        current.transaction_number, current.status
                    )));
                }
                (total, total >= current.amount)
            },
        };
        let status = if fully { TransactionStatus::Refunded } else { TransactionStatus::PartiallyRefunded };
        Ok(Some(Self { delta: new_total - current.refund_amount, new_total, status }))
    }
}

impl PayoutManagement for SqliteDatabase {
    async fn request_payout(&self, payout: NewPayout) -> Result<Payout, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let created = payouts::insert_payout(&payout, &mut tx).await?;
        let claimed = payouts::claim_eligible_transactions(&created, &mut tx).await?;
        if claimed == 0 {
            return Err(MarketplaceError::NoFunds(format!("Vendor #{} has no eligible transactions", payout.vendor_id)));
        }
        let totals = payouts::linked_total(created.id, &mut tx).await?;
        if !totals.amount.is_positive() {
            return Err(MarketplaceError::NoFunds(format!(
                "Eligible transactions of vendor #{} add up to {}",
                payout.vendor_id, totals.amount
            )));
        }
        let payout = payouts::set_totals(created.id, totals, &mut tx).await?;
        tx.commit().await?;
        let (count, amount) = (payout.transaction_count, payout.amount);
        debug!("🗃️ Payout #{} claimed {count} transactions worth {amount}", payout.id);
        Ok(payout)
    }

    async fn fetch_payout(&self, id: i64) -> Result<Option<Payout>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payouts::fetch_payout(id, &mut conn).await?)
    }

    async fn payouts_for_vendor(&self, vendor_id: i64) -> Result<Vec<Payout>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payouts::payouts_for_vendor(vendor_id, &mut conn).await?)
    }

    async fn search_payouts(&self, status: Option<PayoutStatus>) -> Result<Vec<Payout>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payouts::search_payouts(status, &mut conn).await?)
    }

    async fn transactions_for_payout(&self, payout_id: i64) -> Result<Vec<Transaction>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payouts::transactions_for_payout(payout_id, &mut conn).await?)
    }

    async fn approve_payout(
        &self,
        id: i64,
        admin_id: i64,
        notes: Option<String>,
    ) -> Result<Option<Payout>, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let from = [PayoutStatus::Pending];
        let payout = payouts::update_status(id, &from, PayoutStatus::Processing, admin_id, notes, None, &mut tx).await?;
        tx.commit().await?;
        Ok(payout)
    }

    async fn reject_payout(
        &self,
        id: i64,
        admin_id: i64,
        notes: Option<String>,
    ) -> Result<Option<Payout>, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let from = [PayoutStatus::Pending, PayoutStatus::Processing];
        let payout = payouts::update_status(id, &from, PayoutStatus::Cancelled, admin_id, notes, None, &mut tx).await?;
        if payout.is_some() {
            let released = payouts::release_transactions(id, &mut tx).await?;
            trace!("🗃️ Payout #{id} rejected. {released} transactions released");
        }
        tx.commit().await?;
        Ok(payout)
    }

    async fn complete_payout(
        &self,
        id: i64,
        admin_id: i64,
        reference: &str,
    ) -> Result<Option<Payout>, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let from = [PayoutStatus::Processing];
        let payout =
            payouts::update_status(id, &from, PayoutStatus::Completed, admin_id, None, Some(reference), &mut tx)
                .await?;
        tx.commit().await?;
        Ok(payout)
    }

    async fn available_balance(&self, vendor_id: i64) -> Result<Balance, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payouts::available_balance(vendor_id, &mut conn).await?)
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use mkt_common::Percent;

    use super::*;
    use crate::db_types::{PaymentMethod, TransactionType};

    fn payment(amount: i64, refunded: i64, status: TransactionStatus) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: 1,
            transaction_number: "TXN-1".into(),
            order_id: 1,
            customer_id: 1,
            vendor_id: 1,
            transaction_type: TransactionType::Payment,
            payment_method: PaymentMethod::Card,
            amount: Money::from(amount),
            commission_rate: Percent::from_whole(10),
            commission_amount: Money::from(amount / 10),
            vendor_amount: Money::from(amount - amount / 10),
            currency: "BDT".into(),
            status,
            gateway_reference: None,
            gateway_validation_id: None,
            gateway_transaction_id: None,
            gateway_response: None,
            payment_proof: None,
            failure_reason: None,
            expired: false,
            refund_amount: Money::from(refunded),
            refund_reason: None,
            refunded_by: None,
            refunded_at: None,
            parent_id: None,
            payout_id: None,
            verified_by: None,
            admin_notes: None,
            completed_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn partial_refund_plan() {
        let t = payment(94_500, 0, TransactionStatus::Completed);
        let plan = RefundPlan::new(&t, RefundAmount::Increment(Money::from(50_000))).unwrap().unwrap();
        assert_eq!(plan.delta, Money::from(50_000));
        assert_eq!(plan.status, TransactionStatus::PartiallyRefunded);
    }

    #[test]
    fn refund_covering_the_remainder_is_full() {
        let t = payment(94_500, 50_000, TransactionStatus::PartiallyRefunded);
        let plan = RefundPlan::new(&t, RefundAmount::Increment(Money::from(60_000))).unwrap().unwrap();
        assert_eq!(plan.delta, Money::from(44_500));
        assert_eq!(plan.new_total, Money::from(94_500));
        assert_eq!(plan.status, TransactionStatus::Refunded);
    }

    #[test]
    fn refund_guards() {
        let t = payment(94_500, 0, TransactionStatus::Pending);
        assert!(matches!(
            RefundPlan::new(&t, RefundAmount::Increment(Money::from(1))),
            Err(MarketplaceError::InvalidState(_))
        ));
        let t = payment(94_500, 0, TransactionStatus::Completed);
        assert!(matches!(
            RefundPlan::new(&t, RefundAmount::Increment(Money::from(100_000))),
            Err(MarketplaceError::Validation(_))
        ));
        assert!(matches!(
            RefundPlan::new(&t, RefundAmount::Increment(Money::ZERO)),
            Err(MarketplaceError::Validation(_))
        ));
    }

    #[test]
    fn cumulative_refunds_only_apply_the_difference() {
        let t = payment(94_500, 20_000, TransactionStatus::PartiallyRefunded);
        assert!(RefundPlan::new(&t, RefundAmount::CumulativeTotal(Money::from(20_000))).unwrap().is_none());
        let plan = RefundPlan::new(&t, RefundAmount::CumulativeTotal(Money::from(30_000))).unwrap().unwrap();
        assert_eq!(plan.delta, Money::from(10_000));
        let t = payment(94_500, 94_500, TransactionStatus::Refunded);
        assert!(RefundPlan::new(&t, RefundAmount::CumulativeTotal(Money::from(94_500))).unwrap().is_none());
    }
}
