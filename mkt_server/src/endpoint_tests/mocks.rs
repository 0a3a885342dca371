use chrono::{DateTime, Utc};
use gateway_tools::{
    CardProcessor,
    CardRefund,
    CardWebhookEvent,
    GatewayApiError,
    NewPaymentIntent,
    PaymentIntent,
    RedirectGateway,
    RedirectSession,
    RedirectSessionRequest,
    RedirectValidation,
};
use mkt_common::Money;
use mkt_engine::{
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
        Payout,
        PayoutStatus,
        Service,
        Transaction,
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
        RefundOutcome,
        RefundRequest,
        SettleResult,
        SettlementDetails,
        TransactionQueryFilter,
        TransactionStats,
    },
};
use mockall::mock;

mock! {
    pub Market {}
    impl Clone for Market {
        fn clone(&self) -> Self;
    }
    impl CatalogManagement for Market {
        async fn create_user(&self, user: NewUser) -> Result<UserProfile, MarketplaceError>;
        async fn fetch_user(&self, id: i64) -> Result<Option<UserProfile>, MarketplaceError>;
        async fn create_vendor(&self, vendor: NewVendor) -> Result<Vendor, MarketplaceError>;
        async fn fetch_vendor(&self, id: i64) -> Result<Option<Vendor>, MarketplaceError>;
        async fn fetch_vendor_by_user(&self, user_id: i64) -> Result<Option<Vendor>, MarketplaceError>;
        async fn update_vendor_status(&self, vendor_id: i64, status: VendorStatus, is_active: bool) -> Result<Vendor, MarketplaceError>;
        async fn create_service(&self, service: NewService) -> Result<Service, MarketplaceError>;
        async fn fetch_service(&self, id: i64) -> Result<Option<Service>, MarketplaceError>;
        async fn set_service_availability(&self, service_id: i64, is_active: bool, is_available: bool) -> Result<Service, MarketplaceError>;
    }
    impl OrderManagement for Market {
        async fn insert_order(&self, order: NewOrder) -> Result<Order, MarketplaceError>;
        async fn fetch_order(&self, id: i64) -> Result<Option<Order>, MarketplaceError>;
        async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, MarketplaceError>;
        async fn search_orders(&self, query: OrderQueryFilter, pagination: Pagination) -> Result<Page<Order>, MarketplaceError>;
        async fn transition_order(&self, order_id: i64, expected: OrderStatusType, change: OrderChange) -> Result<Option<Order>, MarketplaceError>;
    }
    impl CouponManagement for Market {
        async fn create_coupon(&self, coupon: NewCoupon) -> Result<Coupon, MarketplaceError>;
        async fn fetch_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, MarketplaceError>;
        async fn coupon_usage_for_user(&self, coupon_id: i64, user_id: i64) -> Result<i64, MarketplaceError>;
        async fn redeem_coupon(&self, coupon: &Coupon, order: &Order, discount: Money) -> Result<Order, MarketplaceError>;
    }
    impl LedgerManagement for Market {
        async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction, MarketplaceError>;
        async fn fetch_transaction(&self, id: i64) -> Result<Option<Transaction>, MarketplaceError>;
        async fn fetch_transaction_by_number(&self, number: &str) -> Result<Option<Transaction>, MarketplaceError>;
        async fn fetch_transaction_by_gateway_reference(&self, method: PaymentMethod, reference: &str) -> Result<Option<Transaction>, MarketplaceError>;
        async fn transactions_for_order(&self, order_id: i64) -> Result<Vec<Transaction>, MarketplaceError>;
        async fn in_flight_transaction_for_order(&self, order_id: i64) -> Result<Option<Transaction>, MarketplaceError>;
        async fn set_gateway_reference(&self, id: i64, reference: &str) -> Result<Transaction, MarketplaceError>;
        async fn settle_transaction(&self, id: i64, details: SettlementDetails) -> Result<SettleResult, MarketplaceError>;
        async fn fail_transaction(&self, id: i64, reason: &str, details: SettlementDetails) -> Result<FailResult, MarketplaceError>;
        async fn expire_transaction(&self, id: i64, reason: &str) -> Result<FailResult, MarketplaceError>;
        async fn expire_stale_transactions(&self, cutoff: DateTime<Utc>, reason: &str) -> Result<Vec<Transaction>, MarketplaceError>;
        async fn refund_transaction(&self, id: i64, request: RefundRequest) -> Result<Option<RefundOutcome>, MarketplaceError>;
        async fn transaction_stats(&self, filter: TransactionQueryFilter) -> Result<TransactionStats, MarketplaceError>;
    }
    impl PayoutManagement for Market {
        async fn request_payout(&self, payout: NewPayout) -> Result<Payout, MarketplaceError>;
        async fn fetch_payout(&self, id: i64) -> Result<Option<Payout>, MarketplaceError>;
        async fn payouts_for_vendor(&self, vendor_id: i64) -> Result<Vec<Payout>, MarketplaceError>;
        async fn search_payouts(&self, status: Option<PayoutStatus>) -> Result<Vec<Payout>, MarketplaceError>;
        async fn transactions_for_payout(&self, payout_id: i64) -> Result<Vec<Transaction>, MarketplaceError>;
        async fn approve_payout(&self, id: i64, admin_id: i64, notes: Option<String>) -> Result<Option<Payout>, MarketplaceError>;
        async fn reject_payout(&self, id: i64, admin_id: i64, notes: Option<String>) -> Result<Option<Payout>, MarketplaceError>;
        async fn complete_payout(&self, id: i64, admin_id: i64, reference: &str) -> Result<Option<Payout>, MarketplaceError>;
        async fn available_balance(&self, vendor_id: i64) -> Result<Balance, MarketplaceError>;
    }
    impl MarketplaceDatabase for Market {
        fn url(&self) -> &str;
    }
}

mock! {
    pub Processor {}
    impl CardProcessor for Processor {
        async fn create_payment_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, GatewayApiError>;
        async fn create_refund(&self, intent_id: &str, amount: Money, reason: &str) -> Result<CardRefund, GatewayApiError>;
        fn verify_webhook(&self, payload: &[u8], signature_header: &str) -> Result<CardWebhookEvent, GatewayApiError>;
    }
}

mock! {
    pub Hosted {}
    impl RedirectGateway for Hosted {
        async fn init_session(&self, request: RedirectSessionRequest) -> Result<RedirectSession, GatewayApiError>;
        async fn validate(&self, val_id: &str) -> Result<RedirectValidation, GatewayApiError>;
    }
}

/// A database that answers the lookups made when an event is published with "not found".
pub fn quiet_market() -> MockMarket {
    let mut market = MockMarket::new();
    market.expect_fetch_user().returning(|_| Ok(None));
    market.expect_fetch_vendor().returning(|_| Ok(None));
    market
}
