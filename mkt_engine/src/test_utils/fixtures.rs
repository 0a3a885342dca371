use chrono::{Duration, Utc};
use mkt_common::{Money, Percent, DEFAULT_CURRENCY_CODE};

use crate::{
    db_types::{
        Order,
        OrderNumber,
        OrderStatusType,
        PaymentMethod,
        PaymentStatus,
        Transaction,
        TransactionStatus,
        TransactionType,
    },
    pricing::{price_service, PricingConfig},
};

/// A pending order for a 1000.00 service with a 10% discount. The total with default pricing is 945.00.
pub fn sample_order() -> Order {
    let now = Utc::now();
    let p = price_service(Money::from_major(1000), Percent::from_whole(10), &PricingConfig::default());
    Order {
        id: 1,
        order_number: OrderNumber::from("ORD-20240601-AB12CD"),
        customer_id: 1,
        vendor_id: 1,
        service_id: 1,
        service_name: "Deep cleaning".into(),
        service_price: p.service_price,
        discount: p.discount,
        discount_amount: p.discount_amount,
        subtotal: p.subtotal,
        tax: p.tax,
        platform_fee: p.platform_fee,
        coupon_code: None,
        coupon_discount: p.coupon_discount,
        total_amount: p.total_amount,
        currency: DEFAULT_CURRENCY_CODE.into(),
        status: OrderStatusType::Pending,
        payment_status: PaymentStatus::Pending,
        payment_method: None,
        scheduled_date: now + Duration::days(2),
        scheduled_time: "10:00".into(),
        address: "House 12, Road 5, Dhanmondi".into(),
        customer_notes: None,
        vendor_notes: None,
        rejection_reason: None,
        cancellation_reason: None,
        cancelled_by: None,
        rescheduled_from_date: None,
        rescheduled_from_time: None,
        reschedule_reason: None,
        accepted_at: None,
        started_at: None,
        completed_at: None,
        cancelled_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// A completed card payment of 945.00 for [`sample_order`], with 10% commission.
pub fn sample_payment() -> Transaction {
    let now = Utc::now();
    let amount = Money::from_major(945);
    let commission_amount = amount.percent(Percent::from_whole(10));
    Transaction {
        id: 1,
        transaction_number: "TXN-20240601-EF34GH".into(),
        order_id: 1,
        customer_id: 1,
        vendor_id: 1,
        transaction_type: TransactionType::Payment,
        payment_method: PaymentMethod::Card,
        amount,
        commission_rate: Percent::from_whole(10),
        commission_amount,
        vendor_amount: amount - commission_amount,
        currency: DEFAULT_CURRENCY_CODE.into(),
        status: TransactionStatus::Completed,
        gateway_reference: Some("pi_123".into()),
        gateway_validation_id: None,
        gateway_transaction_id: Some("ch_9".into()),
        gateway_response: None,
        payment_proof: None,
        failure_reason: None,
        expired: false,
        refund_amount: Money::ZERO,
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
