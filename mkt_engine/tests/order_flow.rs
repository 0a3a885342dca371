mod common;

use chrono::{Duration, Utc};
use common::Market;
use mkt_common::Money;
use mkt_engine::{
    coupon_evaluator::{CouponRejection, CouponVerdict},
    db_types::{Actor, CouponType, NewCoupon, NewUser, NewVendor, OrderStatusType, PaymentStatus, Role, VendorStatus},
    order_objects::RescheduleRequest,
    CatalogManagement,
    CouponManagement,
    MarketplaceError,
    OrderManagement,
};

#[tokio::test]
async fn booking_snapshots_the_price() {
    let market = Market::new().await;
    let order = market.pending_order().await;
    assert!(order.order_number.as_str().starts_with("ORD-"));
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.service_price, Money::from_major(1000));
    assert_eq!(order.discount_amount, Money::from_major(100));
    assert_eq!(order.subtotal, Money::from_major(900));
    assert_eq!(order.platform_fee, Money::from_major(45));
    assert_eq!(order.total_amount, Money::from_major(945));
    assert_eq!(order.vendor_id, market.vendor.id);
}

#[tokio::test]
async fn only_customers_book_and_not_in_the_past() {
    let market = Market::new().await;
    let err = market.orders.create_order(&market.vendor(), market.booking()).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Forbidden(_)), "{err}");
    let mut booking = market.booking();
    booking.scheduled_date = Utc::now() - Duration::hours(1);
    let err = market.orders.create_order(&market.customer(), booking).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Validation(_)), "{err}");
}

#[tokio::test]
async fn services_that_cannot_be_booked() {
    let market = Market::new().await;
    market.db.set_service_availability(market.service.id, true, false).await.unwrap();
    let err = market.orders.create_order(&market.customer(), market.booking()).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Unavailable(_)), "{err}");

    market.db.set_service_availability(market.service.id, false, true).await.unwrap();
    let err = market.orders.create_order(&market.customer(), market.booking()).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Unavailable(_)), "{err}");

    market.db.set_service_availability(market.service.id, true, true).await.unwrap();
    market.db.update_vendor_status(market.vendor.id, VendorStatus::Suspended, true).await.unwrap();
    let err = market.orders.create_order(&market.customer(), market.booking()).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Unavailable(_)), "{err}");
}

#[tokio::test]
async fn deactivated_vendors_cannot_work_orders() {
    let market = Market::new().await;
    let pending = market.pending_order().await;
    let accepted = market.accepted_order().await;
    market.db.update_vendor_status(market.vendor.id, VendorStatus::Approved, false).await.unwrap();
    let err = market.orders.accept(&market.vendor(), &pending.order_number, None).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Forbidden(_)), "{err}");
    let err = market.orders.start(&market.vendor(), &accepted.order_number).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Forbidden(_)), "{err}");
    let order = market.db.fetch_order(accepted.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Accepted);
}

#[tokio::test]
async fn vendors_only_act_on_their_own_orders() {
    let market = Market::new().await;
    let order = market.pending_order().await;
    let rival_user = market
        .db
        .create_user(NewUser { name: "Nadia".into(), email: "nadia@example.com".into(), phone: None })
        .await
        .unwrap();
    market
        .db
        .create_vendor(NewVendor {
            user_id: rival_user.id,
            business_name: "Spotless Ltd".into(),
            email: "spotless@example.com".into(),
            status: VendorStatus::Approved,
            commission_rate: None,
        })
        .await
        .unwrap();
    let rival = Actor::vendor(rival_user.id);
    let err = market.orders.accept(&rival, &order.order_number, None).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Forbidden(_)), "{err}");
    let err = market.orders.cancel(&rival, &order.order_number, Some("Not mine".into())).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Forbidden(_)), "{err}");
}

#[tokio::test]
async fn full_lifecycle() {
    let market = Market::new().await;
    let order = market.pending_order().await;
    let number = &order.order_number;
    let vendor = market.vendor();
    let order = market.orders.accept(&vendor, number, Some("See you then".into())).await.unwrap();
    assert_eq!(order.status, OrderStatusType::Accepted);
    assert!(order.accepted_at.is_some());
    assert_eq!(order.vendor_notes.as_deref(), Some("See you then"));
    let order = market.orders.start(&vendor, number).await.unwrap();
    assert_eq!(order.status, OrderStatusType::InProgress);
    let order = market.orders.complete(&vendor, number, None).await.unwrap();
    assert_eq!(order.status, OrderStatusType::Completed);
    assert!(order.completed_at.is_some());
    let err = market.orders.cancel(&market.admin(), number, Some("Too late".into())).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::InvalidState(_)), "{err}");
}

#[tokio::test]
async fn vendor_cannot_cancel_work_in_progress() {
    let market = Market::new().await;
    let order = market.accepted_order().await;
    let number = &order.order_number;
    market.orders.start(&market.vendor(), number).await.unwrap();
    let err = market.orders.cancel(&market.vendor(), number, Some("Rain".into())).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::InvalidState(_)), "{err}");
    let order = market.orders.cancel(&market.admin(), number, Some("Dispute".into())).await.unwrap();
    assert_eq!(order.status, OrderStatusType::Cancelled);
    assert_eq!(order.cancelled_by, Some(Role::Admin));
}

#[tokio::test]
async fn customer_cancel_gets_a_default_reason() {
    let market = Market::new().await;
    let order = market.pending_order().await;
    let order = market.orders.cancel(&market.customer(), &order.order_number, None).await.unwrap();
    assert_eq!(order.status, OrderStatusType::Cancelled);
    assert_eq!(order.cancelled_by, Some(Role::Customer));
    assert!(order.cancellation_reason.is_some());
}

#[tokio::test]
async fn rejection_needs_a_reason() {
    let market = Market::new().await;
    let order = market.pending_order().await;
    let err = market.orders.reject(&market.vendor(), &order.order_number, Some("  ".into())).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Validation(_)), "{err}");
    let order = market.orders.reject(&market.vendor(), &order.order_number, Some("Fully booked".into())).await.unwrap();
    assert_eq!(order.status, OrderStatusType::Rejected);
    assert_eq!(order.rejection_reason.as_deref(), Some("Fully booked"));
}

#[tokio::test]
async fn other_customers_cannot_see_the_order() {
    let market = Market::new().await;
    let order = market.pending_order().await;
    let stranger = Actor::customer(market.customer.id + 100);
    let err = market.orders.fetch_order(&stranger, &order.order_number).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Forbidden(_)), "{err}");
    let fetched = market.orders.fetch_order(&market.vendor(), &order.order_number).await.unwrap();
    assert_eq!(fetched.id, order.id);
}

#[tokio::test]
async fn reschedule_keeps_the_previous_slot() {
    let market = Market::new().await;
    let order = market.accepted_order().await;
    let new_date = Utc::now() + Duration::days(7);
    let request = RescheduleRequest { scheduled_date: new_date, scheduled_time: "14:00".into(), reason: None };
    let updated = market.orders.reschedule(&market.customer(), &order.order_number, request).await.unwrap();
    assert_eq!(updated.scheduled_time, "14:00");
    assert_eq!(updated.rescheduled_from_time.as_deref(), Some("10:00"));
    assert_eq!(updated.rescheduled_from_date, Some(order.scheduled_date));
    assert_eq!(updated.status, OrderStatusType::Accepted);
}

#[tokio::test]
async fn fixed_coupon_reduces_the_total() {
    let market = Market::new().await;
    market.db.create_coupon(NewCoupon::new("save200", CouponType::Fixed, 20_000, 30)).await.unwrap();
    market.db.create_coupon(NewCoupon::new("ALSO", CouponType::Fixed, 5_000, 30)).await.unwrap();
    let order = market.pending_order().await;
    let preview = market.orders.preview_coupon(&market.customer(), &order.order_number, "Save200").await.unwrap();
    assert_eq!(preview.verdict, CouponVerdict::Applicable { discount: Money::from_major(200) });
    let order = market.orders.apply_coupon(&market.customer(), &order.order_number, "save200").await.unwrap();
    assert_eq!(order.coupon_code.as_deref(), Some("SAVE200"));
    assert_eq!(order.coupon_discount, Money::from_major(200));
    assert_eq!(order.total_amount, Money::from_major(745));
    let err = market.orders.apply_coupon(&market.customer(), &order.order_number, "ALSO").await.unwrap_err();
    assert!(err.is_conflict(), "{err}");
}

#[tokio::test]
async fn exhausted_coupons_are_refused() {
    let market = Market::new().await;
    let mut coupon = NewCoupon::new("ONCE", CouponType::Percentage, 1000, 30);
    coupon.usage_limit = Some(1);
    market.db.create_coupon(coupon).await.unwrap();
    let first = market.pending_order().await;
    let second = market.pending_order().await;
    market.orders.apply_coupon(&market.customer(), &first.order_number, "ONCE").await.unwrap();
    let preview = market.orders.preview_coupon(&market.customer(), &second.order_number, "ONCE").await.unwrap();
    let expected = CouponVerdict::NotApplicable { rejection: CouponRejection::UsageLimitReached };
    assert_eq!(preview.verdict, expected);
    let err = market.orders.apply_coupon(&market.customer(), &second.order_number, "ONCE").await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Validation(_)), "{err}");
    let second = market.orders.fetch_order(&market.customer(), &second.order_number).await.unwrap();
    assert_eq!(second.total_amount, Money::from_major(945));
}

#[tokio::test]
async fn unknown_coupons_are_rejected() {
    let market = Market::new().await;
    let order = market.pending_order().await;
    let err = market.orders.preview_coupon(&market.customer(), &order.order_number, "NOPE").await.unwrap_err();
    assert!(matches!(err, MarketplaceError::NotFound(_)), "{err}");
}
