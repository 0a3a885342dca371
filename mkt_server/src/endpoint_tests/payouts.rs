use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{Duration, Utc};
use mkt_common::Money;
use mkt_engine::{
    db_types::{Payout, PayoutMethod, PayoutStatus, Role, Vendor, VendorStatus},
    events::EventProducers,
    traits::Balance,
    PayoutApi,
};
use serde_json::json;

use super::{
    helpers::{as_user, send},
    mocks::MockMarket,
};
use crate::routes::{ListPayoutsRoute, PayoutBalanceRoute, ProcessPayoutRoute, RequestPayoutRoute};

fn configure(market: MockMarket) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(PayoutApi::new(market, EventProducers::default())))
            .service(RequestPayoutRoute::<MockMarket>::new())
            .service(PayoutBalanceRoute::<MockMarket>::new())
            .service(ListPayoutsRoute::<MockMarket>::new())
            .service(ProcessPayoutRoute::<MockMarket>::new());
    }
}

fn payout(id: i64, status: PayoutStatus) -> Payout {
    let now = Utc::now();
    Payout {
        id,
        vendor_id: 1,
        amount: Money::from_major(850),
        transaction_count: 1,
        method: PayoutMethod::BankTransfer,
        status,
        period_start: now - Duration::days(30),
        period_end: now,
        gateway_reference: None,
        admin_notes: None,
        processed_by: None,
        requested_at: now,
        processed_at: None,
        completed_at: None,
    }
}

fn vendor_profile() -> Vendor {
    Vendor {
        id: 1,
        user_id: 7,
        business_name: "Sparkle Cleaners".into(),
        email: "hello@sparkle.example".into(),
        status: VendorStatus::Approved,
        is_active: true,
        commission_rate: None,
        total_revenue: Money::ZERO,
        total_commission: Money::ZERO,
        completed_orders: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[actix_web::test]
async fn customers_cannot_request_payouts() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::post().uri("/payouts"), 3, Role::Customer)
        .set_json(json!({ "method": "bank_transfer" }));
    let (status, body) = send(req, configure(MockMarket::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("customer"), "{body}");
}

#[actix_web::test]
async fn admin_lists_payouts_by_status() {
    let _ = env_logger::try_init().ok();
    let mut market = MockMarket::new();
    market
        .expect_search_payouts()
        .withf(|status| *status == Some(PayoutStatus::Pending))
        .times(1)
        .returning(|_| Ok(vec![payout(4, PayoutStatus::Pending)]));
    let req = as_user(TestRequest::get().uri("/payouts?status=pending"), 9, Role::Admin);
    let (status, body) = send(req, configure(market)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""id":4"#), "{body}");
    assert!(body.contains(r#""status":"pending""#), "{body}");
}

#[actix_web::test]
async fn vendor_balance() {
    let _ = env_logger::try_init().ok();
    let mut market = MockMarket::new();
    market.expect_fetch_vendor_by_user().withf(|user_id| *user_id == 7).returning(|_| Ok(Some(vendor_profile())));
    market
        .expect_available_balance()
        .withf(|vendor_id| *vendor_id == 1)
        .returning(|_| Ok(Balance { transaction_count: 3, amount: Money::from_major(2550) }));
    let req = as_user(TestRequest::get().uri("/payouts/balance"), 7, Role::Vendor);
    let (status, body) = send(req, configure(market)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""transaction_count":3"#), "{body}");
    assert!(body.contains(r#""amount":255000"#), "{body}");
}

#[actix_web::test]
async fn approving_a_completed_payout_is_refused() {
    let _ = env_logger::try_init().ok();
    let mut market = MockMarket::new();
    market.expect_approve_payout().returning(|_, _, _| Ok(None));
    market.expect_fetch_payout().returning(|id| Ok(Some(payout(id, PayoutStatus::Completed))));
    let req = as_user(TestRequest::post().uri("/payouts/4/process"), 9, Role::Admin)
        .set_json(json!({ "decision": "approve" }));
    let (status, body) = send(req, configure(market)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Payout #4 is completed and cannot be processed"), "{body}");
}

#[actix_web::test]
async fn rejecting_a_payout() {
    let _ = env_logger::try_init().ok();
    let mut market = MockMarket::new();
    market
        .expect_reject_payout()
        .withf(|id, admin_id, notes| *id == 4 && *admin_id == 9 && notes.as_deref() == Some("Bank details missing"))
        .times(1)
        .returning(|id, admin_id, notes| {
            let mut p = payout(id, PayoutStatus::Cancelled);
            p.processed_by = Some(admin_id);
            p.admin_notes = notes;
            Ok(Some(p))
        });
    market.expect_fetch_vendor().returning(|_| Ok(None));
    let req = as_user(TestRequest::post().uri("/payouts/4/process"), 9, Role::Admin)
        .set_json(json!({ "decision": "reject", "notes": "Bank details missing" }));
    let (status, body) = send(req, configure(market)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Payout rejected"), "{body}");
}
