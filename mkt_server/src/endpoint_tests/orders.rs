use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::Utc;
use mkt_common::Money;
use mkt_engine::{
    db_types::{Role, Vendor, VendorStatus},
    events::EventProducers,
    test_utils::fixtures::sample_order,
    traits::Page,
    OrderFlowApi,
    PricingConfig,
};
use serde_json::json;

use super::{
    helpers::{as_user, send},
    mocks::MockMarket,
};
use crate::routes::{CreateOrderRoute, FetchOrderRoute, ListOrdersRoute, RescheduleOrderRoute};

const ORDER: &str = "ORD-20240601-AB12CD";

fn configure(market: MockMarket) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = OrderFlowApi::new(market, EventProducers::default(), PricingConfig::default());
        cfg.app_data(web::Data::new(api))
            .service(CreateOrderRoute::<MockMarket>::new())
            .service(ListOrdersRoute::<MockMarket>::new())
            .service(FetchOrderRoute::<MockMarket>::new())
            .service(RescheduleOrderRoute::<MockMarket>::new());
    }
}

fn vendor(id: i64, user_id: i64) -> Vendor {
    Vendor {
        id,
        user_id,
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

fn market_with_sample_order() -> MockMarket {
    let mut market = MockMarket::new();
    market.expect_fetch_order_by_number().returning(|number| {
        let order = sample_order();
        Ok((*number == order.order_number).then_some(order))
    });
    market
}

#[actix_web::test]
async fn create_order_without_identity() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/orders").set_json(json!({}));
    let (status, body) = send(req, configure(MockMarket::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains(r#""success":false"#), "{body}");
}

#[actix_web::test]
async fn vendors_cannot_book_services() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::post().uri("/orders").set_json(json!({})), 7, Role::Vendor);
    let (status, body) = send(req, configure(MockMarket::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("vendor"), "{body}");
}

#[actix_web::test]
async fn customer_fetches_own_order() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::get().uri(&format!("/orders/{ORDER}")), 1, Role::Customer);
    let (status, body) = send(req, configure(market_with_sample_order())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(ORDER), "{body}");
    assert!(body.contains(r#""success":true"#), "{body}");
}

#[actix_web::test]
async fn customer_cannot_fetch_someone_elses_order() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::get().uri(&format!("/orders/{ORDER}")), 2, Role::Customer);
    let (status, body) = send(req, configure(market_with_sample_order())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("You do not have access to this order"), "{body}");
}

#[actix_web::test]
async fn unknown_order() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::get().uri("/orders/ORD-20240101-ZZZZZZ"), 1, Role::Admin);
    let (status, body) = send(req, configure(market_with_sample_order())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Order ORD-20240101-ZZZZZZ not found"), "{body}");
}

#[actix_web::test]
async fn vendor_listing_is_scoped_to_their_profile() {
    let _ = env_logger::try_init().ok();
    let mut market = MockMarket::new();
    market.expect_fetch_vendor_by_user().withf(|user_id| *user_id == 7).returning(|_| Ok(Some(vendor(1, 7))));
    market
        .expect_search_orders()
        .withf(|filter, pagination| {
            filter.vendor_id == Some(1) && filter.customer_id.is_none() && pagination.page == 2 && pagination.limit == 5
        })
        .times(1)
        .returning(|_, pagination| Ok(Page::new(vec![sample_order()], pagination, 6)));
    let req = as_user(TestRequest::get().uri("/orders?page=2&limit=5"), 7, Role::Vendor);
    let (status, body) = send(req, configure(market)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""pages":2"#), "{body}");
    assert!(body.contains(ORDER), "{body}");
}

#[actix_web::test]
async fn customer_filter_cannot_widen_the_listing() {
    let _ = env_logger::try_init().ok();
    let mut market = MockMarket::new();
    market
        .expect_search_orders()
        .withf(|filter, _| filter.customer_id == Some(3))
        .times(1)
        .returning(|_, pagination| Ok(Page::new(vec![], pagination, 0)));
    let req = as_user(TestRequest::get().uri("/orders?status=pending"), 3, Role::Customer);
    let (status, body) = send(req, configure(market)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""total":0"#), "{body}");
}

#[actix_web::test]
async fn malformed_body_gets_the_error_envelope() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post()
        .uri(&format!("/orders/{ORDER}/reschedule"))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json");
    let req = as_user(req, 1, Role::Customer);
    let (status, body) = send(req, configure(MockMarket::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains(r#""success":false"#), "{body}");
    assert!(body.contains(r#""error":"Could not read request body"#), "{body}");
}
