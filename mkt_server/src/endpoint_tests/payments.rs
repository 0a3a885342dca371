use actix_web::{
    http::{header, StatusCode},
    test::TestRequest,
    web,
    web::ServiceConfig,
};
use gateway_tools::{signature::CARD_SIGNATURE_HEADER, CardRefund, CardWebhookEvent, GatewayApiError};
use mkt_common::{Money, Percent};
use mkt_engine::{
    db_types::{PaymentMethod, Role, TransactionStatus, TransactionType},
    events::EventProducers,
    test_utils::fixtures::{sample_order, sample_payment},
    traits::{RefundAmount, RefundOutcome},
    CardAdapter,
    GatewayConfig,
    LedgerApi,
    RedirectAdapter,
};
use serde_json::json;

use super::{
    helpers::{as_user, send, send_with_headers},
    mocks::{quiet_market, MockHosted, MockMarket, MockProcessor},
};
use crate::{
    config::ServerOptions,
    routes::{CardWebhookRoute, RedirectCallbackRoute, RefundTransactionRoute},
};

fn ledger(market: MockMarket) -> LedgerApi<MockMarket> {
    LedgerApi::new(market, EventProducers::default(), Percent::from_whole(10))
}

fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        public_url: "https://api.example.com".into(),
        client_url: "https://shop.example.com".into(),
        ..Default::default()
    }
}

/// The refund route needs both the ledger and the card adapter, each with its own view of the database.
fn refund_app(ledger_db: MockMarket, card_db: MockMarket, processor: MockProcessor) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(ledger(ledger_db)))
            .app_data(web::Data::new(CardAdapter::new(ledger(card_db), processor)))
            .service(RefundTransactionRoute::<MockMarket, MockProcessor>::new());
    }
}

fn webhook_app(market: MockMarket, processor: MockProcessor) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(CardAdapter::new(ledger(market), processor)))
            .service(CardWebhookRoute::<MockMarket, MockProcessor>::new());
    }
}

fn redirect_app(market: MockMarket, options: ServerOptions) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let adapter = RedirectAdapter::new(ledger(market), MockHosted::new(), gateway_config());
        cfg.app_data(web::Data::new(adapter))
            .app_data(web::Data::new(gateway_config()))
            .app_data(web::Data::new(options))
            .service(RedirectCallbackRoute::<MockMarket, MockHosted>::new());
    }
}

/// A database holding the sample payment (paid with `payment_method`) that records a 100.00 refund against it.
fn refunding_market(payment_method: PaymentMethod, expected: RefundAmount) -> MockMarket {
    let mut market = quiet_market();
    market.expect_fetch_transaction().returning(move |id| {
        let mut payment = sample_payment();
        payment.payment_method = payment_method;
        Ok((id == payment.id).then_some(payment))
    });
    market
        .expect_refund_transaction()
        .withf(move |id, request| *id == 1 && request.amount == expected)
        .times(1)
        .returning(move |_, request| {
            let mut payment = sample_payment();
            payment.payment_method = payment_method;
            payment.status = TransactionStatus::PartiallyRefunded;
            payment.refund_amount = Money::from_major(100);
            let mut refund_entry = payment.clone();
            refund_entry.id = 2;
            refund_entry.transaction_number = request.entry_number.clone();
            refund_entry.transaction_type = TransactionType::Refund;
            refund_entry.amount = Money::from_major(100);
            refund_entry.parent_id = Some(1);
            Ok(Some(RefundOutcome { payment, refund_entry }))
        });
    market.expect_fetch_order().returning(|_| Ok(Some(sample_order())));
    market
}

#[actix_web::test]
async fn webhook_without_signature() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/webhooks/card").set_payload(r#"{"id":"evt_1"}"#);
    let (status, body) = send(req, webhook_app(MockMarket::new(), MockProcessor::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Missing webhook signature"), "{body}");
}

#[actix_web::test]
async fn webhook_with_bad_signature() {
    let _ = env_logger::try_init().ok();
    let mut processor = MockProcessor::new();
    processor
        .expect_verify_webhook()
        .returning(|_, _| Err(GatewayApiError::InvalidSignature("No matching signature".into())));
    let req = TestRequest::post()
        .uri("/webhooks/card")
        .insert_header((CARD_SIGNATURE_HEADER, "t=1,v1=forged"))
        .set_payload(r#"{"id":"evt_1"}"#);
    let (status, body) = send(req, webhook_app(MockMarket::new(), processor)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid webhook signature"), "{body}");
}

#[actix_web::test]
async fn webhook_for_other_events_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let mut processor = MockProcessor::new();
    processor.expect_verify_webhook().returning(|_, _| {
        Ok(CardWebhookEvent { id: "evt_2".into(), event_type: "customer.created".into(), ..Default::default() })
    });
    let req = TestRequest::post()
        .uri("/webhooks/card")
        .insert_header((CARD_SIGNATURE_HEADER, "t=1,v1=good"))
        .set_payload(r#"{"id":"evt_2"}"#);
    let (status, body) = send(req, webhook_app(MockMarket::new(), processor)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""handled":"ignored""#), "{body}");
}

#[actix_web::test]
async fn browser_cancel_for_unknown_payment_still_redirects() {
    let _ = env_logger::try_init().ok();
    let mut market = MockMarket::new();
    market.expect_fetch_transaction_by_number().returning(|_| Ok(None));
    let req = TestRequest::post().uri("/payments/redirect/cancel").set_form([("tran_id", "TXN-20240601-NOPE00")]);
    let (status, headers, _) = send_with_headers(req, redirect_app(market, ServerOptions::default())).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    let location = headers.get(header::LOCATION).and_then(|v| v.to_str().ok()).unwrap_or_default();
    assert_eq!(location, "https://shop.example.com/payment/cancel?order=&transaction=TXN-20240601-NOPE00");
}

#[actix_web::test]
async fn browser_fail_for_foreign_payment_goes_to_fail_page() {
    let _ = env_logger::try_init().ok();
    let mut market = MockMarket::new();
    market.expect_fetch_transaction_by_number().returning(|number| {
        let mut payment = sample_payment();
        payment.transaction_number = number.to_string();
        Ok(Some(payment))
    });
    let req = TestRequest::post()
        .uri("/payments/redirect/fail")
        .set_form([("tran_id", "TXN-20240601-EF34GH"), ("error", "Declined")]);
    let (status, headers, _) = send_with_headers(req, redirect_app(market, ServerOptions::default())).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    let location = headers.get(header::LOCATION).and_then(|v| v.to_str().ok()).unwrap_or_default();
    assert_eq!(location, "https://shop.example.com/payment/fail?order=&transaction=TXN-20240601-EF34GH");
}

#[actix_web::test]
async fn ipn_from_unlisted_address_is_refused() {
    let _ = env_logger::try_init().ok();
    let options =
        ServerOptions { ipn_whitelist: Some(vec!["203.0.113.10".parse().unwrap()]), ..Default::default() };
    let req = TestRequest::post()
        .uri("/payments/redirect/ipn")
        .peer_addr("198.51.100.20:443".parse().unwrap())
        .set_form([("tran_id", "TXN-20240601-AB12CD"), ("val_id", "val_1")]);
    let (status, body) = send(req, redirect_app(MockMarket::new(), options)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains(r#""success":false"#), "{body}");
}

#[actix_web::test]
async fn customers_cannot_refund() {
    let _ = env_logger::try_init().ok();
    let req = as_user(TestRequest::post().uri("/transactions/1/refund"), 1, Role::Customer)
        .set_json(json!({ "amount": 10000, "reason": "Changed my mind" }));
    let (status, _) = send(req, refund_app(MockMarket::new(), MockMarket::new(), MockProcessor::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn manual_payments_are_refunded_on_the_ledger_only() {
    let _ = env_logger::try_init().ok();
    let ledger_db = refunding_market(PaymentMethod::Manual, RefundAmount::Increment(Money::from_major(100)));
    let mut processor = MockProcessor::new();
    processor.expect_create_refund().never();
    let req = as_user(TestRequest::post().uri("/transactions/1/refund"), 9, Role::Admin)
        .set_json(json!({ "amount": 10000, "reason": "Vendor no-show" }));
    let (status, body) = send(req, refund_app(ledger_db, MockMarket::new(), processor)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body.contains("Refund recorded"), "{body}");
    assert!(body.contains(r#""status":"partially_refunded""#), "{body}");
}

#[actix_web::test]
async fn card_payments_are_refunded_at_the_processor() {
    let _ = env_logger::try_init().ok();
    let mut ledger_db = MockMarket::new();
    ledger_db.expect_fetch_transaction().returning(|_| Ok(Some(sample_payment())));
    let card_db = refunding_market(PaymentMethod::Card, RefundAmount::CumulativeTotal(Money::from_major(100)));
    let mut processor = MockProcessor::new();
    processor
        .expect_create_refund()
        .withf(|intent_id, amount, reason| {
            intent_id.to_string() == "pi_123"
                && *amount == Money::from_major(100)
                && reason.to_string() == "Vendor no-show"
        })
        .times(1)
        .returning(|intent_id, amount, _| {
            Ok(CardRefund {
                id: "re_1".into(),
                amount: amount.value(),
                status: "succeeded".into(),
                payment_intent: Some(intent_id.to_string()),
            })
        });
    let req = as_user(TestRequest::post().uri("/transactions/1/refund"), 9, Role::SuperAdmin)
        .set_json(json!({ "amount": 10000, "reason": "Vendor no-show" }));
    let (status, body) = send(req, refund_app(ledger_db, card_db, processor)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body.contains(r#""refund_amount":10000"#), "{body}");
}
