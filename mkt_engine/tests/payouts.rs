mod common;

use common::Market;
use mkt_common::Money;
use mkt_engine::{
    db_types::{PaymentMethod, PayoutMethod, PayoutStatus},
    ledger_objects::{SettlementEvent, TransactionRef},
    payout_objects::{PayoutDecision, PayoutRequest},
    traits::SettlementDetails,
    MarketplaceError,
    PayoutManagement,
};

/// Books, accepts and pays for one order. Returns the vendor's share.
async fn paid_order(market: &Market) -> Money {
    let order = market.accepted_order().await;
    let (_, txn) =
        market.ledger.initiate(&market.customer(), &order.order_number, PaymentMethod::Card, None).await.unwrap();
    let event = SettlementEvent::success(TransactionRef::id(txn.id), SettlementDetails::default());
    market.ledger.settle(event).await.unwrap();
    txn.vendor_amount
}

fn bank_transfer() -> PayoutRequest {
    PayoutRequest { method: PayoutMethod::BankTransfer, period_start: None, period_end: None, notes: None }
}

#[tokio::test]
async fn nothing_to_pay_out() {
    let market = Market::new().await;
    let err = market.payouts.request(&market.vendor(), bank_transfer()).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::NoFunds(_)), "{err}");
    let err = market.payouts.request(&market.customer(), bank_transfer()).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Forbidden(_)), "{err}");
}

#[tokio::test]
async fn payments_are_claimed_by_one_payout_only() {
    let market = Market::new().await;
    let share = paid_order(&market).await;
    paid_order(&market).await;
    let balance = market.payouts.available_balance(&market.vendor()).await.unwrap();
    assert_eq!(balance.transaction_count, 2);
    assert_eq!(balance.amount, share + share);

    let payout = market.payouts.request(&market.vendor(), bank_transfer()).await.unwrap();
    assert_eq!(payout.status, PayoutStatus::Pending);
    assert_eq!(payout.transaction_count, 2);
    assert_eq!(payout.amount, share + share);
    let linked = market.db.transactions_for_payout(payout.id).await.unwrap();
    assert!(linked.iter().all(|t| t.payout_id == Some(payout.id)));

    let err = market.payouts.request(&market.vendor(), bank_transfer()).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::NoFunds(_)), "{err}");
    let balance = market.payouts.available_balance(&market.vendor()).await.unwrap();
    assert_eq!(balance.amount, Money::ZERO);
}

#[tokio::test]
async fn rejected_payouts_release_their_payments() {
    let market = Market::new().await;
    let share = paid_order(&market).await;
    let payout = market.payouts.request(&market.vendor(), bank_transfer()).await.unwrap();
    let rejected = market
        .payouts
        .process(&market.admin(), payout.id, PayoutDecision::Reject, Some("Wrong account".into()))
        .await
        .unwrap();
    assert_eq!(rejected.status, PayoutStatus::Cancelled);
    assert!(market.db.transactions_for_payout(payout.id).await.unwrap().is_empty());

    let again = market.payouts.request(&market.vendor(), bank_transfer()).await.unwrap();
    assert_ne!(again.id, payout.id);
    assert_eq!(again.amount, share);
}

#[tokio::test]
async fn approve_then_complete() {
    let market = Market::new().await;
    paid_order(&market).await;
    let admin = market.admin();
    let payout = market.payouts.request(&market.vendor(), bank_transfer()).await.unwrap();

    let err = market.payouts.complete(&admin, payout.id, Some("BANK-1".into())).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::InvalidState(_)), "{err}");
    let err = market.payouts.process(&market.vendor(), payout.id, PayoutDecision::Approve, None).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Forbidden(_)), "{err}");

    let approved = market.payouts.process(&admin, payout.id, PayoutDecision::Approve, None).await.unwrap();
    assert_eq!(approved.status, PayoutStatus::Processing);
    assert_eq!(approved.processed_by, Some(admin.id));
    let err = market.payouts.complete(&admin, payout.id, None).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Validation(_)), "{err}");
    let done = market.payouts.complete(&admin, payout.id, Some("BANK-1".into())).await.unwrap();
    assert_eq!(done.status, PayoutStatus::Completed);
    assert_eq!(done.gateway_reference.as_deref(), Some("BANK-1"));
    assert!(done.completed_at.is_some());

    let err = market.payouts.process(&admin, payout.id, PayoutDecision::Reject, None).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::InvalidState(_)), "{err}");
    let listed = market.payouts.list(&market.vendor(), None).await.unwrap();
    assert_eq!(listed.len(), 1);
}
