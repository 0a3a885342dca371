mod common;

use common::{new_database, Market};
use mkt_engine::{
    db_types::{NewUser, VendorStatus},
    CatalogManagement,
    OrderManagement,
};

#[tokio::test]
async fn writes_are_visible_from_every_pooled_connection() {
    let db = new_database().await;
    for i in 0..20 {
        let user = db
            .create_user(NewUser { name: format!("User {i}"), email: format!("user{i}@example.com"), phone: None })
            .await
            .unwrap();
        let fetched = db.fetch_user(user.id).await.unwrap();
        assert_eq!(fetched.map(|u| u.email), Some(format!("user{i}@example.com")));
    }
}

#[tokio::test]
async fn orders_and_status_changes_are_seen_by_the_next_call() {
    let market = Market::new().await;
    for _ in 0..10 {
        let order = market.pending_order().await;
        let fetched = market.db.fetch_order_by_number(&order.order_number).await.unwrap();
        assert_eq!(fetched.map(|o| o.id), Some(order.id));
    }
    let vendor = market.db.update_vendor_status(market.vendor.id, VendorStatus::Suspended, true).await.unwrap();
    assert_eq!(vendor.status, VendorStatus::Suspended);
    let fetched = market.db.fetch_vendor(market.vendor.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, VendorStatus::Suspended);
}
