#![allow(dead_code)]

use chrono::{Duration, Utc};
use log::*;
use mkt_common::{Money, Percent};
use mkt_engine::{
    db_types::{Actor, NewService, NewUser, NewVendor, Order, Service, UserProfile, Vendor, VendorStatus},
    events::EventProducers,
    order_objects::NewOrderRequest,
    CatalogManagement,
    LedgerApi,
    OrderFlowApi,
    PayoutApi,
    PricingConfig,
    SqliteDatabase,
};

/// A fresh, migrated database in a temporary file.
pub async fn new_database() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let path = tempfile::Builder::new()
        .prefix("mkt_engine_")
        .suffix(".db")
        .tempfile()
        .expect("Error creating temporary file")
        .into_temp_path()
        .keep()
        .expect("Error keeping temporary file");
    let url = format!("sqlite://{}", path.display());
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    db.migrate().await.expect("Error running migrations");
    debug!("🚀️ Test database ready at {url}");
    db
}

/// One customer, one approved vendor selling one 1000.00 service at 10% off, and the engine APIs over them.
pub struct Market {
    pub db: SqliteDatabase,
    pub customer: UserProfile,
    pub vendor_user: UserProfile,
    pub vendor: Vendor,
    pub service: Service,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub ledger: LedgerApi<SqliteDatabase>,
    pub payouts: PayoutApi<SqliteDatabase>,
}

impl Market {
    pub async fn new() -> Self {
        let db = new_database().await;
        let customer = db
            .create_user(NewUser { name: "Rumana".into(), email: "rumana@example.com".into(), phone: None })
            .await
            .expect("Error creating customer");
        let vendor_user = db
            .create_user(NewUser { name: "Karim".into(), email: "karim@example.com".into(), phone: None })
            .await
            .expect("Error creating vendor user");
        let vendor = db
            .create_vendor(NewVendor {
                user_id: vendor_user.id,
                business_name: "Shine & Co".into(),
                email: "shine@example.com".into(),
                status: VendorStatus::Approved,
                commission_rate: None,
            })
            .await
            .expect("Error creating vendor");
        let service = db
            .create_service(NewService {
                vendor_id: vendor.id,
                category_id: None,
                name: "Deep cleaning".into(),
                price: Money::from_major(1000),
                discount: Percent::from_whole(10),
            })
            .await
            .expect("Error creating service");
        let producers = EventProducers::default();
        let orders = OrderFlowApi::new(db.clone(), producers.clone(), PricingConfig::default());
        let ledger = LedgerApi::new(db.clone(), producers.clone(), Percent::from_whole(10));
        let payouts = PayoutApi::new(db.clone(), producers);
        Self { db, customer, vendor_user, vendor, service, orders, ledger, payouts }
    }

    pub fn customer(&self) -> Actor {
        Actor::customer(self.customer.id)
    }

    pub fn vendor(&self) -> Actor {
        Actor::vendor(self.vendor_user.id)
    }

    pub fn admin(&self) -> Actor {
        Actor::admin(999)
    }

    pub fn booking(&self) -> NewOrderRequest {
        NewOrderRequest {
            service_id: self.service.id,
            scheduled_date: Utc::now() + Duration::days(3),
            scheduled_time: "10:00".into(),
            address: "House 12, Road 5, Dhanmondi".into(),
            notes: None,
        }
    }

    pub async fn pending_order(&self) -> Order {
        self.orders.create_order(&self.customer(), self.booking()).await.expect("Error creating order")
    }

    pub async fn accepted_order(&self) -> Order {
        let order = self.pending_order().await;
        self.orders.accept(&self.vendor(), &order.order_number, None).await.expect("Error accepting order")
    }
}
