//! Marketplace Engine
//!
//! The marketplace engine books services from vendors, takes payment for them through one of several gateways, keeps
//! an auditable transaction ledger and pays vendors their earnings. It contains the core logic only and is independent
//! of any web framework.
//!
//! The library is divided into these main sections:
//! 1. Storage ([`mod@traits`] and [`mod@sqlite`]). The traits describe what a backend must provide; SQLite is the
//!    supported backend. You should never need to access the database directly. The data types stored in the database
//!    are defined in [`mod@db_types`] and are public.
//! 2. Business rules that need no storage: [`mod@pricing`], [`mod@order_lifecycle`] and [`mod@coupon_evaluator`].
//! 3. The public API ([`mod@mkt_api`]). This manages orders, the ledger and payouts.
//! 4. The gateway adapters ([`mod@gateways`]), which turn card, redirect and manual payment flows into ledger calls.
//!
//! The engine also emits events when orders, payments and payouts change. These can be subscribed to with
//! [`events::EventHooks`]; [`mod@notifications`] uses them to send email.
pub mod coupon_evaluator;
pub mod db_types;
pub mod events;
pub mod gateways;
pub mod helpers;
pub mod mkt_api;
pub mod notifications;
pub mod order_lifecycle;
pub mod pricing;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(all(feature = "sqlite", any(feature = "test_utils", test)))]
pub mod test_utils;

pub use gateways::{CardAdapter, GatewayConfig, ManualAdapter, RedirectAdapter};
pub use mkt_api::{
    ledger_api::LedgerApi,
    ledger_objects,
    order_flow_api::OrderFlowApi,
    order_objects,
    payout_api::PayoutApi,
    payout_objects,
};
pub use pricing::PricingConfig;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    CatalogManagement,
    CouponManagement,
    LedgerManagement,
    MarketplaceDatabase,
    MarketplaceError,
    OrderManagement,
    PayoutManagement,
};
