//! # Storage contracts
//!
//! These traits define what a marketplace database backend has to provide. The public APIs in [`crate::mkt_api`] and
//! [`crate::gateways`] are generic over them, so a backend only needs to implement the traits to be usable.
//!
//! * [`CatalogManagement`] covers users, vendors and services, which the order flow reads but does not own.
//! * [`OrderManagement`] stores orders and applies compare-and-set status changes.
//! * [`CouponManagement`] stores coupons and redeems them against an order.
//! * [`LedgerManagement`] is the transaction ledger. Settlement, failure and refunds are conditional updates.
//! * [`PayoutManagement`] batches completed payments into vendor payouts.
//! * [`MarketplaceDatabase`] ties all of them together.
mod catalog_management;
mod coupon_management;
mod data_objects;
mod errors;
mod ledger_management;
mod order_management;
mod payout_management;

pub use catalog_management::CatalogManagement;
pub use coupon_management::CouponManagement;
pub use data_objects::*;
pub use errors::MarketplaceError;
pub use ledger_management::LedgerManagement;
pub use order_management::OrderManagement;
pub use payout_management::PayoutManagement;

/// The highest level of behaviour a marketplace backend must support.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase:
    Clone + CatalogManagement + OrderManagement + CouponManagement + LedgerManagement + PayoutManagement
{
    /// The URL of the database
    fn url(&self) -> &str;
}
