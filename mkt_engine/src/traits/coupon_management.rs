use mkt_common::Money;

use crate::{
    db_types::{Coupon, NewCoupon, Order},
    traits::MarketplaceError,
};

#[allow(async_fn_in_trait)]
pub trait CouponManagement {
    /// Stores a new coupon. The code is upper-cased. Fails with `Conflict` if the code exists.
    async fn create_coupon(&self, coupon: NewCoupon) -> Result<Coupon, MarketplaceError>;

    /// Case-insensitive lookup by code.
    async fn fetch_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, MarketplaceError>;

    async fn coupon_usage_for_user(&self, coupon_id: i64, user_id: i64) -> Result<i64, MarketplaceError>;

    /// Redeems the coupon against the order in one database transaction:
    /// * increments the usage count, only while it is under the usage limit,
    /// * re-checks the per-user limit,
    /// * records the usage,
    /// * sets the coupon on the order and recomputes its total, only if the order is pending and has no coupon yet.
    ///
    /// If any of the guards fail, nothing is written.
    async fn redeem_coupon(
        &self,
        coupon: &Coupon,
        order: &Order,
        discount: Money,
    ) -> Result<Order, MarketplaceError>;
}
