use crate::{
    db_types::{NewOrder, Order, OrderNumber, OrderStatusType},
    traits::{data_objects::OrderChange, MarketplaceError, OrderQueryFilter, Page, Pagination},
};

#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores a new order. Fails with `Conflict` if the order number is already taken.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, MarketplaceError>;

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, MarketplaceError>;

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, MarketplaceError>;

    /// Orders matching the filter, newest first.
    async fn search_orders(
        &self,
        query: OrderQueryFilter,
        pagination: Pagination,
    ) -> Result<Page<Order>, MarketplaceError>;

    /// Applies `change` only if the order is still in the `expected` status.
    ///
    /// Returns `None` when the status moved underneath the caller, in which case nothing was written.
    /// Completing an order also increments the vendor's completed order count in the same database transaction.
    async fn transition_order(
        &self,
        order_id: i64,
        expected: OrderStatusType,
        change: OrderChange,
    ) -> Result<Option<Order>, MarketplaceError>;
}
