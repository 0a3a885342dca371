use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    coupon_evaluator::{evaluate, CouponContext, CouponVerdict},
    db_types::{Actor, Coupon, NewOrder, Order, OrderNumber, Role},
    events::{EventProducers, OrderEvent, OrderEventKind},
    helpers::{new_order_number, with_fresh_number},
    mkt_api::{
        access::{authorize_order, load_contacts, vendor_for_actor},
        order_objects::{non_empty, required, CouponPreview, NewOrderRequest, RescheduleRequest},
    },
    order_lifecycle::{check_transition, OrderAction},
    pricing::{price_service, with_coupon, PricingConfig},
    traits::{
        CatalogManagement,
        CouponManagement,
        MarketplaceError,
        OrderChange,
        OrderManagement,
        OrderQueryFilter,
        Page,
        Pagination,
    },
};

const DEFAULT_CUSTOMER_CANCEL_REASON: &str = "Cancelled by customer";

/// `OrderFlowApi` drives an order through its life: booking, the vendor's accept/start/complete steps, cancellation,
/// rescheduling and coupon redemption.
///
/// Every status change is checked against the state machine in [`crate::order_lifecycle`] and then written with a
/// compare-and-set on the status the order was read in. If another request moved the order in between, the change is
/// refused with `InvalidState` and nothing is written.
#[derive(Clone)]
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
    pricing: PricingConfig,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers, pricing: PricingConfig) -> Self {
        Self { db, producers, pricing }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }
}

impl<B> OrderFlowApi<B>
where B: CatalogManagement + OrderManagement + CouponManagement
{
    /// Books a service. The pricing snapshot is taken from the service's current price and discount and is never
    /// recomputed afterwards, except when a coupon is applied.
    pub async fn create_order(&self, actor: &Actor, request: NewOrderRequest) -> Result<Order, MarketplaceError> {
        if actor.role != Role::Customer {
            return Err(MarketplaceError::forbidden("Only customers can place orders"));
        }
        request.validate(Utc::now())?;
        let service = self
            .db
            .fetch_service(request.service_id)
            .await?
            .ok_or_else(|| MarketplaceError::not_found(format!("Service {}", request.service_id)))?;
        let vendor = self
            .db
            .fetch_vendor(service.vendor_id)
            .await?
            .ok_or_else(|| MarketplaceError::not_found(format!("Vendor {}", service.vendor_id)))?;
        if !service.is_active || !service.is_available {
            return Err(MarketplaceError::Unavailable(format!("{} is not available for booking", service.name)));
        }
        if !vendor.can_trade() {
            return Err(MarketplaceError::Unavailable(format!("{} is not accepting orders", vendor.business_name)));
        }
        let pricing = price_service(service.price, service.discount, &self.pricing);
        let template = NewOrder {
            order_number: OrderNumber::default(),
            customer_id: actor.id,
            vendor_id: vendor.id,
            service_id: service.id,
            service_name: service.name.clone(),
            pricing,
            currency: self.pricing.currency.clone(),
            scheduled_date: request.scheduled_date,
            scheduled_time: request.scheduled_time.trim().to_string(),
            address: request.address.trim().to_string(),
            customer_notes: non_empty(request.notes),
        };
        let order = with_fresh_number(new_order_number, |number| {
            let mut new_order = template.clone();
            new_order.order_number = OrderNumber(number);
            self.db.insert_order(new_order)
        })
        .await?;
        info!(
            "📦️ Order [{}] created by customer #{} for {} ({} {})",
            order.order_number, actor.id, order.service_name, order.total_amount, order.currency
        );
        self.publish(order.clone(), OrderEventKind::Created).await;
        Ok(order)
    }

    pub async fn accept(
        &self,
        actor: &Actor,
        number: &OrderNumber,
        notes: Option<String>,
    ) -> Result<Order, MarketplaceError> {
        let change = OrderChange::Accept { notes: non_empty(notes) };
        self.transition(actor, number, OrderAction::Accept, change, OrderEventKind::Accepted).await
    }

    pub async fn reject(
        &self,
        actor: &Actor,
        number: &OrderNumber,
        reason: Option<String>,
    ) -> Result<Order, MarketplaceError> {
        let change = OrderChange::Reject { reason: required(reason, "rejection reason")? };
        self.transition(actor, number, OrderAction::Reject, change, OrderEventKind::Rejected).await
    }

    pub async fn start(&self, actor: &Actor, number: &OrderNumber) -> Result<Order, MarketplaceError> {
        self.transition(actor, number, OrderAction::Start, OrderChange::Start, OrderEventKind::Started).await
    }

    pub async fn complete(
        &self,
        actor: &Actor,
        number: &OrderNumber,
        notes: Option<String>,
    ) -> Result<Order, MarketplaceError> {
        let change = OrderChange::Complete { notes: non_empty(notes) };
        self.transition(actor, number, OrderAction::Complete, change, OrderEventKind::Completed).await
    }

    /// Cancels an order. Vendors and admins must give a reason; customers get a default one.
    ///
    /// Cancelling a paid order does not refund it. Refunds are always an explicit ledger action.
    pub async fn cancel(
        &self,
        actor: &Actor,
        number: &OrderNumber,
        reason: Option<String>,
    ) -> Result<Order, MarketplaceError> {
        let reason = match actor.role {
            Role::Customer => non_empty(reason).unwrap_or_else(|| DEFAULT_CUSTOMER_CANCEL_REASON.to_string()),
            _ => required(reason, "cancellation reason")?,
        };
        let change = OrderChange::Cancel { reason, by: actor.role };
        let kind = OrderEventKind::Cancelled { by: actor.role };
        self.transition(actor, number, OrderAction::Cancel, change, kind).await
    }

    /// Moves the booking to a new slot. Only the slot immediately before this one is kept on the order.
    pub async fn reschedule(
        &self,
        actor: &Actor,
        number: &OrderNumber,
        request: RescheduleRequest,
    ) -> Result<Order, MarketplaceError> {
        request.validate(Utc::now())?;
        let change = OrderChange::Reschedule {
            date: request.scheduled_date,
            time: request.scheduled_time.trim().to_string(),
            reason: non_empty(request.reason),
        };
        let kind = OrderEventKind::Rescheduled { by: actor.role };
        self.transition(actor, number, OrderAction::Reschedule, change, kind).await
    }

    /// Redeems a coupon against a pending order and recomputes its total.
    ///
    /// Fails with `Conflict` if the order already carries a coupon, `NotFound` if the code does not exist and
    /// `Validation` (with the evaluator's reason) if the coupon does not apply.
    pub async fn apply_coupon(
        &self,
        actor: &Actor,
        number: &OrderNumber,
        code: &str,
    ) -> Result<Order, MarketplaceError> {
        let order = self.fetch_for_change(actor, number, OrderAction::ApplyCoupon).await?;
        if order.has_coupon() {
            return Err(MarketplaceError::Conflict("A coupon has already been applied to this order".into()));
        }
        let (coupon, verdict) = self.evaluate_coupon(&order, code).await?;
        let discount = match verdict {
            CouponVerdict::Applicable { discount } => discount,
            CouponVerdict::NotApplicable { rejection } => {
                debug!("📦️ Coupon {} rejected for order [{}]. {rejection}", coupon.code, order.order_number);
                return Err(MarketplaceError::Validation(rejection.to_string()));
            },
        };
        let discount = with_coupon(&order.pricing(), discount).coupon_discount;
        let updated = self.db.redeem_coupon(&coupon, &order, discount).await?;
        info!(
            "📦️ Coupon {} applied to order [{}]. Discount {discount}, new total {}",
            coupon.code, updated.order_number, updated.total_amount
        );
        self.publish(updated.clone(), OrderEventKind::CouponApplied).await;
        Ok(updated)
    }

    /// Evaluates a coupon against an order without redeeming it.
    pub async fn preview_coupon(
        &self,
        actor: &Actor,
        number: &OrderNumber,
        code: &str,
    ) -> Result<CouponPreview, MarketplaceError> {
        let order = self.fetch_order(actor, number).await?;
        let (coupon, verdict) = self.evaluate_coupon(&order, code).await?;
        Ok(CouponPreview { code: coupon.code, verdict })
    }

    /// Fetches an order the actor is allowed to see.
    pub async fn fetch_order(&self, actor: &Actor, number: &OrderNumber) -> Result<Order, MarketplaceError> {
        let order = self.order_by_number(number).await?;
        authorize_order(&self.db, actor, &order, false).await?;
        Ok(order)
    }

    /// Searches orders. Customers only see their own orders and vendors only the orders placed with them, whatever
    /// the filter says. Admins see everything.
    pub async fn search_orders(
        &self,
        actor: &Actor,
        filter: OrderQueryFilter,
        pagination: Pagination,
    ) -> Result<Page<Order>, MarketplaceError> {
        let filter = match actor.role {
            Role::Customer => filter.with_customer_id(actor.id),
            Role::Vendor => {
                let vendor = vendor_for_actor(&self.db, actor).await?;
                filter.with_vendor_id(vendor.id)
            },
            Role::Admin | Role::SuperAdmin => filter,
        };
        self.db.search_orders(filter, pagination).await
    }

    pub async fn orders_for_customer(
        &self,
        customer_id: i64,
        pagination: Pagination,
    ) -> Result<Page<Order>, MarketplaceError> {
        self.db.search_orders(OrderQueryFilter::default().with_customer_id(customer_id), pagination).await
    }

    pub async fn orders_for_vendor(
        &self,
        vendor_id: i64,
        pagination: Pagination,
    ) -> Result<Page<Order>, MarketplaceError> {
        self.db.search_orders(OrderQueryFilter::default().with_vendor_id(vendor_id), pagination).await
    }

    async fn order_by_number(&self, number: &OrderNumber) -> Result<Order, MarketplaceError> {
        self.db
            .fetch_order_by_number(number)
            .await?
            .ok_or_else(|| MarketplaceError::not_found(format!("Order {number}")))
    }

    /// Loads the order and runs the ownership and state machine checks for `action`.
    async fn fetch_for_change(
        &self,
        actor: &Actor,
        number: &OrderNumber,
        action: OrderAction,
    ) -> Result<Order, MarketplaceError> {
        let order = self.order_by_number(number).await?;
        authorize_order(&self.db, actor, &order, actor.role == Role::Vendor).await?;
        check_transition(actor.role, action, order.status)?;
        Ok(order)
    }

    async fn transition(
        &self,
        actor: &Actor,
        number: &OrderNumber,
        action: OrderAction,
        change: OrderChange,
        kind: OrderEventKind,
    ) -> Result<Order, MarketplaceError> {
        let order = self.fetch_for_change(actor, number, action).await?;
        let from = order.status;
        let updated = self.db.transition_order(order.id, from, change).await?.ok_or_else(|| {
            warn!("📦️ Order [{number}] changed status while {actor} tried to {action} it");
            MarketplaceError::invalid_state(format!("Order {number} is no longer {from}"))
        })?;
        info!("📦️ Order [{number}] {from} -> {} by {actor}", updated.status);
        self.publish(updated.clone(), kind).await;
        Ok(updated)
    }

    async fn evaluate_coupon(&self, order: &Order, code: &str) -> Result<(Coupon, CouponVerdict), MarketplaceError> {
        let coupon = self
            .db
            .fetch_coupon_by_code(code)
            .await?
            .ok_or_else(|| MarketplaceError::not_found(format!("Coupon {}", code.trim())))?;
        let category_id = self.db.fetch_service(order.service_id).await?.and_then(|s| s.category_id);
        let usage_by_user = self.db.coupon_usage_for_user(coupon.id, order.customer_id).await?;
        let ctx = CouponContext {
            user_id: order.customer_id,
            vendor_id: order.vendor_id,
            service_id: order.service_id,
            category_id,
            subtotal: order.subtotal,
            usage_by_user,
            now: Utc::now(),
        };
        let verdict = evaluate(&coupon, &ctx);
        Ok((coupon, verdict))
    }

    async fn publish(&self, order: Order, kind: OrderEventKind) {
        let contacts = load_contacts(&self.db, order.customer_id, order.vendor_id).await;
        self.producers.publish_order_event(OrderEvent::new(order, kind, contacts)).await;
    }
}
