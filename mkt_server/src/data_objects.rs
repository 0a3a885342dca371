use std::fmt::Display;

use chrono::{DateTime, Utc};
use mkt_common::Money;
use mkt_engine::{
    db_types::{OrderNumber, OrderStatusType, PaymentMethod, PaymentStatus, PayoutStatus},
    payout_objects::PayoutDecision,
    traits::{OrderQueryFilter, Pagination, TransactionQueryFilter},
};
use serde::{Deserialize, Serialize};

/// The envelope every API response is wrapped in. Errors are rendered by [`crate::errors::ServerError`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse<T = ()> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> JsonResponse<T> {
    pub fn data(data: T) -> Self {
        Self { success: true, message: None, data: Some(data) }
    }

    pub fn with_message<S: Display>(message: S, data: T) -> Self {
        Self { success: true, message: Some(message.to_string()), data: Some(data) }
    }
}

impl JsonResponse<()> {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: Some(message.to_string()), data: None }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: Some(message.to_string()), data: None }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotesParams {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReasonParams {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponParams {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutParams {
    pub order_number: OrderNumber,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPaymentParams {
    pub approved: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundParams {
    pub amount: Money,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessPayoutParams {
    pub decision: PayoutDecision,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletePayoutParams {
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayoutListQuery {
    #[serde(default)]
    pub status: Option<PayoutStatus>,
}

/// Query string for order listings, e.g. `?page=2&limit=10&status=pending`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<OrderStatusType>,
    pub payment_status: Option<PaymentStatus>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.limit)
    }

    pub fn filter(&self) -> OrderQueryFilter {
        let mut filter = OrderQueryFilter::default();
        if let Some(status) = self.status {
            filter = filter.with_status(status);
        }
        if let Some(status) = self.payment_status {
            filter = filter.with_payment_status(status);
        }
        if let Some(since) = self.since {
            filter = filter.since(since);
        }
        if let Some(until) = self.until {
            filter = filter.until(until);
        }
        filter
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsQuery {
    pub vendor_id: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl From<StatsQuery> for TransactionQueryFilter {
    fn from(q: StatsQuery) -> Self {
        let StatsQuery { vendor_id, payment_method, since, until } = q;
        TransactionQueryFilter { vendor_id, payment_method, since, until }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn envelope_skips_empty_fields() {
        let json = serde_json::to_string(&JsonResponse::success("Payout approved")).unwrap();
        assert_eq!(json, r#"{"success":true,"message":"Payout approved"}"#);
        let json = serde_json::to_string(&JsonResponse::data(vec![1, 2])).unwrap();
        assert_eq!(json, r#"{"success":true,"data":[1,2]}"#);
    }

    #[test]
    fn order_query_builds_filter() {
        let q = OrderListQuery {
            page: Some(0),
            limit: Some(500),
            status: Some(OrderStatusType::Pending),
            ..Default::default()
        };
        let p = q.pagination();
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, 100);
        assert_eq!(q.filter().status, Some(vec![OrderStatusType::Pending]));
        assert!(OrderListQuery::default().filter().is_empty());
    }
}
