use mkt_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderNumber, Payout, Role, Transaction, UserProfile, Vendor};

/// Someone to notify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    pub email: String,
}

impl From<&UserProfile> for Party {
    fn from(user: &UserProfile) -> Self {
        Self { name: user.name.clone(), email: user.email.clone() }
    }
}

impl From<&Vendor> for Party {
    fn from(vendor: &Vendor) -> Self {
        Self { name: vendor.business_name.clone(), email: vendor.email.clone() }
    }
}

/// The two sides of an order. Either may be missing if the record could not be loaded when the event was raised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contacts {
    pub customer: Option<Party>,
    pub vendor: Option<Party>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderEventKind {
    Created,
    Accepted,
    Rejected,
    Started,
    Completed,
    Cancelled { by: Role },
    Rescheduled { by: Role },
    CouponApplied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order: Order,
    pub kind: OrderEventKind,
    pub contacts: Contacts,
}

impl OrderEvent {
    pub fn new(order: Order, kind: OrderEventKind, contacts: Contacts) -> Self {
        Self { order, kind, contacts }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentEventKind {
    Settled,
    Failed { reason: String },
    Refunded { amount: Money },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub transaction: Transaction,
    pub order_number: OrderNumber,
    pub kind: PaymentEventKind,
    pub contacts: Contacts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutEventKind {
    Requested,
    Approved,
    Rejected,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutEvent {
    pub payout: Payout,
    pub kind: PayoutEventKind,
    pub vendor: Option<Party>,
}
