//! Data types stored in, and returned from, the marketplace database.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use mkt_common::{Money, Percent};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid {kind} value: {value}")]
pub struct ConversionError {
    pub kind: &'static str,
    pub value: String,
}

/// Implements `Display` and `FromStr` for a text-backed enum, using the same snake_case labels as the database.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $label),)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)+
                    other => Err(ConversionError { kind: stringify!($name), value: other.to_string() }),
                }
            }
        }
    };
}

//--------------------------------------        Role         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Vendor,
    Admin,
    SuperAdmin,
}

text_enum!(Role { Customer => "customer", Vendor => "vendor", Admin => "admin", SuperAdmin => "super_admin" });

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

/// The authenticated party performing an operation. The id is always a user id, also for vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl Actor {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    pub fn customer(id: i64) -> Self {
        Self::new(id, Role::Customer)
    }

    pub fn vendor(id: i64) -> Self {
        Self::new(id, Role::Vendor)
    }

    pub fn admin(id: i64) -> Self {
        Self::new(id, Role::Admin)
    }
}

impl Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.role, self.id)
    }
}

//--------------------------------------     UserProfile     ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

//--------------------------------------       Vendor        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VendorStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Suspended,
}

text_enum!(VendorStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    Suspended => "suspended",
});

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Vendor {
    pub id: i64,
    /// The user account that owns this vendor profile
    pub user_id: i64,
    pub business_name: String,
    pub email: String,
    pub status: VendorStatus,
    pub is_active: bool,
    /// Per-vendor commission override. `None` uses the platform default.
    pub commission_rate: Option<Percent>,
    pub total_revenue: Money,
    pub total_commission: Money,
    pub completed_orders: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vendor {
    pub fn can_trade(&self) -> bool {
        self.status == VendorStatus::Approved && self.is_active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVendor {
    pub user_id: i64,
    pub business_name: String,
    pub email: String,
    pub status: VendorStatus,
    pub commission_rate: Option<Percent>,
}

//--------------------------------------       Service       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub vendor_id: i64,
    pub category_id: Option<i64>,
    pub name: String,
    pub price: Money,
    /// Service-level discount
    pub discount: Percent,
    pub is_active: bool,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewService {
    pub vendor_id: i64,
    pub category_id: Option<i64>,
    pub name: String,
    pub price: Money,
    pub discount: Percent,
}

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// Booked by the customer, awaiting the vendor's decision
    Pending,
    Accepted,
    Rejected,
    InProgress,
    Completed,
    Cancelled,
}

text_enum!(OrderStatusType {
    Pending => "pending",
    Accepted => "accepted",
    Rejected => "rejected",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Rejected)
    }
}

//--------------------------------------    PaymentStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

text_enum!(PaymentStatus { Pending => "pending", Paid => "paid", Failed => "failed", Refunded => "refunded" });

//--------------------------------------    PaymentMethod    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card processor with payment intents and signed webhooks
    Card,
    /// Hosted checkout with browser redirects and IPN
    Redirect,
    /// Bank transfer or cash, verified by an admin against an uploaded proof
    Manual,
}

text_enum!(PaymentMethod { Card => "card", Redirect => "redirect", Manual => "manual" });

//--------------------------------------     OrderNumber     ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(pub String);

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderNumber {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<&str> for OrderNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------   PricingSnapshot   ---------------------------------------------------------
/// The prices computed when the order is booked. Only the coupon fields and the total change afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSnapshot {
    pub service_price: Money,
    pub discount: Percent,
    pub discount_amount: Money,
    pub subtotal: Money,
    pub tax: Money,
    pub platform_fee: Money,
    pub coupon_discount: Money,
    pub total_amount: Money,
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub customer_id: i64,
    pub vendor_id: i64,
    pub service_id: i64,
    pub service_name: String,
    pub service_price: Money,
    pub discount: Percent,
    pub discount_amount: Money,
    pub subtotal: Money,
    pub tax: Money,
    pub platform_fee: Money,
    pub coupon_code: Option<String>,
    pub coupon_discount: Money,
    pub total_amount: Money,
    pub currency: String,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub scheduled_date: DateTime<Utc>,
    pub scheduled_time: String,
    pub address: String,
    pub customer_notes: Option<String>,
    pub vendor_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<Role>,
    /// The schedule in force before the most recent reschedule. Only one prior slot is kept.
    pub rescheduled_from_date: Option<DateTime<Utc>>,
    pub rescheduled_from_time: Option<String>,
    pub reschedule_reason: Option<String>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn pricing(&self) -> PricingSnapshot {
        PricingSnapshot {
            service_price: self.service_price,
            discount: self.discount,
            discount_amount: self.discount_amount,
            subtotal: self.subtotal,
            tax: self.tax,
            platform_fee: self.platform_fee,
            coupon_discount: self.coupon_discount,
            total_amount: self.total_amount,
        }
    }

    pub fn has_coupon(&self) -> bool {
        self.coupon_code.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub customer_id: i64,
    pub vendor_id: i64,
    pub service_id: i64,
    pub service_name: String,
    pub pricing: PricingSnapshot,
    pub currency: String,
    pub scheduled_date: DateTime<Utc>,
    pub scheduled_time: String,
    pub address: String,
    pub customer_notes: Option<String>,
}

//--------------------------------------  TransactionStatus  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
    PartiallyRefunded,
}

text_enum!(TransactionStatus {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Failed => "failed",
    Refunded => "refunded",
    PartiallyRefunded => "partially_refunded",
});

impl TransactionStatus {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// True once the money has moved, even if some or all of it was later returned
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Completed | Self::Refunded | Self::PartiallyRefunded)
    }

    pub fn all() -> [TransactionStatus; 6] {
        use TransactionStatus::*;
        [Pending, Processing, Completed, Failed, Refunded, PartiallyRefunded]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Payment,
    Refund,
}

text_enum!(TransactionType { Payment => "payment", Refund => "refund" });

//--------------------------------------     Transaction     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub transaction_number: String,
    pub order_id: i64,
    pub customer_id: i64,
    pub vendor_id: i64,
    pub transaction_type: TransactionType,
    pub payment_method: PaymentMethod,
    pub amount: Money,
    pub commission_rate: Percent,
    pub commission_amount: Money,
    pub vendor_amount: Money,
    pub currency: String,
    pub status: TransactionStatus,
    /// Card: payment intent id. Redirect: gateway session key. Manual: the customer's payment reference.
    pub gateway_reference: Option<String>,
    /// Card: charge id. Redirect: validation id. Manual: the stored proof file id.
    pub gateway_validation_id: Option<String>,
    /// Redirect: the bank transaction id reported by the validation API
    pub gateway_transaction_id: Option<String>,
    pub gateway_response: Option<Json<serde_json::Value>>,
    pub payment_proof: Option<Json<PaymentProof>>,
    pub failure_reason: Option<String>,
    /// Set when the failure was inferred locally (timeout, abandoned). A later gateway success still wins.
    pub expired: bool,
    pub refund_amount: Money,
    pub refund_reason: Option<String>,
    pub refunded_by: Option<i64>,
    pub refunded_at: Option<DateTime<Utc>>,
    /// For refund entries, the payment they return money from
    pub parent_id: Option<i64>,
    pub payout_id: Option<i64>,
    pub verified_by: Option<i64>,
    pub admin_notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The gateway identifiers attached to a transaction, as a tagged view over the stored columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "payment_method", rename_all = "snake_case")]
pub enum GatewayLinkage {
    Card { intent_id: Option<String>, charge_id: Option<String> },
    Redirect { session_key: Option<String>, validation_id: Option<String>, bank_transaction_id: Option<String> },
    Manual { reference: Option<String>, proof_id: Option<String> },
}

impl Transaction {
    pub fn remaining_refundable(&self) -> Money {
        self.amount - self.refund_amount
    }

    pub fn is_payout_eligible(&self) -> bool {
        self.status == TransactionStatus::Completed
            && self.transaction_type == TransactionType::Payment
            && self.payout_id.is_none()
    }

    pub fn linkage(&self) -> GatewayLinkage {
        let reference = self.gateway_reference.clone();
        let validation = self.gateway_validation_id.clone();
        match self.payment_method {
            PaymentMethod::Card => GatewayLinkage::Card { intent_id: reference, charge_id: validation },
            PaymentMethod::Redirect => GatewayLinkage::Redirect {
                session_key: reference,
                validation_id: validation,
                bank_transaction_id: self.gateway_transaction_id.clone(),
            },
            PaymentMethod::Manual => GatewayLinkage::Manual { reference, proof_id: validation },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub transaction_number: String,
    pub order_id: i64,
    pub customer_id: i64,
    pub vendor_id: i64,
    pub payment_method: PaymentMethod,
    pub amount: Money,
    pub commission_rate: Percent,
    pub commission_amount: Money,
    pub vendor_amount: Money,
    pub currency: String,
    pub status: TransactionStatus,
    pub gateway_reference: Option<String>,
    pub gateway_validation_id: Option<String>,
    pub payment_proof: Option<PaymentProof>,
}

impl NewTransaction {
    /// Builds a new payment attempt, splitting `amount` into commission and vendor share.
    /// The vendor share is always `amount - commission`, so the two always add up to `amount`.
    pub fn payment(order: &Order, method: PaymentMethod, commission_rate: Percent, number: String) -> Self {
        let amount = order.total_amount;
        let commission_amount = amount.percent(commission_rate);
        let status = match method {
            PaymentMethod::Manual => TransactionStatus::Processing,
            _ => TransactionStatus::Pending,
        };
        Self {
            transaction_number: number,
            order_id: order.id,
            customer_id: order.customer_id,
            vendor_id: order.vendor_id,
            payment_method: method,
            amount,
            commission_rate,
            commission_amount,
            vendor_amount: amount - commission_amount,
            currency: order.currency.clone(),
            status,
            gateway_reference: None,
            gateway_validation_id: None,
            payment_proof: None,
        }
    }

    pub fn with_gateway_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.gateway_reference = Some(reference.into());
        self
    }

    pub fn with_validation_id<S: Into<String>>(mut self, id: S) -> Self {
        self.gateway_validation_id = Some(id.into());
        self
    }

    pub fn with_payment_proof(mut self, proof: PaymentProof) -> Self {
        self.payment_proof = Some(proof);
        self
    }
}

/// What a customer submits for a manual (bank transfer, cash deposit) payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProof {
    /// The customer's own payment reference, e.g. the bank transfer id
    pub reference: String,
    /// Id of the uploaded receipt in the file store
    #[serde(default)]
    pub proof_file_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

//--------------------------------------       Coupon        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CouponType {
    /// `value` is in basis points
    Percentage,
    /// `value` is in minor currency units
    Fixed,
    FreeDelivery,
}

text_enum!(CouponType { Percentage => "percentage", Fixed => "fixed", FreeDelivery => "free_delivery" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CouponScope {
    All,
    SpecificServices,
    SpecificCategories,
}

text_enum!(CouponScope {
    All => "all",
    SpecificServices => "specific_services",
    SpecificCategories => "specific_categories",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CouponStatus {
    Active,
    Inactive,
    Expired,
}

text_enum!(CouponStatus { Active => "active", Inactive => "inactive", Expired => "expired" });

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Coupon {
    pub id: i64,
    /// Always upper case
    pub code: String,
    pub description: Option<String>,
    pub coupon_type: CouponType,
    /// Basis points for percentage coupons, minor units for fixed coupons, unused for free delivery
    pub value: i64,
    /// Upper bound on a percentage discount
    pub max_discount: Option<Money>,
    pub min_order_amount: Money,
    pub applicable_to: CouponScope,
    pub service_ids: Json<Vec<i64>>,
    pub category_ids: Json<Vec<i64>>,
    /// Empty means every vendor
    pub vendor_ids: Json<Vec<i64>>,
    pub usage_limit: Option<i64>,
    pub usage_count: i64,
    pub per_user_limit: Option<i64>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: CouponStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCoupon {
    pub code: String,
    pub description: Option<String>,
    pub coupon_type: CouponType,
    pub value: i64,
    pub max_discount: Option<Money>,
    pub min_order_amount: Money,
    pub applicable_to: CouponScope,
    pub service_ids: Vec<i64>,
    pub category_ids: Vec<i64>,
    pub vendor_ids: Vec<i64>,
    pub usage_limit: Option<i64>,
    pub per_user_limit: Option<i64>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl NewCoupon {
    /// A coupon valid for everything from now for `days` days.
    pub fn new<S: AsRef<str>>(code: S, coupon_type: CouponType, value: i64, days: i64) -> Self {
        let now = Utc::now();
        Self {
            code: code.as_ref().to_uppercase(),
            description: None,
            coupon_type,
            value,
            max_discount: None,
            min_order_amount: Money::ZERO,
            applicable_to: CouponScope::All,
            service_ids: vec![],
            category_ids: vec![],
            vendor_ids: vec![],
            usage_limit: None,
            per_user_limit: None,
            start_date: now - chrono::Duration::minutes(1),
            end_date: now + chrono::Duration::days(days),
        }
    }

    pub fn with_min_order_amount(mut self, amount: Money) -> Self {
        self.min_order_amount = amount;
        self
    }

    pub fn with_usage_limit(mut self, limit: i64) -> Self {
        self.usage_limit = Some(limit);
        self
    }

    pub fn with_per_user_limit(mut self, limit: i64) -> Self {
        self.per_user_limit = Some(limit);
        self
    }

    pub fn for_services(mut self, ids: Vec<i64>) -> Self {
        self.applicable_to = CouponScope::SpecificServices;
        self.service_ids = ids;
        self
    }

    pub fn for_categories(mut self, ids: Vec<i64>) -> Self {
        self.applicable_to = CouponScope::SpecificCategories;
        self.category_ids = ids;
        self
    }

    pub fn for_vendors(mut self, ids: Vec<i64>) -> Self {
        self.vendor_ids = ids;
        self
    }
}

//--------------------------------------       Payout        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

text_enum!(PayoutStatus {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayoutMethod {
    BankTransfer,
    MobileBanking,
    Cash,
}

text_enum!(PayoutMethod { BankTransfer => "bank_transfer", MobileBanking => "mobile_banking", Cash => "cash" });

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Payout {
    pub id: i64,
    pub vendor_id: i64,
    pub amount: Money,
    pub transaction_count: i64,
    pub method: PayoutMethod,
    pub status: PayoutStatus,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub gateway_reference: Option<String>,
    pub admin_notes: Option<String>,
    pub processed_by: Option<i64>,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn enum_labels_round_trip_through_text() {
        assert_eq!(OrderStatusType::InProgress.to_string(), "in_progress");
        assert_eq!("partially_refunded".parse::<TransactionStatus>().unwrap(), TransactionStatus::PartiallyRefunded);
        assert!("paid_twice".parse::<PaymentStatus>().is_err());
        assert_eq!(Role::SuperAdmin.to_string(), "super_admin");
        assert!(Role::SuperAdmin.is_admin());
        assert!(!Role::Vendor.is_admin());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&TransactionStatus::PartiallyRefunded).unwrap();
        assert_eq!(json, "\"partially_refunded\"");
        let m: PaymentMethod = serde_json::from_str("\"redirect\"").unwrap();
        assert_eq!(m, PaymentMethod::Redirect);
    }

    #[test]
    fn terminal_states() {
        use OrderStatusType::*;
        assert!(Completed.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(Rejected.is_terminal());
        assert!(!Pending.is_terminal());
        assert!(!InProgress.is_terminal());
    }
}
