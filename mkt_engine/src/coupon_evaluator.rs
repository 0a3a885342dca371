//! Coupon validation and discount calculation. Pure functions over a coupon and the order it is applied to.
use std::fmt::Display;

use chrono::{DateTime, Utc};
use mkt_common::{Money, Percent};
use serde::{Deserialize, Serialize};

use crate::db_types::{Coupon, CouponScope, CouponStatus, CouponType};

/// What the evaluator needs to know about the order and the customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponContext {
    pub user_id: i64,
    pub vendor_id: i64,
    pub service_id: i64,
    pub category_id: Option<i64>,
    pub subtotal: Money,
    /// How often this user has redeemed the coupon before
    pub usage_by_user: i64,
    pub now: DateTime<Utc>,
}

/// Why a coupon does not apply. Checks run in the order of the variants, and the first failure wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum CouponRejection {
    Inactive,
    NotYetValid { starts: DateTime<Utc> },
    Expired { ended: DateTime<Utc> },
    UsageLimitReached,
    UserLimitReached,
    BelowMinimum { minimum: Money },
    ServiceNotEligible,
    CategoryNotEligible,
    VendorNotEligible,
    /// Every check passed but the coupon is worth nothing on this order (e.g. free delivery on a service booking)
    NoDiscount,
}

impl Display for CouponRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CouponRejection::Inactive => write!(f, "Coupon is not active"),
            CouponRejection::NotYetValid { starts } => write!(f, "Coupon is valid from {}", starts.date_naive()),
            CouponRejection::Expired { ended } => write!(f, "Coupon expired on {}", ended.date_naive()),
            CouponRejection::UsageLimitReached => write!(f, "Coupon usage limit reached"),
            CouponRejection::UserLimitReached => {
                write!(f, "You have already used this coupon the maximum number of times")
            },
            CouponRejection::BelowMinimum { minimum } => write!(f, "Minimum order amount is {minimum}"),
            CouponRejection::ServiceNotEligible => write!(f, "Coupon is not applicable to this service"),
            CouponRejection::CategoryNotEligible => write!(f, "Coupon is not applicable to this category"),
            CouponRejection::VendorNotEligible => write!(f, "Coupon is not applicable to this vendor"),
            CouponRejection::NoDiscount => write!(f, "Coupon gives no discount on this order"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CouponVerdict {
    Applicable { discount: Money },
    NotApplicable { rejection: CouponRejection },
}

impl CouponVerdict {
    pub fn discount(&self) -> Option<Money> {
        match self {
            CouponVerdict::Applicable { discount } => Some(*discount),
            CouponVerdict::NotApplicable { .. } => None,
        }
    }
}

/// Runs every eligibility check, short-circuiting on the first one that fails.
pub fn validate(coupon: &Coupon, ctx: &CouponContext) -> Result<(), CouponRejection> {
    if coupon.status != CouponStatus::Active {
        return Err(CouponRejection::Inactive);
    }
    if ctx.now < coupon.start_date {
        return Err(CouponRejection::NotYetValid { starts: coupon.start_date });
    }
    if ctx.now > coupon.end_date {
        return Err(CouponRejection::Expired { ended: coupon.end_date });
    }
    if coupon.usage_limit.map(|limit| coupon.usage_count >= limit).unwrap_or(false) {
        return Err(CouponRejection::UsageLimitReached);
    }
    if coupon.per_user_limit.map(|limit| ctx.usage_by_user >= limit).unwrap_or(false) {
        return Err(CouponRejection::UserLimitReached);
    }
    if ctx.subtotal < coupon.min_order_amount {
        return Err(CouponRejection::BelowMinimum { minimum: coupon.min_order_amount });
    }
    match coupon.applicable_to {
        CouponScope::All => {},
        CouponScope::SpecificServices => {
            if !coupon.service_ids.0.contains(&ctx.service_id) {
                return Err(CouponRejection::ServiceNotEligible);
            }
        },
        CouponScope::SpecificCategories => {
            let eligible = ctx.category_id.map(|c| coupon.category_ids.0.contains(&c)).unwrap_or(false);
            if !eligible {
                return Err(CouponRejection::CategoryNotEligible);
            }
        },
    }
    if !coupon.vendor_ids.0.is_empty() && !coupon.vendor_ids.0.contains(&ctx.vendor_id) {
        return Err(CouponRejection::VendorNotEligible);
    }
    Ok(())
}

/// The discount the coupon is worth on `subtotal`, never more than the subtotal.
/// Service bookings carry no delivery fee, so free-delivery coupons are worth nothing.
pub fn calculate_discount(coupon: &Coupon, subtotal: Money) -> Money {
    let raw = match coupon.coupon_type {
        CouponType::Percentage => {
            let d = subtotal.percent(Percent::from_bps(coupon.value));
            coupon.max_discount.map(|cap| d.min(cap)).unwrap_or(d)
        },
        CouponType::Fixed => Money::from(coupon.value),
        CouponType::FreeDelivery => Money::ZERO,
    };
    raw.min(subtotal).max(Money::ZERO)
}

pub fn evaluate(coupon: &Coupon, ctx: &CouponContext) -> CouponVerdict {
    if let Err(rejection) = validate(coupon, ctx) {
        return CouponVerdict::NotApplicable { rejection };
    }
    let discount = calculate_discount(coupon, ctx.subtotal);
    if discount.is_positive() {
        CouponVerdict::Applicable { discount }
    } else {
        CouponVerdict::NotApplicable { rejection: CouponRejection::NoDiscount }
    }
}

#[cfg(test)]
mod test {
    use chrono::Duration;
    use sqlx::types::Json;

    use super::*;

    fn coupon(coupon_type: CouponType, value: i64) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: 1,
            code: "SAVE".into(),
            description: None,
            coupon_type,
            value,
            max_discount: None,
            min_order_amount: Money::ZERO,
            applicable_to: CouponScope::All,
            service_ids: Json(vec![]),
            category_ids: Json(vec![]),
            vendor_ids: Json(vec![]),
            usage_limit: None,
            usage_count: 0,
            per_user_limit: None,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            status: CouponStatus::Active,
            created_at: now,
        }
    }

    fn ctx(subtotal: i64) -> CouponContext {
        CouponContext {
            user_id: 7,
            vendor_id: 3,
            service_id: 11,
            category_id: Some(2),
            subtotal: Money::from_major(subtotal),
            usage_by_user: 0,
            now: Utc::now(),
        }
    }

    #[test]
    fn fixed_coupon_above_minimum() {
        let mut c = coupon(CouponType::Fixed, Money::from_major(200).value());
        c.min_order_amount = Money::from_major(500);
        assert_eq!(evaluate(&c, &ctx(900)), CouponVerdict::Applicable { discount: Money::from_major(200) });
    }

    #[test]
    fn below_minimum_is_an_explicit_rejection() {
        let mut c = coupon(CouponType::Fixed, Money::from_major(200).value());
        c.min_order_amount = Money::from_major(500);
        let verdict = evaluate(&c, &ctx(400));
        assert_eq!(verdict, CouponVerdict::NotApplicable {
            rejection: CouponRejection::BelowMinimum { minimum: Money::from_major(500) }
        });
        assert_eq!(verdict.discount(), None);
    }

    #[test]
    fn discounts_are_capped_at_subtotal() {
        let c = coupon(CouponType::Fixed, Money::from_major(5_000).value());
        assert_eq!(calculate_discount(&c, Money::from_major(900)), Money::from_major(900));
        let c = coupon(CouponType::Percentage, 15_000);
        assert_eq!(calculate_discount(&c, Money::from_major(900)), Money::from_major(900));
    }

    #[test]
    fn percentage_respects_max_discount() {
        let mut c = coupon(CouponType::Percentage, 2_000);
        assert_eq!(calculate_discount(&c, Money::from_major(900)), Money::from_major(180));
        c.max_discount = Some(Money::from_major(100));
        assert_eq!(calculate_discount(&c, Money::from_major(900)), Money::from_major(100));
    }

    #[test]
    fn free_delivery_gives_nothing_on_services() {
        let c = coupon(CouponType::FreeDelivery, 0);
        assert_eq!(evaluate(&c, &ctx(900)), CouponVerdict::NotApplicable { rejection: CouponRejection::NoDiscount });
    }

    #[test]
    fn checks_short_circuit_in_order() {
        let mut c = coupon(CouponType::Fixed, 100);
        c.status = CouponStatus::Inactive;
        c.end_date = Utc::now() - Duration::hours(1);
        assert_eq!(validate(&c, &ctx(900)), Err(CouponRejection::Inactive));
        c.status = CouponStatus::Active;
        assert!(matches!(validate(&c, &ctx(900)), Err(CouponRejection::Expired { .. })));
        c.end_date = Utc::now() + Duration::hours(1);
        c.start_date = Utc::now() + Duration::minutes(30);
        assert!(matches!(validate(&c, &ctx(900)), Err(CouponRejection::NotYetValid { .. })));
    }

    #[test]
    fn usage_limits() {
        let mut c = coupon(CouponType::Fixed, 100);
        c.usage_limit = Some(5);
        c.usage_count = 5;
        assert_eq!(validate(&c, &ctx(900)), Err(CouponRejection::UsageLimitReached));
        c.usage_count = 1;
        c.per_user_limit = Some(1);
        let mut context = ctx(900);
        context.usage_by_user = 1;
        assert_eq!(validate(&c, &context), Err(CouponRejection::UserLimitReached));
    }

    #[test]
    fn scope_restrictions() {
        let mut c = coupon(CouponType::Fixed, 100);
        c.applicable_to = CouponScope::SpecificServices;
        c.service_ids = Json(vec![12]);
        assert_eq!(validate(&c, &ctx(900)), Err(CouponRejection::ServiceNotEligible));
        c.service_ids = Json(vec![11]);
        assert!(validate(&c, &ctx(900)).is_ok());

        c.applicable_to = CouponScope::SpecificCategories;
        c.category_ids = Json(vec![9]);
        assert_eq!(validate(&c, &ctx(900)), Err(CouponRejection::CategoryNotEligible));
        c.category_ids = Json(vec![2]);
        assert!(validate(&c, &ctx(900)).is_ok());

        c.vendor_ids = Json(vec![4]);
        assert_eq!(validate(&c, &ctx(900)), Err(CouponRejection::VendorNotEligible));
    }
}
