//! Order pricing. All arithmetic is on integer minor units; percentages round half-up.
use mkt_common::{Money, Percent, DEFAULT_CURRENCY_CODE};
use serde::{Deserialize, Serialize};

use crate::db_types::PricingSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Charged on top of the discounted subtotal
    pub platform_fee_rate: Percent,
    pub tax_rate: Percent,
    pub currency: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            platform_fee_rate: Percent::from_whole(5),
            tax_rate: Percent::ZERO,
            currency: DEFAULT_CURRENCY_CODE.into(),
        }
    }
}

/// Computes the pricing snapshot for a booking of a service at `price` with a service-level `discount`.
pub fn price_service(price: Money, discount: Percent, config: &PricingConfig) -> PricingSnapshot {
    let discount_amount = price.percent(discount).min(price);
    let subtotal = price - discount_amount;
    let platform_fee = subtotal.percent(config.platform_fee_rate);
    let tax = subtotal.percent(config.tax_rate);
    PricingSnapshot {
        service_price: price,
        discount,
        discount_amount,
        subtotal,
        tax,
        platform_fee,
        coupon_discount: Money::ZERO,
        total_amount: subtotal + tax + platform_fee,
    }
}

/// Recomputes the total with a coupon discount. The discount is capped at the subtotal.
pub fn with_coupon(snapshot: &PricingSnapshot, coupon_discount: Money) -> PricingSnapshot {
    let coupon_discount = coupon_discount.min(snapshot.subtotal).max(Money::ZERO);
    PricingSnapshot {
        coupon_discount,
        total_amount: snapshot.subtotal + snapshot.tax + snapshot.platform_fee - coupon_discount,
        ..*snapshot
    }
}

pub fn is_consistent(p: &PricingSnapshot) -> bool {
    p.total_amount == p.subtotal + p.tax + p.platform_fee - p.coupon_discount && p.total_amount >= Money::ZERO
}
