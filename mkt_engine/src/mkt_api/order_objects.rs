use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{coupon_evaluator::CouponVerdict, traits::MarketplaceError};

/// A customer's booking request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub service_id: i64,
    pub scheduled_date: DateTime<Utc>,
    pub scheduled_time: String,
    pub address: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewOrderRequest {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), MarketplaceError> {
        if self.scheduled_time.trim().is_empty() {
            return Err(MarketplaceError::validation("A scheduled time is required"));
        }
        if self.address.trim().is_empty() {
            return Err(MarketplaceError::validation("A service address is required"));
        }
        if self.scheduled_date <= now {
            return Err(MarketplaceError::validation("The scheduled date must be in the future"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescheduleRequest {
    pub scheduled_date: DateTime<Utc>,
    pub scheduled_time: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl RescheduleRequest {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), MarketplaceError> {
        if self.scheduled_time.trim().is_empty() {
            return Err(MarketplaceError::validation("A scheduled time is required"));
        }
        if self.scheduled_date <= now {
            return Err(MarketplaceError::validation("The new date must be in the future"));
        }
        Ok(())
    }
}

/// The result of checking a coupon against an order without redeeming it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponPreview {
    pub code: String,
    pub verdict: CouponVerdict,
}

/// Returns `Some(trimmed)` if the string has any non-whitespace content.
pub(crate) fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub(crate) fn required(s: Option<String>, what: &str) -> Result<String, MarketplaceError> {
    non_empty(s).ok_or_else(|| MarketplaceError::validation(format!("A {what} is required")))
}

#[cfg(test)]
mod test {
    use chrono::Duration;

    use super::*;

    #[test]
    fn new_order_validation() {
        let now = Utc::now();
        let mut req = NewOrderRequest {
            service_id: 1,
            scheduled_date: now + Duration::days(1),
            scheduled_time: "10:00".into(),
            address: "12 Lake Road".into(),
            notes: None,
        };
        assert!(req.validate(now).is_ok());
        req.address = "  ".into();
        assert!(matches!(req.validate(now), Err(MarketplaceError::Validation(_))));
        req.address = "12 Lake Road".into();
        req.scheduled_date = now - Duration::hours(1);
        assert!(matches!(req.validate(now), Err(MarketplaceError::Validation(_))));
    }

    #[test]
    fn required_fields() {
        assert_eq!(required(Some(" late ".into()), "reason").unwrap(), "late");
        assert!(required(Some("   ".into()), "reason").is_err());
        assert!(required(None, "reason").is_err());
    }
}
