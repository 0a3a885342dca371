use std::str::FromStr;

use mkt_common::Money;
use serde::{Deserialize, Serialize};

use crate::GatewayApiError;

/// What we need to open a hosted checkout session on the redirect gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectSessionRequest {
    pub transaction_number: String,
    pub amount: Money,
    pub currency: String,
    pub success_url: String,
    pub fail_url: String,
    pub cancel_url: String,
    pub ipn_url: String,
    pub product_name: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
}

impl RedirectSessionRequest {
    /// The form fields, in the gateway's naming convention. Credentials are added by the client.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("total_amount", self.amount.to_string()),
            ("currency", self.currency.clone()),
            ("tran_id", self.transaction_number.clone()),
            ("success_url", self.success_url.clone()),
            ("fail_url", self.fail_url.clone()),
            ("cancel_url", self.cancel_url.clone()),
            ("ipn_url", self.ipn_url.clone()),
            ("product_name", self.product_name.clone()),
            ("product_category", "service".to_string()),
            ("product_profile", "non-physical-goods".to_string()),
            ("shipping_method", "NO".to_string()),
            ("num_of_item", "1".to_string()),
            ("cus_name", self.customer_name.clone()),
            ("cus_email", self.customer_email.clone()),
            ("cus_phone", self.customer_phone.clone()),
            ("cus_add1", "N/A".to_string()),
            ("cus_city", "N/A".to_string()),
            ("cus_country", "Bangladesh".to_string()),
        ]
    }
}

/// The gateway's answer to a session init request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedirectSession {
    pub status: String,
    #[serde(default, rename = "failedreason")]
    pub failed_reason: Option<String>,
    #[serde(default, rename = "sessionkey")]
    pub session_key: Option<String>,
    #[serde(default, rename = "GatewayPageURL")]
    pub gateway_page_url: Option<String>,
}

impl RedirectSession {
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("SUCCESS") && self.gateway_page_url.as_ref().is_some_and(|u| !u.is_empty())
    }
}

/// The form body posted to the success/fail/cancel endpoints, and to the IPN endpoint.
///
/// None of these fields may be trusted until the `val_id` has been checked against the validation API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedirectCallback {
    pub tran_id: String,
    #[serde(default)]
    pub val_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub bank_tran_id: Option<String>,
    #[serde(default)]
    pub card_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// The validation API response for a `val_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedirectValidation {
    pub status: String,
    #[serde(default)]
    pub tran_id: String,
    #[serde(default)]
    pub val_id: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub bank_tran_id: Option<String>,
    #[serde(default)]
    pub card_type: Option<String>,
    #[serde(default)]
    pub risk_level: Option<String>,
}

impl RedirectValidation {
    /// `VALID` on first validation, `VALIDATED` on every subsequent one.
    pub fn is_valid(&self) -> bool {
        matches!(self.status.as_str(), "VALID" | "VALIDATED")
    }

    pub fn amount(&self) -> Result<Money, GatewayApiError> {
        Money::from_str(&self.amount).map_err(|e| GatewayApiError::InvalidCurrencyAmount(e.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn session_response() {
        let json = r#"{"status":"SUCCESS","failedreason":"","sessionkey":"ABC","GatewayPageURL":"https://pay/x"}"#;
        let session: RedirectSession = serde_json::from_str(json).unwrap();
        assert!(session.is_success());
        let json = r#"{"status":"FAILED","failedreason":"Store Credential Error","GatewayPageURL":""}"#;
        let session: RedirectSession = serde_json::from_str(json).unwrap();
        assert!(!session.is_success());
        assert_eq!(session.failed_reason.as_deref(), Some("Store Credential Error"));
    }

    #[test]
    fn validation_amount() {
        let v = RedirectValidation { status: "VALIDATED".into(), amount: "945.00".into(), ..Default::default() };
        assert!(v.is_valid());
        assert_eq!(v.amount().unwrap(), Money::from(94500));
        let v = RedirectValidation { status: "INVALID_TRANSACTION".into(), ..Default::default() };
        assert!(!v.is_valid());
    }
}
