use std::env;

use log::*;
use mkt_common::Percent;

const DEFAULT_COMMISSION_BPS: i64 = 1_000;
const DEFAULT_PUBLIC_URL: &str = "http://127.0.0.1:8360";
const DEFAULT_CLIENT_URL: &str = "http://127.0.0.1:3000";

/// Settings shared by every payment adapter. Built once at start-up and handed to the adapters; nothing reads the
/// environment per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Platform commission used when the vendor has no rate of its own
    pub commission_rate: Percent,
    /// The externally reachable base URL of this server. Gateway callbacks are sent here.
    pub public_url: String,
    /// The base URL of the customer-facing web client. Browsers are sent back here after a hosted checkout.
    pub client_url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            commission_rate: Percent::from_bps(DEFAULT_COMMISSION_BPS),
            public_url: DEFAULT_PUBLIC_URL.to_string(),
            client_url: DEFAULT_CLIENT_URL.to_string(),
        }
    }
}

impl GatewayConfig {
    pub fn new_from_env_or_default() -> Self {
        let defaults = Self::default();
        let commission_rate = env::var("MKT_COMMISSION_RATE")
            .ok()
            .and_then(|s| match s.parse::<Percent>() {
                Ok(p) if p.is_valid_rate() => Some(p),
                Ok(p) => {
                    error!("🪛️ MKT_COMMISSION_RATE must be between 0 and 100, not {p}. Using the default.");
                    None
                },
                Err(e) => {
                    error!("🪛️ {e} in MKT_COMMISSION_RATE. Using the default.");
                    None
                },
            })
            .unwrap_or(defaults.commission_rate);
        let public_url = env::var("MKT_PUBLIC_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ MKT_PUBLIC_URL is not set. Gateway callbacks will be sent to {DEFAULT_PUBLIC_URL}");
            defaults.public_url
        });
        let client_url = env::var("MKT_CLIENT_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ MKT_CLIENT_URL is not set. Customers will be redirected to {DEFAULT_CLIENT_URL}");
            defaults.client_url
        });
        Self {
            commission_rate,
            public_url: public_url.trim_end_matches('/').to_string(),
            client_url: client_url.trim_end_matches('/').to_string(),
        }
    }

    /// The server endpoint the redirect gateway sends the browser (or its IPN) to, e.g. `.../payments/redirect/ipn`.
    pub fn redirect_callback_url(&self, kind: &str) -> String {
        format!("{}/payments/redirect/{kind}", self.public_url)
    }

    /// Where the customer's browser ends up after a hosted checkout, e.g. `.../payment/success?order=...`.
    pub fn client_result_url(&self, outcome: &str, order_number: &str, transaction_number: &str) -> String {
        format!("{}/payment/{outcome}?order={order_number}&transaction={transaction_number}", self.client_url)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn urls() {
        let config = GatewayConfig {
            public_url: "https://api.example.com".into(),
            client_url: "https://example.com".into(),
            ..Default::default()
        };
        assert_eq!(config.redirect_callback_url("ipn"), "https://api.example.com/payments/redirect/ipn");
        assert_eq!(
            config.client_result_url("fail", "ORD-1", "TXN-1"),
            "https://example.com/payment/fail?order=ORD-1&transaction=TXN-1"
        );
        assert_eq!(config.commission_rate, Percent::from_whole(10));
    }
}
