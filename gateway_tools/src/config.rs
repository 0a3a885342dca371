use std::time::Duration;

use log::*;
use mkt_common::{helpers::env_flag, Secret};

const DEFAULT_CARD_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_SIGNATURE_TOLERANCE_SECS: i64 = 300;
const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(15);
const REDIRECT_SANDBOX_BASE: &str = "https://sandbox.sslcommerz.com";
const REDIRECT_LIVE_BASE: &str = "https://securepay.sslcommerz.com";

#[derive(Debug, Clone)]
pub struct CardProcessorConfig {
    /// Base URL for the REST API, without a trailing slash
    pub api_base: String,
    pub secret_key: Secret<String>,
    /// Shared secret used to sign webhook deliveries
    pub webhook_secret: Secret<String>,
    /// Maximum age of a webhook signature timestamp
    pub signature_tolerance_secs: i64,
    pub timeout: Duration,
}

impl Default for CardProcessorConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_CARD_API_BASE.to_string(),
            secret_key: Secret::default(),
            webhook_secret: Secret::default(),
            signature_tolerance_secs: DEFAULT_SIGNATURE_TOLERANCE_SECS,
            timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }
}

impl CardProcessorConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_base = std::env::var("MKT_CARD_API_BASE").unwrap_or_else(|_| DEFAULT_CARD_API_BASE.to_string());
        let secret_key = Secret::new(std::env::var("MKT_CARD_SECRET_KEY").unwrap_or_else(|_| {
            warn!("🔌️ MKT_CARD_SECRET_KEY not set. Card payments will fail until it is configured.");
            String::default()
        }));
        let webhook_secret = Secret::new(std::env::var("MKT_CARD_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("🔌️ MKT_CARD_WEBHOOK_SECRET not set. Every card webhook will be rejected.");
            String::default()
        }));
        let signature_tolerance_secs = std::env::var("MKT_CARD_SIGNATURE_TOLERANCE")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🔌️ Invalid MKT_CARD_SIGNATURE_TOLERANCE ({s}): {e}. Using the default."))
                    .ok()
            })
            .unwrap_or(DEFAULT_SIGNATURE_TOLERANCE_SECS);
        let timeout = gateway_timeout_from_env();
        let api_base = api_base.trim_end_matches('/').to_string();
        Self { api_base, secret_key, webhook_secret, signature_tolerance_secs, timeout }
    }
}

#[derive(Debug, Clone)]
pub struct RedirectGatewayConfig {
    pub store_id: String,
    pub store_password: Secret<String>,
    /// Use the sandbox endpoints
    pub sandbox: bool,
    pub timeout: Duration,
}

impl Default for RedirectGatewayConfig {
    fn default() -> Self {
        Self {
            store_id: String::default(),
            store_password: Secret::default(),
            sandbox: true,
            timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }
}

impl RedirectGatewayConfig {
    pub fn new_from_env_or_default() -> Self {
        let store_id = std::env::var("MKT_REDIRECT_STORE_ID").unwrap_or_else(|_| {
            warn!("🔌️ MKT_REDIRECT_STORE_ID not set. Redirect-gateway payments will fail until it is configured.");
            String::default()
        });
        let store_password = Secret::new(std::env::var("MKT_REDIRECT_STORE_PASSWORD").unwrap_or_else(|_| {
            warn!("🔌️ MKT_REDIRECT_STORE_PASSWORD not set.");
            String::default()
        }));
        let sandbox = env_flag("MKT_REDIRECT_SANDBOX", true);
        if sandbox {
            info!("🔌️ Redirect gateway is running against the SANDBOX environment.");
        }
        Self { store_id, store_password, sandbox, timeout: gateway_timeout_from_env() }
    }

    pub fn base_url(&self) -> &str {
        if self.sandbox {
            REDIRECT_SANDBOX_BASE
        } else {
            REDIRECT_LIVE_BASE
        }
    }
}

fn gateway_timeout_from_env() -> Duration {
    std::env::var("MKT_GATEWAY_TIMEOUT")
        .ok()
        .and_then(|s| {
            s.parse::<u64>()
                .map_err(|e| warn!("🔌️ Invalid MKT_GATEWAY_TIMEOUT ({s}): {e}. Using the default."))
                .ok()
        })
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_GATEWAY_TIMEOUT)
}
