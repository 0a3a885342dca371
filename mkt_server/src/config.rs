use std::{env, net::IpAddr};

use chrono::Duration;
use gateway_tools::{CardProcessorConfig, RedirectGatewayConfig};
use log::*;
use mkt_common::{helpers::env_flag, Percent, Secret};
use mkt_engine::{GatewayConfig, PricingConfig};

const DEFAULT_MKT_HOST: &str = "127.0.0.1";
const DEFAULT_MKT_PORT: u16 = 8360;
const DEFAULT_STALE_PAYMENT_TIMEOUT: Duration = Duration::minutes(30);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    /// Accept the identity headers set by the upstream authentication layer. Only switch this off for a server that
    /// should serve the public gateway endpoints alone.
    pub trust_identity_headers: bool,
    /// If supplied, redirect-gateway IPN posts are only accepted from these addresses.
    pub ipn_whitelist: Option<Vec<IpAddr>>,
    /// Card and redirect payments still in flight after this long are failed by the stale payment worker.
    pub stale_payment_timeout: Duration,
    pub email: EmailConfig,
    pub gateway: GatewayConfig,
    pub pricing: PricingConfig,
    pub card: CardProcessorConfig,
    pub redirect: RedirectGatewayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MKT_HOST.to_string(),
            port: DEFAULT_MKT_PORT,
            database_url: String::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            trust_identity_headers: true,
            ipn_whitelist: None,
            stale_payment_timeout: DEFAULT_STALE_PAYMENT_TIMEOUT,
            email: EmailConfig::default(),
            gateway: GatewayConfig::default(),
            pricing: PricingConfig::default(),
            card: CardProcessorConfig::default(),
            redirect: RedirectGatewayConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MKT_HOST").ok().unwrap_or_else(|| DEFAULT_MKT_HOST.into());
        let port = env::var("MKT_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for MKT_PORT. {e} Using the default, {DEFAULT_MKT_PORT}, instead."
                    );
                    DEFAULT_MKT_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_MKT_PORT);
        let database_url = env::var("MKT_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ MKT_DATABASE_URL is not set. Please set it to the URL for the marketplace database.");
            String::default()
        });
        let use_x_forwarded_for = env_flag("MKT_USE_X_FORWARDED_FOR", false);
        let use_forwarded = env_flag("MKT_USE_FORWARDED", false);
        let trust_identity_headers = env_flag("MKT_TRUST_IDENTITY_HEADERS", true);
        if !trust_identity_headers {
            warn!("🪛️ Identity headers are not trusted. Every authenticated route will answer 401.");
        }
        let ipn_whitelist = ipn_whitelist_from_env();
        let stale_payment_timeout = stale_payment_timeout_from_env();
        Self {
            host,
            port,
            database_url,
            use_x_forwarded_for,
            use_forwarded,
            trust_identity_headers,
            ipn_whitelist,
            stale_payment_timeout,
            email: EmailConfig::from_env(),
            gateway: GatewayConfig::new_from_env_or_default(),
            pricing: pricing_from_env(),
            card: CardProcessorConfig::new_from_env_or_default(),
            redirect: RedirectGatewayConfig::new_from_env_or_default(),
        }
    }
}

fn ipn_whitelist_from_env() -> Option<Vec<IpAddr>> {
    let whitelist = env::var("MKT_REDIRECT_IPN_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
    match &whitelist {
        Some(whitelist) if whitelist.is_empty() => {
            warn!(
                "🚨️ The IPN whitelist was configured, but is empty. The server will run, but won't accept any IPN \
                 requests."
            );
        },
        None => {
            info!("🪛️ No IPN whitelist is set. IPN posts are only checked with the gateway's validation API.");
        },
        Some(v) => {
            let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
            info!("🪛️ IPN whitelist: {addrs}");
        },
    }
    whitelist
}

/// Parses a comma-separated list of IP addresses. "none", "false" and "0" disable the whitelist.
pub fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0"].contains(&s.trim().to_lowercase().as_str()) {
        info!("🪛️ IPN whitelist is disabled.");
        return None;
    }
    let ip_addrs = s
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            s.parse()
                .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in MKT_REDIRECT_IPN_WHITELIST: {e}"))
                .ok()
        })
        .collect::<Vec<IpAddr>>();
    Some(ip_addrs)
}

fn stale_payment_timeout_from_env() -> Duration {
    env::var("MKT_STALE_PAYMENT_TIMEOUT")
        .map_err(|_| {
            info!(
                "🪛️ MKT_STALE_PAYMENT_TIMEOUT is not set. Using the default value of {} minutes.",
                DEFAULT_STALE_PAYMENT_TIMEOUT.num_minutes()
            )
        })
        .and_then(|s| {
            s.parse::<i64>()
                .map(Duration::minutes)
                .map_err(|e| warn!("🪛️ Invalid configuration value for MKT_STALE_PAYMENT_TIMEOUT. {e}"))
        })
        .ok()
        .unwrap_or(DEFAULT_STALE_PAYMENT_TIMEOUT)
}

fn pricing_from_env() -> PricingConfig {
    let defaults = PricingConfig::default();
    let rate = |name: &str, default: Percent| {
        env::var(name)
            .ok()
            .and_then(|s| match s.parse::<Percent>() {
                Ok(p) if p.is_valid_rate() => Some(p),
                Ok(p) => {
                    error!("🪛️ {name} must be between 0 and 100, not {p}. Using the default.");
                    None
                },
                Err(e) => {
                    error!("🪛️ {e} in {name}. Using the default.");
                    None
                },
            })
            .unwrap_or(default)
    };
    let platform_fee_rate = rate("MKT_PLATFORM_FEE_RATE", defaults.platform_fee_rate);
    let tax_rate = rate("MKT_TAX_RATE", defaults.tax_rate);
    let currency = env::var("MKT_CURRENCY").ok().map(|s| s.trim().to_uppercase()).unwrap_or(defaults.currency);
    PricingConfig { platform_fee_rate, tax_rate, currency }
}

//-------------------------------------------------  EmailConfig  ------------------------------------------------------
#[derive(Clone, Debug, Default)]
pub struct EmailConfig {
    /// The email service endpoint. When unset, notifications are only logged.
    pub service_url: Option<String>,
    pub api_key: Secret<String>,
    pub sender: String,
}

impl EmailConfig {
    pub fn from_env() -> Self {
        let service_url = env::var("MKT_EMAIL_SERVICE_URL").ok().filter(|s| !s.trim().is_empty());
        if service_url.is_none() {
            info!("🪛️ MKT_EMAIL_SERVICE_URL is not set. Notifications will be written to the log only.");
        }
        let api_key = Secret::new(env::var("MKT_EMAIL_API_KEY").unwrap_or_default());
        let sender = env::var("MKT_EMAIL_SENDER").unwrap_or_else(|_| "no-reply@localhost".to_string());
        Self { service_url, api_key, sender }
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
    pub ipn_whitelist: Option<Vec<IpAddr>>,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
            ipn_whitelist: config.ipn_whitelist.clone(),
        }
    }

    /// `None` means the whitelist is off. An address that could not be determined is never allowed through a
    /// whitelist.
    pub fn ipn_allowed(&self, peer: Option<IpAddr>) -> bool {
        match (peer, &self.ipn_whitelist) {
            (_, None) => true,
            (Some(ip), Some(whitelist)) => whitelist.contains(&ip),
            (None, Some(_)) => {
                warn!("💻️ No IP address found in the IPN request, denying access.");
                false
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn whitelist_parsing() {
        assert!(parse_whitelist("none").is_none());
        assert!(parse_whitelist("FALSE").is_none());
        let list = parse_whitelist("103.26.139.87, not-an-ip,::1").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0], "103.26.139.87".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn ipn_access() {
        let mut options = ServerOptions::default();
        assert!(options.ipn_allowed(None));
        options.ipn_whitelist = Some(vec!["10.0.0.1".parse().unwrap()]);
        assert!(options.ipn_allowed(Some("10.0.0.1".parse().unwrap())));
        assert!(!options.ipn_allowed(Some("10.0.0.2".parse().unwrap())));
        assert!(!options.ipn_allowed(None));
    }
}
