//! # Gateway tools
//!
//! Thin HTTP clients for the two asynchronous payment gateways used by the marketplace:
//!
//! * A card processor with a payment-intent / signed-webhook flow (Stripe-compatible REST API). See
//!   [`CardProcessorApi`].
//! * A redirect gateway with hosted checkout pages, browser redirects and a server-to-server IPN
//!   (SSLCommerz-compatible API). See [`RedirectGatewayApi`].
//!
//! The clients know nothing about orders or ledgers. They only speak the gateway wire formats. The marketplace
//! engine consumes them through the [`CardProcessor`] and [`RedirectGateway`] traits so that tests can swap in fakes.
mod card_api;
mod card_objects;
mod config;
mod error;
mod redirect_api;
mod redirect_objects;
mod traits;

pub mod signature;

pub use card_api::CardProcessorApi;
pub use card_objects::{
    CardCharge,
    CardRefund,
    CardWebhookEvent,
    NewPaymentIntent,
    PaymentError,
    PaymentIntent,
    WebhookEventData,
};
pub use config::{CardProcessorConfig, RedirectGatewayConfig};
pub use error::GatewayApiError;
pub use redirect_api::RedirectGatewayApi;
pub use redirect_objects::{RedirectCallback, RedirectSession, RedirectSessionRequest, RedirectValidation};
pub use traits::{CardProcessor, RedirectGateway};
