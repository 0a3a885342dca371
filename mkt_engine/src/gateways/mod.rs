//! Payment gateway adapters.
//!
//! Each adapter turns its gateway's flow into calls on the [`LedgerApi`](crate::LedgerApi):
//!
//! * [`CardAdapter`]: payment intents, confirmed by signed webhooks.
//! * [`RedirectAdapter`]: hosted checkout with browser redirects and an IPN, both validated with the gateway.
//! * [`ManualAdapter`]: proof of payment, settled by an admin.
//!
//! Gateway callbacks are normalised by [`GatewayCallback::into_settlement`] so that every method settles through the
//! same ledger call.
mod callback;
mod card;
mod config;
mod manual;
mod redirect;

pub use callback::{GatewayCallback, CHARGE_REFUNDED, INTENT_CANCELED, INTENT_FAILED, INTENT_SUCCEEDED};
pub use card::{CardAdapter, CardIntent, WebhookOutcome};
pub use config::GatewayConfig;
pub use manual::{ManualAdapter, ManualPaymentRequest};
pub use redirect::{RedirectAdapter, RedirectCallbackKind, RedirectInit, RedirectOutcome};
