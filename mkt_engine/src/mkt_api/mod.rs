//! # Marketplace engine public API
//!
//! The `mkt_api` module exposes the programmatic API of the marketplace engine. Each API is generic over the storage
//! traits it needs, so callers can pick the parts they use.
//!
//! * [`order_flow_api`] books services and moves orders through their life cycle.
//! * [`ledger_api`] records payment attempts, settles them from gateway verdicts and records refunds.
//! * [`payout_api`] batches vendor earnings into payouts.
//!
//! # API usage
//!
//! ```rust,ignore
//! use mkt_engine::{events::EventProducers, OrderFlowApi, PricingConfig, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/marketplace.db", 5).await?;
//! let api = OrderFlowApi::new(db, EventProducers::default(), PricingConfig::default());
//! let order = api.create_order(&customer, request).await?;
//! ```
mod access;

pub mod ledger_api;
pub mod ledger_objects;
pub mod order_flow_api;
pub mod order_objects;
pub mod payout_api;
pub mod payout_objects;
