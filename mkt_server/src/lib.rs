//! # Marketplace server
//! This crate hosts the REST server for the marketplace engine. It is responsible for:
//! * Exposing the order, payment, transaction and payout operations of [`mkt_engine`] under `/api`.
//! * Receiving card-processor webhooks and redirect-gateway callbacks and handing them to the gateway adapters.
//! * Running the stale payment worker and delivering email notifications.
//!
//! Authentication is done upstream. See [`auth`] for how the caller's identity reaches the handlers.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: The authenticated API. See [`routes`].
//! * `/webhooks/card`: Signed webhook deliveries from the card processor.
//! * `/payments/redirect/{success|fail|cancel|ipn}`: Redirect-gateway browser callbacks and IPN.
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod stale_payment_worker;

#[cfg(test)]
mod endpoint_tests;
