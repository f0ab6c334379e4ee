//! Coinbase Exchange gateway
//!
//! - [`auth`]: HMAC-SHA256 request signing and credentials
//! - [`types`]: request and response models
//! - [`client`]: API client implementing [`ExchangeGateway`](crate::gateway::ExchangeGateway)
//!
//! Credentials come from the `exchange` config section or the
//! `COINBASE_API_KEY`, `COINBASE_API_SECRET` and `COINBASE_API_PASSPHRASE`
//! environment variables. Public market data works without them.

pub mod auth;
pub mod client;
pub mod types;

pub use auth::{sign_request, Credentials};
pub use client::{ClientConfig, CoinbaseClient};
