//! Exchange gateway
//!
//! The trading engine only sees the [`ExchangeGateway`] trait. Two
//! implementations ship with the crate:
//! - [`coinbase`]: Coinbase Exchange REST client with retry, rate limiting
//!   and a circuit breaker
//! - [`paper`]: wraps another gateway, forwards market data and simulates
//!   market orders against an in-memory balance book

pub mod coinbase;
pub mod paper;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Balances, CandleSeries, Market, OrderResult, Pair, SeriesError, Timeframe};

pub use coinbase::CoinbaseClient;
pub use paper::PaperGateway;

/// Failures surfaced by a gateway call
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("missing or invalid credentials: {0}")]
    Auth(String),

    #[error("circuit breaker is open, rejecting request")]
    CircuitOpen,

    #[error("invalid candle data for {pair}: {source}")]
    InvalidCandles {
        pair: Pair,
        #[source]
        source: SeriesError,
    },

    #[error("unknown pair {0}")]
    UnknownPair(Pair),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Capabilities the agent needs from an exchange
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// All listed markets, active or not
    async fn load_markets(&self) -> GatewayResult<Vec<Market>>;

    /// Available balances, positive entries only
    async fn fetch_balance(&self) -> GatewayResult<Balances>;

    /// Candles for `pair` in ascending time order
    async fn fetch_candles(&self, pair: &Pair, timeframe: Timeframe)
        -> GatewayResult<CandleSeries>;

    /// Market buy of `amount` base currency
    async fn create_market_buy_order(&self, pair: &Pair, amount: f64)
        -> GatewayResult<OrderResult>;

    /// Market sell of `amount` base currency
    async fn create_market_sell_order(
        &self,
        pair: &Pair,
        amount: f64,
    ) -> GatewayResult<OrderResult>;
}
