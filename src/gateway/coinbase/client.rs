//! Coinbase Exchange API client
//!
//! HTTP client for the Coinbase Exchange REST API with:
//! - Automatic retry with exponential backoff on transport and 5xx errors
//! - Request pacing
//! - Circuit breaker so a dead exchange fails fast instead of stalling
//!
//! # Example
//!
//! ```no_run
//! use spot_rotator::config::ExchangeConfig;
//! use spot_rotator::gateway::{CoinbaseClient, ExchangeGateway};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = CoinbaseClient::from_config(&ExchangeConfig::default(), 300)?;
//!     let markets = client.load_markets().await?;
//!     println!("{} markets listed", markets.len());
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::auth::Credentials;
use super::types::{
    candles_from_rows, Account, CandleRow, MarketOrderRequest, OrderResponse, Product,
    DEFAULT_BASE_INCREMENT,
};
use crate::common::{CircuitBreaker, CircuitBreakerConfig, RateLimiter};
use crate::config::ExchangeConfig;
use crate::gateway::{ExchangeGateway, GatewayError, GatewayResult};
use crate::types::{Balances, CandleSeries, Market, OrderResult, Pair, Side, Timeframe};

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub max_retries: u32,
    pub timeout: Duration,
    pub requests_per_second: u32,
    pub circuit_breaker: CircuitBreakerConfig,
    /// Maximum candles returned per series
    pub candle_limit: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_exchange(&ExchangeConfig::default(), 300)
    }
}

impl ClientConfig {
    pub fn from_exchange(exchange: &ExchangeConfig, candle_limit: usize) -> Self {
        Self {
            base_url: exchange.base_url.trim_end_matches('/').to_string(),
            max_retries: exchange.max_retries,
            timeout: Duration::from_secs(exchange.timeout_secs),
            requests_per_second: exchange.rate_limit,
            circuit_breaker: CircuitBreakerConfig::default()
                .with_failure_threshold(exchange.circuit_breaker_threshold),
            candle_limit,
        }
    }
}

/// Coinbase Exchange API client
#[derive(Clone)]
pub struct CoinbaseClient {
    credentials: Option<Credentials>,
    http_client: Client,
    base_url: String,
    circuit_breaker: Arc<Mutex<CircuitBreaker>>,
    rate_limiter: Arc<RateLimiter>,
    /// `base_increment` per product id, filled whenever products are listed
    increments: Arc<Mutex<HashMap<String, f64>>>,
    max_retries: u32,
    candle_limit: usize,
}

impl CoinbaseClient {
    pub fn new(credentials: Option<Credentials>, config: ClientConfig) -> GatewayResult<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("spot-rotator/", env!("CARGO_PKG_VERSION")))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            credentials,
            http_client,
            base_url: config.base_url,
            circuit_breaker: Arc::new(Mutex::new(CircuitBreaker::new(config.circuit_breaker))),
            rate_limiter: Arc::new(RateLimiter::new(config.requests_per_second)),
            increments: Arc::new(Mutex::new(HashMap::new())),
            max_retries: config.max_retries,
            candle_limit: config.candle_limit,
        })
    }

    /// Build from the exchange section of the configuration
    pub fn from_config(exchange: &ExchangeConfig, candle_limit: usize) -> GatewayResult<Self> {
        Self::new(
            Credentials::from_config(exchange),
            ClientConfig::from_exchange(exchange, candle_limit),
        )
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Execute a request with retry logic, rate limiting, and circuit breaker
    async fn execute_with_retry<F, Fut, T>(&self, operation: F) -> GatewayResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        if !self.circuit_breaker.lock().await.can_attempt() {
            return Err(GatewayError::CircuitOpen);
        }

        let mut attempt = 0;
        loop {
            self.rate_limiter.acquire().await;

            match operation().await {
                Ok(result) => {
                    self.circuit_breaker.lock().await.record_success();
                    return Ok(result);
                }
                Err(e) if is_retryable(&e) && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = Duration::from_secs(2u64.pow(attempt - 1));
                    warn!(
                        "Request failed (attempt {}/{}): {}, retrying in {}s",
                        attempt,
                        self.max_retries + 1,
                        e,
                        delay.as_secs()
                    );
                    sleep(delay).await;
                }
                Err(e) => {
                    if is_retryable(&e) {
                        self.circuit_breaker.lock().await.record_failure();
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Send one request; `auth` adds the signed CB-ACCESS-* headers
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        request_path: &str,
        body: Option<String>,
        auth: bool,
    ) -> GatewayResult<T> {
        let url = format!("{}{}", self.base_url, request_path);
        let mut request = self
            .http_client
            .request(method.clone(), &url)
            .header("Accept", "application/json");

        if auth {
            let creds = self
                .credentials
                .as_ref()
                .ok_or_else(|| GatewayError::Auth("API credentials are not configured".into()))?;
            let timestamp = chrono::Utc::now().timestamp().to_string();
            let signature = creds.sign(
                &timestamp,
                method.as_str(),
                request_path,
                body.as_deref().unwrap_or(""),
            )?;
            request = request
                .header("CB-ACCESS-KEY", creds.api_key())
                .header("CB-ACCESS-SIGN", signature)
                .header("CB-ACCESS-TIMESTAMP", timestamp)
                .header("CB-ACCESS-PASSPHRASE", creds.passphrase());
        }

        if let Some(body) = body {
            request = request.header("Content-Type", "application/json").body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        debug!("{} {} -> {}", method, request_path, status);
        Ok(serde_json::from_str(&text)?)
    }

    // ==================== PUBLIC ENDPOINTS ====================

    pub async fn get_products(&self) -> GatewayResult<Vec<Product>> {
        let products: Vec<Product> = self
            .execute_with_retry(|| self.send(Method::GET, "/products", None, false))
            .await?;
        self.remember_increments(&products).await;
        Ok(products)
    }

    pub async fn get_candles(
        &self,
        pair: &Pair,
        timeframe: Timeframe,
    ) -> GatewayResult<Vec<CandleRow>> {
        let path = format!(
            "/products/{}/candles?granularity={}",
            pair.as_str(),
            timeframe.seconds()
        );
        self.execute_with_retry(|| self.send(Method::GET, &path, None, false))
            .await
    }

    // ==================== AUTHENTICATED ENDPOINTS ====================

    pub async fn get_accounts(&self) -> GatewayResult<Vec<Account>> {
        self.execute_with_retry(|| self.send(Method::GET, "/accounts", None, true))
            .await
    }

    pub async fn get_order(&self, order_id: &str) -> GatewayResult<OrderResponse> {
        let path = format!("/orders/{}", order_id);
        self.execute_with_retry(|| self.send(Method::GET, &path, None, true))
            .await
    }

    async fn remember_increments(&self, products: &[Product]) {
        let mut increments = self.increments.lock().await;
        for product in products {
            increments.insert(product.id.clone(), product.base_increment);
        }
    }

    /// Order size step for `pair`, listing products once if it is not cached
    pub async fn base_increment(&self, pair: &Pair) -> f64 {
        if let Some(increment) = self.increments.lock().await.get(pair.as_str()) {
            return *increment;
        }
        if let Err(e) = self.get_products().await {
            warn!("Could not load size increment for {}: {}", pair, e);
        }
        self.increments
            .lock()
            .await
            .get(pair.as_str())
            .copied()
            .unwrap_or(DEFAULT_BASE_INCREMENT)
    }

    /// Place a market order. Not retried: a timed-out POST may still have
    /// executed.
    pub async fn place_market_order(
        &self,
        side: Side,
        pair: &Pair,
        amount: f64,
    ) -> GatewayResult<OrderResponse> {
        if !self.circuit_breaker.lock().await.can_attempt() {
            return Err(GatewayError::CircuitOpen);
        }
        let increment = self.base_increment(pair).await;
        let request = MarketOrderRequest::new(side, pair, amount, increment);
        debug!("{} {} {} (requested {})", request.side, request.size, pair, amount);

        self.rate_limiter.acquire().await;
        let body = serde_json::to_string(&request)?;
        let result = self.send(Method::POST, "/orders", Some(body), true).await;

        let mut cb = self.circuit_breaker.lock().await;
        match &result {
            Ok(_) => cb.record_success(),
            Err(e) if is_retryable(e) => cb.record_failure(),
            Err(_) => {}
        }
        result
    }

    /// Place a market order, then look it up once to learn its fill state
    async fn market_order(&self, side: Side, pair: &Pair, amount: f64) -> GatewayResult<OrderResult> {
        let placed = self.place_market_order(side, pair, amount).await?;

        let order = match self.get_order(&placed.id).await {
            Ok(order) => order,
            Err(e) => {
                warn!("Could not refresh order {}: {}", placed.id, e);
                placed
            }
        };

        Ok(order.into_result())
    }
}

fn is_retryable(err: &GatewayError) -> bool {
    match err {
        GatewayError::Transport(_) => true,
        GatewayError::Api { status, .. } => {
            *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
        }
        _ => false,
    }
}

#[async_trait]
impl ExchangeGateway for CoinbaseClient {
    async fn load_markets(&self) -> GatewayResult<Vec<Market>> {
        let products = self.get_products().await?;
        Ok(products.into_iter().map(Product::into_market).collect())
    }

    async fn fetch_balance(&self) -> GatewayResult<Balances> {
        let accounts = self.get_accounts().await?;
        Ok(Balances::from_entries(
            accounts.into_iter().map(|a| (a.currency, a.balance)),
        ))
    }

    async fn fetch_candles(
        &self,
        pair: &Pair,
        timeframe: Timeframe,
    ) -> GatewayResult<CandleSeries> {
        let rows = self.get_candles(pair, timeframe).await?;
        let candles = candles_from_rows(rows, self.candle_limit).map_err(GatewayError::Parse)?;
        CandleSeries::new(candles).map_err(|source| GatewayError::InvalidCandles {
            pair: pair.clone(),
            source,
        })
    }

    async fn create_market_buy_order(
        &self,
        pair: &Pair,
        amount: f64,
    ) -> GatewayResult<OrderResult> {
        self.market_order(Side::Buy, pair, amount).await
    }

    async fn create_market_sell_order(
        &self,
        pair: &Pair,
        amount: f64,
    ) -> GatewayResult<OrderResult> {
        self.market_order(Side::Sell, pair, amount).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::CircuitState;

    #[test]
    fn test_client_config_from_exchange() {
        let mut exchange = ExchangeConfig::default();
        exchange.base_url = "https://example.test/".into();
        exchange.max_retries = 5;
        exchange.timeout_secs = 10;
        exchange.circuit_breaker_threshold = 7;

        let config = ClientConfig::from_exchange(&exchange, 120);
        assert_eq!(config.base_url, "https://example.test");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.circuit_breaker.failure_threshold, 7);
        assert_eq!(config.candle_limit, 120);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable(&GatewayError::Transport("reset".into())));
        assert!(is_retryable(&GatewayError::Api { status: 503, body: String::new() }));
        assert!(is_retryable(&GatewayError::Api { status: 429, body: String::new() }));
        assert!(!is_retryable(&GatewayError::Api { status: 400, body: String::new() }));
        assert!(!is_retryable(&GatewayError::Auth("missing".into())));
    }

    #[tokio::test]
    async fn test_authenticated_call_without_credentials_fails_fast() {
        let client = CoinbaseClient::new(None, ClientConfig::default()).unwrap();
        assert!(!client.has_credentials());

        let err = client.fetch_balance().await.unwrap_err();
        assert!(matches!(err, GatewayError::Auth(_)));
        assert_eq!(client.circuit_breaker.lock().await.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_open_circuit_rejects_calls() {
        let client = CoinbaseClient::new(None, ClientConfig::default()).unwrap();
        {
            let mut cb = client.circuit_breaker.lock().await;
            for _ in 0..10 {
                cb.record_failure();
            }
        }

        let err = client.load_markets().await.unwrap_err();
        assert!(matches!(err, GatewayError::CircuitOpen));
    }

    #[tokio::test]
    async fn test_base_increment_comes_from_listed_products() {
        let client = CoinbaseClient::new(None, ClientConfig::default()).unwrap();
        let products: Vec<Product> = serde_json::from_str(
            r#"[{"id": "DOGE-USD", "base_currency": "DOGE", "quote_currency": "USD", "status": "online", "base_increment": "0.1"}]"#,
        )
        .unwrap();
        client.remember_increments(&products).await;

        let increment = client.base_increment(&Pair::new("DOGE-USD")).await;
        assert_eq!(increment, 0.1);

        let request = MarketOrderRequest::new(Side::Sell, &Pair::new("DOGE-USD"), 12.345, increment);
        assert_eq!(request.size, "12.3");
    }
}
