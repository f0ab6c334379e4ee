//! Paper trading gateway
//!
//! Wraps a real gateway: markets and candles are forwarded untouched, while
//! balances and orders are simulated. The balance book is seeded from the
//! inner gateway on the first `fetch_balance` (or explicitly with
//! [`PaperGateway::with_balances`]) and market orders fill at the last
//! hourly close.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use super::{ExchangeGateway, GatewayError, GatewayResult};
use crate::types::{
    Balances, CandleSeries, FillStatus, Market, OrderResult, Pair, Side, Timeframe,
};

#[derive(Debug, Default)]
struct PaperBook {
    balances: Option<HashMap<String, f64>>,
    markets: Option<Vec<Market>>,
}

pub struct PaperGateway<G> {
    inner: G,
    book: Mutex<PaperBook>,
    next_order_id: AtomicU64,
}

impl<G: ExchangeGateway> PaperGateway<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            book: Mutex::new(PaperBook::default()),
            next_order_id: AtomicU64::new(1),
        }
    }

    /// Start from a fixed balance book instead of the inner gateway's
    pub fn with_balances(inner: G, balances: &Balances) -> Self {
        let gateway = Self::new(inner);
        gateway.lock_book().balances = Some(
            balances
                .iter()
                .map(|(currency, qty)| (currency.clone(), *qty))
                .collect(),
        );
        gateway
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    fn lock_book(&self) -> MutexGuard<'_, PaperBook> {
        self.book.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn market_for(&self, pair: &Pair) -> GatewayResult<Market> {
        let cached = self.lock_book().markets.clone();
        let markets = match cached {
            Some(markets) => markets,
            None => {
                let markets = self.inner.load_markets().await?;
                self.lock_book().markets = Some(markets.clone());
                markets
            }
        };

        markets
            .into_iter()
            .find(|m| &m.pair == pair)
            .ok_or_else(|| GatewayError::UnknownPair(pair.clone()))
    }

    async fn ensure_seeded(&self) -> GatewayResult<()> {
        if self.lock_book().balances.is_some() {
            return Ok(());
        }
        let seed = self.inner.fetch_balance().await?;
        let mut book = self.lock_book();
        if book.balances.is_none() {
            info!("Paper balance book seeded with {}", seed);
            book.balances = Some(
                seed.iter()
                    .map(|(currency, qty)| (currency.clone(), *qty))
                    .collect(),
            );
        }
        Ok(())
    }

    async fn simulate(&self, side: Side, pair: &Pair, amount: f64) -> GatewayResult<OrderResult> {
        self.ensure_seeded().await?;
        let market = self.market_for(pair).await?;
        let candles = self.inner.fetch_candles(pair, Timeframe::OneHour).await?;
        let price = candles
            .last_close()
            .ok_or_else(|| GatewayError::Parse(format!("no candles for {}", pair)))?;

        let order_id = format!(
            "paper-{}",
            self.next_order_id.fetch_add(1, Ordering::Relaxed)
        );
        let cost = amount * price;

        let mut book = self.lock_book();
        let balances = book.balances.get_or_insert_with(HashMap::new);
        let base = balances.get(&market.base).copied().unwrap_or(0.0);
        let quote = balances.get(&market.quote).copied().unwrap_or(0.0);

        let affordable = amount > 0.0
            && match side {
                Side::Buy => quote >= cost,
                Side::Sell => base >= amount,
            };

        if !affordable {
            warn!(
                "Paper {} of {} {} rejected: base={}, quote={}",
                side, amount, pair, base, quote
            );
            return Ok(OrderResult {
                order_id,
                status: FillStatus::Unfilled,
                price: 0.0,
                amount: 0.0,
            });
        }

        let (base_delta, quote_delta) = match side {
            Side::Buy => (amount, -cost),
            Side::Sell => (-amount, cost),
        };
        *balances.entry(market.base.clone()).or_insert(0.0) += base_delta;
        *balances.entry(market.quote.clone()).or_insert(0.0) += quote_delta;

        info!(
            "Paper {} filled: {} {} @ {:.8} ({})",
            side, amount, pair, price, order_id
        );

        Ok(OrderResult {
            order_id,
            status: FillStatus::Filled,
            price,
            amount,
        })
    }
}

#[async_trait]
impl<G: ExchangeGateway> ExchangeGateway for PaperGateway<G> {
    async fn load_markets(&self) -> GatewayResult<Vec<Market>> {
        let markets = self.inner.load_markets().await?;
        self.lock_book().markets = Some(markets.clone());
        Ok(markets)
    }

    async fn fetch_balance(&self) -> GatewayResult<Balances> {
        self.ensure_seeded().await?;
        let book = self.lock_book();
        let entries = book.balances.clone().unwrap_or_default();
        Ok(Balances::from_entries(entries))
    }

    async fn fetch_candles(
        &self,
        pair: &Pair,
        timeframe: Timeframe,
    ) -> GatewayResult<CandleSeries> {
        self.inner.fetch_candles(pair, timeframe).await
    }

    async fn create_market_buy_order(
        &self,
        pair: &Pair,
        amount: f64,
    ) -> GatewayResult<OrderResult> {
        self.simulate(Side::Buy, pair, amount).await
    }

    async fn create_market_sell_order(
        &self,
        pair: &Pair,
        amount: f64,
    ) -> GatewayResult<OrderResult> {
        self.simulate(Side::Sell, pair, amount).await
    }
}
