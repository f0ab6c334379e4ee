//! Trading bot state machine
//!
//! [`TradingBot`] owns the gateway and the long-lived [`BotState`]. One call
//! to [`TradingBot::run_cycle`] selects a pair, decides, places at most one
//! market order and feeds the outcome back into the failure counter and the
//! cumulative gain.

use tracing::{error, info, warn};

use crate::config::TradingConfig;
use crate::decision::{Decision, DecisionEngine, SkipReason};
use crate::gateway::{ExchangeGateway, GatewayError};
use crate::indicators::IndicatorSnapshot;
use crate::selector::PairSelector;
use crate::thresholds::{RsiThresholds, ThresholdController};
use crate::types::{Balances, CandleSeries, OrderResult, Pair, Side, Timeframe};

/// Process-wide trading state, lost on restart
#[derive(Debug, Clone, PartialEq)]
pub struct BotState {
    pub selected_pair: Option<Pair>,
    pub failed_trades: u32,
    pub cumulative_gain: f64,
    pub thresholds: RsiThresholds,
    pub balances: Balances,
}

impl BotState {
    pub fn new(thresholds: RsiThresholds) -> Self {
        Self {
            selected_pair: None,
            failed_trades: 0,
            cumulative_gain: 0.0,
            thresholds,
            balances: Balances::default(),
        }
    }
}

/// How a trading cycle ended
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    NoPairSelected,
    Filled {
        side: Side,
        amount: f64,
        price: f64,
        gain: f64,
    },
    Unfilled {
        side: Side,
        amount: f64,
    },
    OrderFailed {
        side: Side,
        amount: f64,
        error: String,
    },
    Skipped(SkipReason),
    Error(String),
}

impl std::fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleOutcome::NoPairSelected => write!(f, "no pair selected"),
            CycleOutcome::Filled {
                side,
                amount,
                price,
                gain,
            } => write!(f, "{} {} filled @ {} (gain {:.2})", side, amount, price, gain),
            CycleOutcome::Unfilled { side, amount } => write!(f, "{} {} not filled", side, amount),
            CycleOutcome::OrderFailed {
                side,
                amount,
                error,
            } => write!(f, "{} {} failed: {}", side, amount, error),
            CycleOutcome::Skipped(reason) => write!(f, "skipped ({:?})", reason),
            CycleOutcome::Error(e) => write!(f, "error: {}", e),
        }
    }
}

pub struct TradingBot<G> {
    gateway: G,
    selector: PairSelector,
    controller: ThresholdController,
    engine: DecisionEngine,
    state: BotState,
}

impl<G: ExchangeGateway> TradingBot<G> {
    pub fn new(gateway: G, config: &TradingConfig) -> Self {
        let controller = ThresholdController::from_config(config);
        Self {
            gateway,
            selector: PairSelector::default(),
            engine: DecisionEngine::from_config(config),
            state: BotState::new(controller.defaults()),
            controller,
        }
    }

    pub fn state(&self) -> &BotState {
        &self.state
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Select the best pair for this cycle. Failures leave no pair selected.
    pub async fn select_best_pair(&mut self) -> Option<Pair> {
        match self.selector.select(&self.gateway, self.state.thresholds).await {
            Ok(selection) => {
                self.state.balances = selection.balances;
                self.state.selected_pair = selection.pair;
            }
            Err(e) => {
                error!("Error fetching crypto pairs: {}", e);
                self.state.selected_pair = None;
            }
        }
        self.state.selected_pair.clone()
    }

    /// Run the decision cascade on the selected pair
    pub async fn trade(&mut self) -> CycleOutcome {
        match self.state.selected_pair.clone() {
            Some(pair) => self.trade_pair(&pair).await,
            None => {
                info!("No pair selected for trading.");
                CycleOutcome::NoPairSelected
            }
        }
    }

    /// Run the decision cascade on `pair`, using the last fetched balances
    pub async fn trade_pair(&mut self, pair: &Pair) -> CycleOutcome {
        let (daily, hourly) = match self.fetch_series(pair).await {
            Ok((_, hourly)) if hourly.is_empty() => {
                error!("Error in trading function for {}: no hourly candles", pair);
                return CycleOutcome::Error(format!("no hourly candles for {}", pair));
            }
            Ok(series) => series,
            Err(e) => {
                error!("Error in trading function for {}: {}", pair, e);
                return CycleOutcome::Error(e.to_string());
            }
        };

        let daily = IndicatorSnapshot::from_series(&daily);
        let hourly = IndicatorSnapshot::from_series(&hourly);
        info!(
            "Last price for {} (1d): {:?}, MA30 (1d): {:?}",
            pair, daily.close, daily.ma30
        );
        info!(
            "Last price for {} (1h): {:?}, MA30 (1h): {:?}, RSI (1h): {:?}",
            pair, hourly.close, hourly.ma30, hourly.rsi14
        );

        self.state.thresholds = self.controller.thresholds_for(self.state.failed_trades);
        info!("RSI thresholds: {}", self.state.thresholds);

        let base = base_currency(pair);
        let balance = self.state.balances.get(base);

        let decision = self.engine.decide(
            &hourly,
            self.state.thresholds,
            balance,
            self.state.cumulative_gain,
        );

        match decision {
            Decision::Buy { amount, rule } => {
                info!("{} rule signals buy on {}", rule, pair);
                self.place_order(pair, Side::Buy, amount).await
            }
            Decision::Sell { amount, rule } => {
                info!("{} rule signals sell on {}", rule, pair);
                self.place_order(pair, Side::Sell, amount).await
            }
            Decision::Skip(reason) => {
                info!(
                    "Skipping trade for {} as conditions not met ({:?}, balance {})",
                    pair, reason, balance
                );
                self.state.failed_trades += 1;
                CycleOutcome::Skipped(reason)
            }
        }
    }

    /// Select, then trade
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.select_best_pair().await;
        self.trade().await
    }

    async fn fetch_series(
        &self,
        pair: &Pair,
    ) -> Result<(CandleSeries, CandleSeries), GatewayError> {
        let daily = self.gateway.fetch_candles(pair, Timeframe::OneDay).await?;
        let hourly = self.gateway.fetch_candles(pair, Timeframe::OneHour).await?;
        Ok((daily, hourly))
    }

    /// Refresh balances; the stale book is kept on failure
    pub async fn refresh_balances(&mut self) -> Result<(), GatewayError> {
        self.state.balances = self.gateway.fetch_balance().await?;
        Ok(())
    }

    async fn place_order(&mut self, pair: &Pair, side: Side, amount: f64) -> CycleOutcome {
        let result = match side {
            Side::Buy => self.gateway.create_market_buy_order(pair, amount).await,
            Side::Sell => self.gateway.create_market_sell_order(pair, amount).await,
        };

        let order = match result {
            Ok(order) => order,
            Err(e) => {
                error!("Failed to place order: {}", e);
                self.state.failed_trades += 1;
                return CycleOutcome::OrderFailed {
                    side,
                    amount,
                    error: e.to_string(),
                };
            }
        };

        info!(
            "Placed {} order for {} {} in {}.",
            side,
            amount,
            base_currency(pair),
            pair
        );

        if let Err(e) = self.refresh_balances().await {
            warn!("Failed to refresh balances after order: {}", e);
        }

        self.apply_outcome(side, amount, &order)
    }

    fn apply_outcome(&mut self, side: Side, requested: f64, order: &OrderResult) -> CycleOutcome {
        if !order.is_filled() {
            info!("Order not filled: {:?}", order);
            self.state.failed_trades += 1;
            return CycleOutcome::Unfilled {
                side,
                amount: requested,
            };
        }

        let amount = if order.amount > 0.0 {
            order.amount
        } else {
            requested
        };
        let notional = amount * order.price;
        let gain = match side {
            Side::Sell => notional,
            Side::Buy => -notional,
        };

        self.state.cumulative_gain += gain;
        self.state.failed_trades = 0;
        info!("Order successfully filled: {:?}", order);
        info!(
            "Trade gain: {} (cumulative {})",
            gain, self.state.cumulative_gain
        );

        CycleOutcome::Filled {
            side,
            amount,
            price: order.price,
            gain,
        }
    }
}

/// Base currency of an exchange pair id such as `BTC-USD` or `BTC/USD`
pub fn base_currency(pair: &Pair) -> &str {
    pair.as_str()
        .split(|c| c == '-' || c == '/')
        .next()
        .unwrap_or_else(|| pair.as_str())
}
