//! Trade decision cascade
//!
//! Rules are evaluated in a fixed order and the first match wins:
//!
//! 1. Trend + RSI: close above MA30 and RSI under the buy threshold buys;
//!    close below MA30 and RSI over the sell threshold sells.
//! 2. Bollinger: close under the lower band buys, over the upper band sells.
//! 3. MACD: MACD above signal buys, below signal sells.
//!
//! Buys are sized at `min(balance * adjusted_max_position, balance)` where
//! the adjusted maximum grows with the log of the cumulative gain. Sells
//! always liquidate the whole balance. Every rule also requires the balance
//! to meet the minimum trade amount; otherwise the cycle is skipped.

use crate::config::{MinTradeBasis, TradingConfig};
use crate::indicators::IndicatorSnapshot;
use crate::thresholds::RsiThresholds;

/// Which rule of the cascade fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    TrendRsi,
    Bollinger,
    Macd,
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rule::TrendRsi => write!(f, "trend/RSI"),
            Rule::Bollinger => write!(f, "Bollinger"),
            Rule::Macd => write!(f, "MACD"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    BelowMinimum,
    NoSignal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Buy { amount: f64, rule: Rule },
    Sell { amount: f64, rule: Rule },
    Skip(SkipReason),
}

enum Signal {
    Buy,
    Sell,
}

/// Sizing and minimum-trade parameters
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    base_position_fraction: f64,
    max_position_factor: f64,
    min_trade_amount: f64,
    min_trade_basis: MinTradeBasis,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::from_config(&TradingConfig::default())
    }
}

impl DecisionEngine {
    pub fn new(
        base_position_fraction: f64,
        max_position_factor: f64,
        min_trade_amount: f64,
        min_trade_basis: MinTradeBasis,
    ) -> Self {
        Self {
            base_position_fraction,
            max_position_factor,
            min_trade_amount,
            min_trade_basis,
        }
    }

    pub fn from_config(config: &TradingConfig) -> Self {
        Self::new(
            config.base_position_fraction,
            config.max_position_factor,
            config.min_trade_amount,
            config.min_trade_basis,
        )
    }

    /// `clamp(ln(max(gain, 1)), 1, max_position_factor)`
    pub fn position_size_factor(&self, cumulative_gain: f64) -> f64 {
        cumulative_gain
            .max(1.0)
            .ln()
            .clamp(1.0, self.max_position_factor)
    }

    pub fn adjusted_max_position(&self, cumulative_gain: f64) -> f64 {
        self.base_position_fraction * self.position_size_factor(cumulative_gain)
    }

    /// Whether `balance` (base currency) is large enough to trade at `price`
    pub fn meets_minimum(&self, balance: f64, price: Option<f64>) -> bool {
        match self.min_trade_basis {
            MinTradeBasis::Base => balance >= self.min_trade_amount,
            MinTradeBasis::Quote => {
                matches!(price, Some(p) if balance * p >= self.min_trade_amount)
            }
        }
    }

    pub fn decide(
        &self,
        snap: &IndicatorSnapshot,
        thresholds: RsiThresholds,
        balance: f64,
        cumulative_gain: f64,
    ) -> Decision {
        let Some((signal, rule)) = Self::signal(snap, thresholds) else {
            return Decision::Skip(SkipReason::NoSignal);
        };

        if !self.meets_minimum(balance, snap.close) {
            return Decision::Skip(SkipReason::BelowMinimum);
        }

        match signal {
            Signal::Buy => Decision::Buy {
                amount: (balance * self.adjusted_max_position(cumulative_gain)).min(balance),
                rule,
            },
            Signal::Sell => Decision::Sell {
                amount: balance,
                rule,
            },
        }
    }

    fn signal(snap: &IndicatorSnapshot, thresholds: RsiThresholds) -> Option<(Signal, Rule)> {
        let rsi = snap.rsi14;
        if snap.above_trend() && matches!(rsi, Some(r) if r < thresholds.buy) {
            return Some((Signal::Buy, Rule::TrendRsi));
        }
        if snap.below_trend() && matches!(rsi, Some(r) if r > thresholds.sell) {
            return Some((Signal::Sell, Rule::TrendRsi));
        }

        if snap.below_lower_band() {
            return Some((Signal::Buy, Rule::Bollinger));
        }
        if snap.above_upper_band() {
            return Some((Signal::Sell, Rule::Bollinger));
        }

        if snap.macd_above_signal() {
            return Some((Signal::Buy, Rule::Macd));
        }
        if snap.macd_below_signal() {
            return Some((Signal::Sell, Rule::Macd));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn engine() -> DecisionEngine {
        DecisionEngine::new(0.1, 10.0, 3.0, MinTradeBasis::Quote)
    }

    fn trend_snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            close: Some(105.0),
            ma30: Some(100.0),
            rsi14: Some(35.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_position_factor_bounds() {
        let e = engine();
        assert_relative_eq!(e.position_size_factor(-500.0), 1.0);
        assert_relative_eq!(e.position_size_factor(1.0), 1.0);
        assert_relative_eq!(e.position_size_factor(10.0_f64.exp()), 10.0, epsilon = 1e-9);
        assert_relative_eq!(e.position_size_factor(1e12), 10.0);
        assert_relative_eq!(e.position_size_factor(5.0_f64.exp()), 5.0, epsilon = 1e-9);
        assert_relative_eq!(e.adjusted_max_position(1.0), 0.1);
    }

    #[test]
    fn test_trend_rule_short_circuits() {
        let e = engine();
        let mut snap = trend_snapshot();
        // Bands and MACD both point to a sell
        snap.upper_band = Some(101.0);
        snap.lower_band = Some(99.0);
        snap.macd = Some(-2.0);
        snap.signal = Some(1.0);

        match e.decide(&snap, RsiThresholds::default(), 1.0, 0.0) {
            Decision::Buy { amount, rule } => {
                assert_eq!(rule, Rule::TrendRsi);
                assert_relative_eq!(amount, 0.1);
            }
            other => panic!("expected buy, got {:?}", other),
        }
    }

    #[test]
    fn test_trend_sell_liquidates_balance() {
        let snap = IndicatorSnapshot {
            close: Some(95.0),
            ma30: Some(100.0),
            rsi14: Some(70.0),
            ..Default::default()
        };
        let decision = engine().decide(&snap, RsiThresholds::default(), 2.5, 0.0);
        assert_eq!(
            decision,
            Decision::Sell {
                amount: 2.5,
                rule: Rule::TrendRsi
            }
        );
    }

    #[test]
    fn test_bollinger_then_macd() {
        let e = engine();
        let mut snap = IndicatorSnapshot {
            close: Some(120.0),
            ma30: Some(100.0),
            rsi14: Some(55.0),
            upper_band: Some(115.0),
            lower_band: Some(85.0),
            macd: Some(1.0),
            signal: Some(0.0),
            ..Default::default()
        };
        assert!(matches!(
            e.decide(&snap, RsiThresholds::default(), 1.0, 0.0),
            Decision::Sell { rule: Rule::Bollinger, .. }
        ));

        snap.upper_band = Some(130.0);
        assert!(matches!(
            e.decide(&snap, RsiThresholds::default(), 1.0, 0.0),
            Decision::Buy { rule: Rule::Macd, .. }
        ));
    }

    #[test]
    fn test_no_signal_skips() {
        let snap = IndicatorSnapshot {
            close: Some(100.0),
            ..Default::default()
        };
        assert_eq!(
            engine().decide(&snap, RsiThresholds::default(), 10.0, 0.0),
            Decision::Skip(SkipReason::NoSignal)
        );
    }

    #[test]
    fn test_minimum_guards_every_rule() {
        // 0.01 * 105 = 1.05 quote, under the minimum of 3
        assert_eq!(
            engine().decide(&trend_snapshot(), RsiThresholds::default(), 0.01, 0.0),
            Decision::Skip(SkipReason::BelowMinimum)
        );

        let base = DecisionEngine::new(0.1, 10.0, 3.0, MinTradeBasis::Base);
        assert_eq!(
            base.decide(&trend_snapshot(), RsiThresholds::default(), 1.0, 0.0),
            Decision::Skip(SkipReason::BelowMinimum)
        );
        assert!(matches!(
            base.decide(&trend_snapshot(), RsiThresholds::default(), 4.0, 0.0),
            Decision::Buy { .. }
        ));
    }

    #[test]
    fn test_buy_size_scales_with_gain() {
        let decision = engine().decide(&trend_snapshot(), RsiThresholds::default(), 2.0, 3.0_f64.exp());
        match decision {
            Decision::Buy { amount, .. } => assert_relative_eq!(amount, 0.6, epsilon = 1e-9),
            other => panic!("expected buy, got {:?}", other),
        }
    }

    #[test]
    fn test_buy_size_capped_at_balance() {
        let e = DecisionEngine::new(0.5, 10.0, 0.0, MinTradeBasis::Base);
        match e.decide(&trend_snapshot(), RsiThresholds::default(), 2.0, 1e9) {
            Decision::Buy { amount, .. } => assert_relative_eq!(amount, 2.0),
            other => panic!("expected buy, got {:?}", other),
        }
    }
}
