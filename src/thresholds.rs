//! Adaptive RSI thresholds
//!
//! The buy threshold tightens downwards and the sell threshold widens upwards
//! by a fixed step per consecutive failed trade, clamped to a floor and a
//! ceiling. The result is a pure function of the failure count: it snaps
//! back to the defaults as soon as the count returns to zero.

use serde::{Deserialize, Serialize};

use crate::config::TradingConfig;

/// RSI levels below which buying and above which selling is considered
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiThresholds {
    pub buy: f64,
    pub sell: f64,
}

impl Default for RsiThresholds {
    fn default() -> Self {
        Self {
            buy: 40.0,
            sell: 60.0,
        }
    }
}

impl std::fmt::Display for RsiThresholds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Buy = {}, Sell = {}", self.buy, self.sell)
    }
}

/// Computes thresholds from the consecutive-failure count
#[derive(Debug, Clone)]
pub struct ThresholdController {
    defaults: RsiThresholds,
    step: f64,
    buy_floor: f64,
    sell_ceiling: f64,
}

impl Default for ThresholdController {
    fn default() -> Self {
        Self {
            defaults: RsiThresholds::default(),
            step: 2.0,
            buy_floor: 20.0,
            sell_ceiling: 80.0,
        }
    }
}

impl ThresholdController {
    pub fn new(defaults: RsiThresholds, step: f64, buy_floor: f64, sell_ceiling: f64) -> Self {
        Self {
            defaults,
            step,
            buy_floor,
            sell_ceiling,
        }
    }

    pub fn from_config(config: &TradingConfig) -> Self {
        Self::new(
            RsiThresholds {
                buy: config.rsi_buy_threshold,
                sell: config.rsi_sell_threshold,
            },
            config.threshold_step,
            config.rsi_buy_floor,
            config.rsi_sell_ceiling,
        )
    }

    pub fn defaults(&self) -> RsiThresholds {
        self.defaults
    }

    pub fn thresholds_for(&self, failed_trades: u32) -> RsiThresholds {
        if failed_trades == 0 {
            return self.defaults;
        }

        let shift = self.step * failed_trades as f64;
        RsiThresholds {
            buy: (self.defaults.buy - shift).max(self.buy_floor),
            sell: (self.defaults.sell + shift).min(self.sell_ceiling),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_no_failures() {
        let controller = ThresholdController::default();
        assert_eq!(controller.thresholds_for(0), RsiThresholds { buy: 40.0, sell: 60.0 });
    }

    #[test]
    fn test_five_failures() {
        let controller = ThresholdController::default();
        assert_eq!(controller.thresholds_for(5), RsiThresholds { buy: 30.0, sell: 70.0 });
    }

    #[test]
    fn test_clamped_at_floor_and_ceiling() {
        let controller = ThresholdController::default();
        assert_eq!(controller.thresholds_for(10), RsiThresholds { buy: 20.0, sell: 80.0 });
        assert_eq!(controller.thresholds_for(500), RsiThresholds { buy: 20.0, sell: 80.0 });
    }

    #[test]
    fn test_monotonic_within_clamps() {
        let controller = ThresholdController::default();
        let mut previous = controller.thresholds_for(0);
        for failures in 1..=10 {
            let current = controller.thresholds_for(failures);
            assert!(current.buy < previous.buy);
            assert!(current.sell > previous.sell);
            assert!((20.0..=40.0).contains(&current.buy));
            assert!((60.0..=80.0).contains(&current.sell));
            previous = current;
        }
    }

    #[test]
    fn test_snaps_back_after_reset() {
        let controller = ThresholdController::default();
        let _ = controller.thresholds_for(7);
        assert_eq!(controller.thresholds_for(0), controller.defaults());
    }
}
