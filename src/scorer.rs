//! Pair scoring
//!
//! Ranks a pair by how strongly its hourly indicators point to a trade.
//! Three additive components, evaluated in order:
//!
//! 1. Trend + RSI: close above MA30 with RSI under the buy threshold adds
//!    `buy - rsi`; close below MA30 with RSI over the sell threshold adds
//!    `rsi - sell`.
//! 2. Bollinger: +1 below the lower band, -1 above the upper band.
//! 3. MACD: +1 when MACD is above its signal line, -1 when below.
//!
//! Undefined indicator values (series shorter than a window) never match a
//! rule, so they contribute nothing.

use thiserror::Error;
use tracing::{debug, warn};

use crate::gateway::{ExchangeGateway, GatewayError};
use crate::indicators::IndicatorSnapshot;
use crate::thresholds::RsiThresholds;
use crate::types::{CandleSeries, Pair, Timeframe};

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("failed to fetch candles: {0}")]
    Gateway(#[from] GatewayError),

    #[error("candle series is empty")]
    EmptySeries,
}

/// Per-component breakdown of a pair score
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreCard {
    pub trend_rsi: f64,
    pub bollinger: f64,
    pub macd: f64,
    pub total: f64,
}

impl ScoreCard {
    pub fn from_snapshot(snap: &IndicatorSnapshot, thresholds: RsiThresholds) -> Self {
        let trend_rsi = match snap.rsi14 {
            Some(rsi) if snap.above_trend() && rsi < thresholds.buy => thresholds.buy - rsi,
            Some(rsi) if snap.below_trend() && rsi > thresholds.sell => rsi - thresholds.sell,
            _ => 0.0,
        };

        let bollinger = if snap.below_lower_band() {
            1.0
        } else if snap.above_upper_band() {
            -1.0
        } else {
            0.0
        };

        let macd = if snap.macd_above_signal() {
            1.0
        } else if snap.macd_below_signal() {
            -1.0
        } else {
            0.0
        };

        Self {
            trend_rsi,
            bollinger,
            macd,
            total: trend_rsi + bollinger + macd,
        }
    }
}

/// Scores pairs from their hourly candles
#[derive(Debug, Clone, Copy, Default)]
pub struct PairScorer;

impl PairScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score an already fetched hourly series
    pub fn score(
        &self,
        series: &CandleSeries,
        thresholds: RsiThresholds,
    ) -> Result<ScoreCard, ScoreError> {
        if series.is_empty() {
            return Err(ScoreError::EmptySeries);
        }
        let snapshot = IndicatorSnapshot::from_series(series);
        Ok(ScoreCard::from_snapshot(&snapshot, thresholds))
    }

    /// Fetch the hourly series for `pair` and score it
    pub async fn score_pair<G: ExchangeGateway + ?Sized>(
        &self,
        gateway: &G,
        pair: &Pair,
        thresholds: RsiThresholds,
    ) -> Result<ScoreCard, ScoreError> {
        let series = gateway.fetch_candles(pair, Timeframe::OneHour).await?;
        self.score(&series, thresholds)
    }

    /// Total score, or negative infinity when the pair cannot be scored
    pub async fn score_or_exclude<G: ExchangeGateway + ?Sized>(
        &self,
        gateway: &G,
        pair: &Pair,
        thresholds: RsiThresholds,
    ) -> f64 {
        match self.score_pair(gateway, pair, thresholds).await {
            Ok(card) => {
                debug!(
                    "{} score {:.4} (trend/rsi {:.4}, bollinger {}, macd {})",
                    pair, card.total, card.trend_rsi, card.bollinger, card.macd
                );
                card.total
            }
            Err(e) => {
                warn!("Error calculating score for {}: {}", pair, e);
                f64::NEG_INFINITY
            }
        }
    }
}
