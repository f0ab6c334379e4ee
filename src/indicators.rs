//! Technical indicators
//!
//! Every function maps a close-price series to an output series aligned 1:1
//! with its input. Positions whose window is not yet full are `None`; nothing
//! here panics on short input. Moving averages and MACD are driven by the
//! `ta` crate, the rolling sample standard deviation by `statrs`.
//!
//! Available indicators:
//! - Moving Averages: SMA, EMA
//! - Momentum: RSI (simple-average variant), MACD + signal line
//! - Volatility: rolling standard deviation, Bollinger Bands

use statrs::statistics::Statistics;
use ta::indicators::{
    ExponentialMovingAverage, MovingAverageConvergenceDivergence, SimpleMovingAverage,
};
use ta::Next;

use crate::types::CandleSeries;

/// Trend moving average window
pub const MA_PERIOD: usize = 30;
/// RSI window
pub const RSI_PERIOD: usize = 14;
/// Bollinger Bands window
pub const BB_PERIOD: usize = 20;
/// Bollinger Bands width in standard deviations
pub const BB_STD: f64 = 2.0;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

/// Type alias for band indicators (upper, middle, lower)
pub type BandOutput = (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>);

/// Type alias for two-line indicators (line1, line2)
pub type DualLineOutput = (Vec<Option<f64>>, Vec<Option<f64>>);

// =============================================================================
// Moving Averages
// =============================================================================

/// Simple Moving Average of the trailing `period` values
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut indicator = match SimpleMovingAverage::new(period) {
        Ok(i) => i,
        Err(_) => return vec![None; values.len()],
    };

    values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let avg = indicator.next(value);
            (i + 1 >= period).then_some(avg)
        })
        .collect()
}

/// Exponential Moving Average with `alpha = 2 / (span + 1)`.
///
/// Seeded by the first value with no bias correction, so every position is
/// defined.
pub fn ema(values: &[f64], span: usize) -> Vec<Option<f64>> {
    let mut indicator = match ExponentialMovingAverage::new(span) {
        Ok(i) => i,
        Err(_) => return vec![None; values.len()],
    };

    values.iter().map(|&value| Some(indicator.next(value))).collect()
}

// =============================================================================
// Momentum
// =============================================================================

/// Relative Strength Index using simple averages of gains and losses.
///
/// The first position contributes a zero gain and zero loss. When the average
/// loss is zero the RSI saturates at 100 if there were gains and is undefined
/// if the window was completely flat.
pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() {
        return vec![];
    }

    let mut gains = Vec::with_capacity(values.len());
    let mut losses = Vec::with_capacity(values.len());
    gains.push(0.0);
    losses.push(0.0);

    for pair in values.windows(2) {
        let change = pair[1] - pair[0];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let avg_gains = sma(&gains, period);
    let avg_losses = sma(&losses, period);

    avg_gains
        .into_iter()
        .zip(avg_losses)
        .map(|(gain, loss)| match (gain, loss) {
            (Some(g), Some(l)) => rsi_from_averages(g, l),
            _ => None,
        })
        .collect()
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_loss > 0.0 {
        let rs = avg_gain / avg_loss;
        Some(100.0 - 100.0 / (1.0 + rs))
    } else if avg_gain > 0.0 {
        Some(100.0)
    } else {
        None
    }
}

/// MACD line (EMA fast - EMA slow) and its signal line (EMA of MACD)
pub fn macd(
    values: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> DualLineOutput {
    let mut indicator =
        match MovingAverageConvergenceDivergence::new(fast_period, slow_period, signal_period) {
            Ok(i) => i,
            Err(_) => return (vec![None; values.len()], vec![None; values.len()]),
        };

    values
        .iter()
        .map(|&value| {
            let out = indicator.next(value);
            (Some(out.macd), Some(out.signal))
        })
        .unzip()
}

// =============================================================================
// Volatility
// =============================================================================

/// Rolling sample standard deviation (n - 1 denominator)
pub fn rolling_std(values: &[f64], period: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if period < 2 || i + 1 < period {
                return None;
            }
            let std_dev = values[i + 1 - period..=i].iter().std_dev();
            std_dev.is_finite().then_some(std_dev)
        })
        .collect()
}

/// Bollinger Bands: middle = SMA, width = `num_std` sample standard deviations
pub fn bollinger_bands(values: &[f64], period: usize, num_std: f64) -> BandOutput {
    let middle = sma(values, period);
    let std_dev = rolling_std(values, period);

    let (upper, lower) = middle
        .iter()
        .zip(&std_dev)
        .map(|(mid, sd)| match (mid, sd) {
            (Some(m), Some(s)) => (Some(m + num_std * s), Some(m - num_std * s)),
            _ => (None, None),
        })
        .unzip();

    (upper, middle, lower)
}

// =============================================================================
// Snapshot
// =============================================================================

/// Last value of every indicator for one candle series.
///
/// Recomputed from scratch each cycle. `None` marks an indicator whose window
/// is not full; comparisons against `None` never hold.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndicatorSnapshot {
    pub close: Option<f64>,
    pub ma30: Option<f64>,
    pub rsi14: Option<f64>,
    pub ma20: Option<f64>,
    pub std20: Option<f64>,
    pub upper_band: Option<f64>,
    pub lower_band: Option<f64>,
    pub ema12: Option<f64>,
    pub ema26: Option<f64>,
    pub macd: Option<f64>,
    pub signal: Option<f64>,
}

fn last(series: Vec<Option<f64>>) -> Option<f64> {
    series.last().copied().flatten()
}

impl IndicatorSnapshot {
    pub fn from_closes(closes: &[f64]) -> Self {
        let (upper, middle, lower) = bollinger_bands(closes, BB_PERIOD, BB_STD);
        let (macd_line, signal_line) = macd(closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);

        Self {
            close: closes.last().copied(),
            ma30: last(sma(closes, MA_PERIOD)),
            rsi14: last(rsi(closes, RSI_PERIOD)),
            ma20: last(middle),
            std20: last(rolling_std(closes, BB_PERIOD)),
            upper_band: last(upper),
            lower_band: last(lower),
            ema12: last(ema(closes, MACD_FAST)),
            ema26: last(ema(closes, MACD_SLOW)),
            macd: last(macd_line),
            signal: last(signal_line),
        }
    }

    pub fn from_series(series: &CandleSeries) -> Self {
        Self::from_closes(&series.closes())
    }

    /// Close strictly above the 30-period average
    pub fn above_trend(&self) -> bool {
        matches!((self.close, self.ma30), (Some(c), Some(m)) if c > m)
    }

    /// Close strictly below the 30-period average
    pub fn below_trend(&self) -> bool {
        matches!((self.close, self.ma30), (Some(c), Some(m)) if c < m)
    }

    pub fn below_lower_band(&self) -> bool {
        matches!((self.close, self.lower_band), (Some(c), Some(l)) if c < l)
    }

    pub fn above_upper_band(&self) -> bool {
        matches!((self.close, self.upper_band), (Some(c), Some(u)) if c > u)
    }

    pub fn macd_above_signal(&self) -> bool {
        matches!((self.macd, self.signal), (Some(m), Some(s)) if m > s)
    }

    pub fn macd_below_signal(&self) -> bool {
        matches!((self.macd, self.signal), (Some(m), Some(s)) if m < s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sma() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&values, 3);

        assert_eq!(result.len(), 5);
        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        assert_relative_eq!(result[2].unwrap(), 2.0);
        assert_relative_eq!(result[3].unwrap(), 3.0);
        assert_relative_eq!(result[4].unwrap(), 4.0);
    }

    #[test]
    fn test_short_series_is_undefined_not_a_crash() {
        let values = vec![10.0, 11.0, 12.0];
        assert!(sma(&values, MA_PERIOD).iter().all(Option::is_none));
        assert!(rsi(&values, RSI_PERIOD).iter().all(Option::is_none));
        let (upper, middle, lower) = bollinger_bands(&values, BB_PERIOD, BB_STD);
        assert!(upper.iter().chain(&middle).chain(&lower).all(Option::is_none));
        assert!(sma(&[], 3).is_empty());
        assert!(rsi(&[], 14).is_empty());
    }

    #[test]
    fn test_zero_period_keeps_alignment() {
        let values = vec![1.0, 2.0];
        assert_eq!(sma(&values, 0), vec![None, None]);
        assert_eq!(ema(&values, 0), vec![None, None]);
    }

    #[test]
    fn test_ema_seeded_by_first_value() {
        let values = vec![10.0, 20.0, 30.0];
        let result = ema(&values, 3);
        // alpha = 0.5
        assert_relative_eq!(result[0].unwrap(), 10.0);
        assert_relative_eq!(result[1].unwrap(), 15.0);
        assert_relative_eq!(result[2].unwrap(), 22.5);
    }

    #[test]
    fn test_rsi_saturates_when_no_losses() {
        let values: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let result = rsi(&values, 14);
        assert_eq!(result[12], None);
        assert_relative_eq!(result[13].unwrap(), 100.0);
        assert_relative_eq!(result[19].unwrap(), 100.0);
    }

    #[test]
    fn test_rsi_flat_window_is_undefined() {
        let values = vec![50.0; 20];
        assert!(rsi(&values, 14).iter().all(Option::is_none));
    }

    #[test]
    fn test_rsi_known_value() {
        // One gain of 2 and one loss of 1 inside a 3-wide window (first slot is zero).
        let values = vec![10.0, 12.0, 11.0];
        let result = rsi(&values, 3);
        // avg_gain = 2/3, avg_loss = 1/3, rs = 2
        assert_relative_eq!(result[2].unwrap(), 100.0 - 100.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rsi_bounded() {
        let values: Vec<f64> = (0..60)
            .map(|i| 100.0 + ((i * 7919) % 13) as f64 - 6.0)
            .collect();
        for value in rsi(&values, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_bollinger_uses_sample_std() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        let (upper, middle, lower) = bollinger_bands(&values, 4, 2.0);
        let sample_std = (5.0_f64 / 3.0).sqrt();
        assert_relative_eq!(middle[3].unwrap(), 2.5, epsilon = 1e-9);
        assert_relative_eq!(upper[3].unwrap(), 2.5 + 2.0 * sample_std, epsilon = 1e-9);
        assert_relative_eq!(lower[3].unwrap(), 2.5 - 2.0 * sample_std, epsilon = 1e-9);
        assert_eq!(upper[2], None);
    }

    #[test]
    fn test_macd_matches_ema_difference() {
        let values: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let (macd_line, signal_line) = macd(&values, 12, 26, 9);
        let fast = ema(&values, 12);
        let slow = ema(&values, 26);
        let expected: Vec<f64> = fast
            .iter()
            .zip(&slow)
            .map(|(f, s)| f.unwrap() - s.unwrap())
            .collect();

        for (got, want) in macd_line.iter().zip(&expected) {
            assert_relative_eq!(got.unwrap(), *want, epsilon = 1e-9);
        }

        let expected_signal = ema(&expected, 9);
        assert_relative_eq!(
            signal_line.last().unwrap().unwrap(),
            expected_signal.last().unwrap().unwrap(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_snapshot_of_rising_series() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let snap = IndicatorSnapshot::from_closes(&closes);

        assert_eq!(snap.close, Some(139.0));
        assert_relative_eq!(snap.ma30.unwrap(), 124.5, epsilon = 1e-9);
        assert_relative_eq!(snap.rsi14.unwrap(), 100.0);
        assert!(snap.above_trend());
        assert!(!snap.below_trend());
        assert!(snap.macd_above_signal());
    }

    #[test]
    fn test_snapshot_of_short_series_has_no_trend() {
        let snap = IndicatorSnapshot::from_closes(&[1.0, 2.0, 3.0]);
        assert_eq!(snap.ma30, None);
        assert!(!snap.above_trend());
        assert!(!snap.below_trend());
        assert!(!snap.below_lower_band());
        assert!(!snap.above_upper_band());
        assert!(snap.macd.is_some());
    }
}
