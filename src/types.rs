//! Core data types used across the trading agent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Validation errors for candle series
#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("candle timestamps must be strictly increasing: {previous} then {next}")]
    NotIncreasing {
        previous: DateTime<Utc>,
        next: DateTime<Utc>,
    },
}

/// OHLCV candlestick data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub datetime: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Candles for one (pair, timeframe), oldest first.
///
/// Construction enforces strictly increasing timestamps. A series may be
/// shorter than the indicator windows; the indicators then report `None`
/// for positions whose window is not yet full.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(candles: Vec<Candle>) -> Result<Self, SeriesError> {
        for pair in candles.windows(2) {
            if pair[1].datetime <= pair[0].datetime {
                return Err(SeriesError::NotIncreasing {
                    previous: pair[0].datetime,
                    next: pair[1].datetime,
                });
            }
        }
        Ok(Self { candles })
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.candles.last().map(|c| c.close)
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

/// Candle timeframes the agent consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::OneHour => "1h",
            Timeframe::OneDay => "1d",
        }
    }

    pub fn seconds(&self) -> u64 {
        match self {
            Timeframe::OneHour => 3_600,
            Timeframe::OneDay => 86_400,
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trading pair identifier as the exchange names it (e.g. "BTC-USD")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair(pub String);

impl Pair {
    pub fn new(s: impl Into<String>) -> Self {
        Pair(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Pair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A listed market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub pair: Pair,
    pub base: String,
    pub quote: String,
    pub active: bool,
}

/// Available quantity per currency. Only strictly positive entries are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Balances(HashMap<String, f64>);

impl Balances {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Balances(
            entries
                .into_iter()
                .filter(|(_, qty)| *qty > 0.0)
                .map(|(currency, qty)| (currency.into(), qty))
                .collect(),
        )
    }

    /// Available quantity, zero when the currency is absent
    pub fn get(&self, currency: &str) -> f64 {
        self.0.get(currency).copied().unwrap_or(0.0)
    }

    pub fn has_positive(&self, currency: &str) -> bool {
        self.get(currency) > 0.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Balances {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        let parts: Vec<String> = entries
            .iter()
            .map(|(currency, qty)| format!("{}={}", currency, qty))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Fill status reported by the exchange for a market order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillStatus {
    Filled,
    Unfilled,
}

/// Result of a market order as reported synchronously by the exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub order_id: String,
    pub status: FillStatus,
    /// Average executed price in quote currency
    pub price: f64,
    /// Executed quantity in base currency
    pub amount: f64,
}

impl OrderResult {
    pub fn is_filled(&self) -> bool {
        self.status == FillStatus::Filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candle_at(hour: u32, close: f64) -> Candle {
        Candle {
            datetime: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn test_series_accepts_increasing_timestamps() {
        let series = CandleSeries::new(vec![candle_at(0, 1.0), candle_at(1, 2.0)]).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.last_close(), Some(2.0));
        assert_eq!(series.closes(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_series_rejects_duplicate_timestamps() {
        let result = CandleSeries::new(vec![candle_at(3, 1.0), candle_at(3, 2.0)]);
        assert!(matches!(result, Err(SeriesError::NotIncreasing { .. })));
    }

    #[test]
    fn test_empty_series() {
        let series = CandleSeries::new(vec![]).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.last_close(), None);
    }

    #[test]
    fn test_balances_drop_non_positive_entries() {
        let balances = Balances::from_entries(vec![("BTC", 1.5), ("ETH", 0.0), ("USD", -2.0)]);
        assert_eq!(balances.len(), 1);
        assert_eq!(balances.get("BTC"), 1.5);
        assert_eq!(balances.get("ETH"), 0.0);
        assert!(!balances.has_positive("USD"));
    }

    #[test]
    fn test_balances_display_is_sorted() {
        let balances = Balances::from_entries(vec![("USD", 10.0), ("BTC", 1.0)]);
        assert_eq!(balances.to_string(), "{BTC=1, USD=10}");
    }

    #[test]
    fn test_timeframe_labels() {
        assert_eq!(Timeframe::OneHour.as_str(), "1h");
        assert_eq!(Timeframe::OneDay.seconds(), 86_400);
    }
}
