//! Coinbase Exchange request and response models
//!
//! Coinbase encodes most decimal quantities as JSON strings; those fields go
//! through `deserialize_f64_or_string`.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Candle, FillStatus, Market, OrderResult, Pair, Side};

/// Entry of `GET /products`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub base_currency: String,
    pub quote_currency: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub trading_disabled: bool,
    /// Smallest order size step in base currency
    #[serde(
        default = "default_base_increment",
        deserialize_with = "deserialize_f64_or_string"
    )]
    pub base_increment: f64,
}

/// Size step assumed when a product does not report one
pub const DEFAULT_BASE_INCREMENT: f64 = 1e-8;

fn default_base_increment() -> f64 {
    DEFAULT_BASE_INCREMENT
}

impl Product {
    pub fn is_active(&self) -> bool {
        self.status == "online" && !self.trading_disabled
    }

    pub fn into_market(self) -> Market {
        let active = self.is_active();
        Market {
            pair: Pair::new(self.id),
            base: self.base_currency,
            quote: self.quote_currency,
            active,
        }
    }
}

/// Entry of `GET /accounts`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub currency: String,
    /// Total funds, including holds
    #[serde(deserialize_with = "deserialize_f64_or_string")]
    pub balance: f64,
    #[serde(default, deserialize_with = "deserialize_f64_or_string")]
    pub available: f64,
    #[serde(default, deserialize_with = "deserialize_f64_or_string")]
    pub hold: f64,
}

/// Row of `GET /products/{id}/candles`: `[time, low, high, open, close, volume]`
pub type CandleRow = [f64; 6];

/// Convert newest-first candle rows into ascending candles, keeping the most
/// recent `limit` entries
pub fn candles_from_rows(mut rows: Vec<CandleRow>, limit: usize) -> Result<Vec<Candle>, String> {
    rows.sort_by(|a, b| a[0].total_cmp(&b[0]));
    let skip = rows.len().saturating_sub(limit);

    rows.into_iter()
        .skip(skip)
        .map(|[time, low, high, open, close, volume]| {
            let datetime = Utc
                .timestamp_opt(time as i64, 0)
                .single()
                .ok_or_else(|| format!("invalid candle timestamp {}", time))?;
            Ok(Candle {
                datetime,
                open,
                high,
                low,
                close,
                volume,
            })
        })
        .collect()
}

/// Body of `POST /orders` for a market order sized in base currency
#[derive(Debug, Clone, Serialize)]
pub struct MarketOrderRequest {
    #[serde(rename = "type")]
    pub order_type: &'static str,
    pub side: String,
    pub product_id: String,
    pub size: String,
}

impl MarketOrderRequest {
    /// The size is floored to `base_increment` so it never exceeds `amount`
    pub fn new(side: Side, pair: &Pair, amount: f64, base_increment: f64) -> Self {
        Self {
            order_type: "market",
            side: side.to_string(),
            product_id: pair.as_str().to_string(),
            size: floor_to_increment(amount, base_increment),
        }
    }
}

/// Round `amount` down to a whole number of `increment` steps and format it
/// with the increment's precision
pub fn floor_to_increment(amount: f64, increment: f64) -> String {
    let increment = if increment > 0.0 {
        increment
    } else {
        DEFAULT_BASE_INCREMENT
    };
    let steps = amount.max(0.0) / increment;
    // 0.29 / 0.01 lands just under 29 in binary floating point
    let nearest = steps.round();
    let steps = if (steps - nearest).abs() < 1e-9 {
        nearest
    } else {
        steps.floor()
    };
    format!("{:.*}", increment_decimals(increment), steps * increment)
}

fn increment_decimals(increment: f64) -> usize {
    let mut decimals = 0;
    let mut scaled = increment;
    while decimals < 16 && (scaled.round() < 1.0 || (scaled - scaled.round()).abs() > 1e-6) {
        scaled *= 10.0;
        decimals += 1;
    }
    decimals
}

/// Order as returned by `POST /orders` and `GET /orders/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default, deserialize_with = "deserialize_f64_or_string")]
    pub filled_size: f64,
    #[serde(default, deserialize_with = "deserialize_f64_or_string")]
    pub executed_value: f64,
    #[serde(default)]
    pub settled: bool,
}

impl OrderResponse {
    pub fn fill_status(&self) -> FillStatus {
        let filled = self.done_reason.as_deref() == Some("filled")
            || (self.status == "done" && self.filled_size > 0.0);
        if filled {
            FillStatus::Filled
        } else {
            FillStatus::Unfilled
        }
    }

    pub fn average_price(&self) -> f64 {
        if self.filled_size > 0.0 {
            self.executed_value / self.filled_size
        } else {
            0.0
        }
    }

    pub fn into_result(self) -> OrderResult {
        OrderResult {
            status: self.fill_status(),
            price: self.average_price(),
            amount: self.filled_size,
            order_id: self.id,
        }
    }
}

// Custom deserializer for f64 that can handle string representation
fn deserialize_f64_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct F64OrString;

    impl<'de> Visitor<'de> for F64OrString {
        type Value = f64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a number or a string representing a number")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            v.parse().map_err(de::Error::custom)
        }
    }

    deserializer.deserialize_any(F64OrString)
}
