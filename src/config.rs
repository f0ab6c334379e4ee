//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files with environment
//! variable support for API credentials. Every field has a default, so a
//! partial file (or none at all) is a valid configuration.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub exchange: ExchangeConfig,
    pub trading: TradingConfig,
    pub runtime: RuntimeConfig,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when it exists, otherwise fall back to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            let mut config = Config::default();
            config.apply_env();
            Ok(config)
        }
    }

    /// Load API credentials from environment when set
    fn apply_env(&mut self) {
        if let Ok(api_key) = std::env::var("COINBASE_API_KEY") {
            self.exchange.api_key = Some(api_key);
        }
        if let Ok(api_secret) = std::env::var("COINBASE_API_SECRET") {
            self.exchange.api_secret = Some(api_secret);
        }
        if let Ok(passphrase) = std::env::var("COINBASE_API_PASSPHRASE") {
            self.exchange.api_passphrase = Some(passphrase);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.trading;
        if t.refresh_interval_secs == 0 {
            bail!("trading.refresh_interval_secs must be > 0");
        }
        if t.base_position_fraction <= 0.0 || t.base_position_fraction > 1.0 {
            bail!(
                "trading.base_position_fraction must be in (0, 1], got {}",
                t.base_position_fraction
            );
        }
        if t.max_position_factor < 1.0 {
            bail!("trading.max_position_factor must be >= 1");
        }
        if t.min_trade_amount < 0.0 {
            bail!("trading.min_trade_amount must be >= 0");
        }
        if t.rsi_buy_floor > t.rsi_buy_threshold || t.rsi_buy_threshold >= t.rsi_sell_threshold
            || t.rsi_sell_threshold > t.rsi_sell_ceiling
        {
            bail!(
                "RSI thresholds must satisfy floor <= buy < sell <= ceiling ({} <= {} < {} <= {})",
                t.rsi_buy_floor,
                t.rsi_buy_threshold,
                t.rsi_sell_threshold,
                t.rsi_sell_ceiling
            );
        }
        if t.threshold_step.is_nan() || t.threshold_step <= 0.0 {
            bail!("trading.threshold_step must be > 0, got {}", t.threshold_step);
        }
        if self.runtime.log_clear_interval_secs == 0 {
            bail!("runtime.log_clear_interval_secs must be > 0");
        }
        Ok(())
    }
}

/// Exchange configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_passphrase: Option<String>,
    pub base_url: String,
    /// Requests per second
    pub rate_limit: u32,
    pub max_retries: u32,
    pub timeout_secs: u64,
    pub circuit_breaker_threshold: u32,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        ExchangeConfig {
            api_key: None,
            api_secret: None,
            api_passphrase: None,
            base_url: "https://api.exchange.coinbase.com".to_string(),
            rate_limit: 10,
            max_retries: 3,
            timeout_secs: 30,
            circuit_breaker_threshold: 5,
        }
    }
}

/// What `min_trade_amount` is measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinTradeBasis {
    /// Available base balance valued at the last close (quote currency)
    Quote,
    /// Raw available base balance
    Base,
}

/// Trading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub refresh_interval_secs: u64,
    /// Fraction of the base balance committed per buy before scaling
    pub base_position_fraction: f64,
    /// Upper clamp of the gain-driven position size factor
    pub max_position_factor: f64,
    pub min_trade_amount: f64,
    pub min_trade_basis: MinTradeBasis,
    pub rsi_buy_threshold: f64,
    pub rsi_sell_threshold: f64,
    /// Threshold shift per consecutive failed trade
    pub threshold_step: f64,
    pub rsi_buy_floor: f64,
    pub rsi_sell_ceiling: f64,
    /// Maximum candles kept per series
    pub candle_limit: usize,
}

impl Default for TradingConfig {
    fn default() -> Self {
        TradingConfig {
            refresh_interval_secs: 60,
            base_position_fraction: 0.1,
            max_position_factor: 10.0,
            min_trade_amount: 3.0,
            min_trade_basis: MinTradeBasis::Quote,
            rsi_buy_threshold: 40.0,
            rsi_sell_threshold: 60.0,
            threshold_step: 2.0,
            rsi_buy_floor: 20.0,
            rsi_sell_ceiling: 80.0,
            candle_limit: 300,
        }
    }
}

impl TradingConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// Process-level files and housekeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Run flag file read at the top of every cycle
    pub state_file: PathBuf,
    pub log_file: PathBuf,
    pub log_clear_interval_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            state_file: PathBuf::from("bot_state.txt"),
            log_file: PathBuf::from("bot.log"),
            log_clear_interval_secs: 400,
        }
    }
}

impl RuntimeConfig {
    pub fn log_clear_interval(&self) -> Duration {
        Duration::from_secs(self.log_clear_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.trading.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.runtime.log_clear_interval(), Duration::from_secs(400));
        assert_eq!(config.trading.min_trade_basis, MinTradeBasis::Quote);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{ "trading": { "min_trade_basis": "base", "refresh_interval_secs": 5 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.trading.min_trade_basis, MinTradeBasis::Base);
        assert_eq!(config.trading.refresh_interval_secs, 5);
        assert_eq!(config.trading.rsi_buy_threshold, 40.0);
        assert_eq!(config.runtime.state_file, PathBuf::from("bot_state.txt"));
        assert_eq!(config.exchange.max_retries, 3);
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let mut config = Config::default();
        config.trading.rsi_buy_threshold = 70.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_interval() {
        let mut config = Config::default();
        config.trading.refresh_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_positive_step() {
        for step in [0.0, -2.0, f64::NAN] {
            let mut config = Config::default();
            config.trading.threshold_step = step;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("threshold_step"));
        }
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load_or_default("definitely/not/here.json").unwrap();
        assert_eq!(config.trading.base_position_fraction, 0.1);
    }
}
