//! Spot Rotator
//!
//! A single-exchange spot trading agent. Each cycle it scores every pair
//! whose base currency the account holds, picks the most attractive one and
//! runs a trend/RSI, Bollinger and MACD decision cascade on it, adapting its
//! RSI thresholds to the run of failed trades.

pub mod bot;
pub mod common;
pub mod config;
pub mod decision;
pub mod gateway;
pub mod indicators;
pub mod logging;
pub mod run_flag;
pub mod runner;
pub mod scorer;
pub mod selector;
pub mod thresholds;
pub mod types;

pub use bot::{BotState, CycleOutcome, TradingBot};
pub use config::Config;
pub use gateway::{ExchangeGateway, GatewayError};
pub use types::*;
