//! Command implementations for the spot-rotator binary

pub mod control;
pub mod monitor;
pub mod select;
pub mod start;

use anyhow::{Context, Result};
use spot_rotator::gateway::{CoinbaseClient, ExchangeGateway};
use spot_rotator::Config;
use tracing::info;

pub(crate) fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")
}

pub(crate) fn connect(config: &Config) -> Result<CoinbaseClient> {
    let client = CoinbaseClient::from_config(&config.exchange, config.trading.candle_limit)
        .context("Failed to create Coinbase client")?;
    if !client.has_credentials() {
        anyhow::bail!(
            "Coinbase credentials missing: set COINBASE_API_KEY, COINBASE_API_SECRET and COINBASE_API_PASSPHRASE"
        );
    }
    Ok(client)
}

/// Fail fast when the exchange cannot be reached
pub(crate) async fn verify_exchange<G: ExchangeGateway>(gateway: &G) -> Result<()> {
    let markets = gateway
        .load_markets()
        .await
        .context("Failed to initialize exchange")?;
    let active = markets.iter().filter(|m| m.active).count();
    info!("Exchange initialized: {} markets ({} active)", markets.len(), active);
    Ok(())
}
