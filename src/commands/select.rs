//! `select`: pick a pair by hand and run one decision pass on it

use anyhow::{Context, Result};
use spot_rotator::gateway::{ExchangeGateway, PaperGateway};
use spot_rotator::selector::{PairCandidate, PairSelector};
use spot_rotator::{Config, TradingBot};
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::info;

use super::{build_runtime, connect, verify_exchange};

#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("Invalid input. Please enter a number.")]
    NotANumber,

    #[error("Invalid selection. Please select a number from 1 to {count}.")]
    OutOfRange { count: usize },
}

/// Parse a 1-based menu choice into an index into `count` entries
pub fn parse_selection(input: &str, count: usize) -> Result<usize, SelectionError> {
    let choice: usize = input
        .trim()
        .parse()
        .map_err(|_| SelectionError::NotANumber)?;
    if choice == 0 || choice > count {
        return Err(SelectionError::OutOfRange { count });
    }
    Ok(choice - 1)
}

pub fn run(config: Config, paper: bool) -> Result<()> {
    let runtime = build_runtime()?;
    runtime.block_on(async {
        let client = connect(&config)?;
        if paper {
            select_and_trade(PaperGateway::new(client), &config).await
        } else {
            select_and_trade(client, &config).await
        }
    })
}

async fn select_and_trade<G: ExchangeGateway>(gateway: G, config: &Config) -> Result<()> {
    verify_exchange(&gateway).await?;

    let (_, candidates) = PairSelector::default()
        .candidates(&gateway)
        .await
        .context("Failed to fetch crypto pairs")?;

    if candidates.is_empty() {
        println!("No active trading pairs with positive balance available.");
        return Ok(());
    }

    print_menu(&candidates);
    let line = prompt("Select the pair number you want to trade: ")?;

    let index = match parse_selection(&line, candidates.len()) {
        Ok(index) => index,
        Err(e) => {
            println!("{}", e);
            return Ok(());
        }
    };
    let pair = candidates[index].market.pair.clone();
    info!("Manually selected pair: {}", pair);

    let mut bot = TradingBot::new(gateway, &config.trading);
    bot.refresh_balances()
        .await
        .context("Failed to refresh balances")?;
    let outcome = bot.trade_pair(&pair).await;

    println!("{}: {}", pair, outcome);
    Ok(())
}

fn print_menu(candidates: &[PairCandidate]) {
    println!("Available pairs for trading with positive balance:");
    for (i, c) in candidates.iter().enumerate() {
        println!(
            "{}. {} : {} {}",
            i + 1,
            c.market.pair,
            c.balance,
            c.market.base
        );
    }
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_choice_is_zero_based() {
        assert_eq!(parse_selection("1\n", 3), Ok(0));
        assert_eq!(parse_selection(" 3 ", 3), Ok(2));
    }

    #[test]
    fn test_out_of_range_choice() {
        assert_eq!(parse_selection("0", 3), Err(SelectionError::OutOfRange { count: 3 }));
        assert_eq!(parse_selection("4", 3), Err(SelectionError::OutOfRange { count: 3 }));
    }

    #[test]
    fn test_non_numeric_choice() {
        assert_eq!(parse_selection("btc", 3), Err(SelectionError::NotANumber));
        assert_eq!(parse_selection("-1", 3), Err(SelectionError::NotANumber));
        assert_eq!(parse_selection("", 3), Err(SelectionError::NotANumber));
    }
}
