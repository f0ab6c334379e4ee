//! Trading loop
//!
//! Repeats select -> decide -> sleep while the run flag is set. The flag is
//! polled only at the top of a cycle; a shutdown signal (Ctrl+C) interrupts
//! the sleep between cycles but never a cycle in progress. A flag that cannot
//! be read keeps its last known value.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::bot::{CycleOutcome, TradingBot};
use crate::gateway::ExchangeGateway;
use crate::run_flag::RunFlag;

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    FlagCleared,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub reason: StopReason,
}

/// Run cycles until the flag reads false or `shutdown` completes
pub async fn run_loop<G, F, S>(
    bot: &mut TradingBot<G>,
    flag: &F,
    interval: Duration,
    shutdown: S,
) -> RunSummary
where
    G: ExchangeGateway,
    F: RunFlag + ?Sized,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut cycles = 0u64;
    let mut running = true;

    info!("Starting trading loop...");

    loop {
        match flag.read() {
            Ok(value) => running = value,
            Err(e) => warn!("Could not read run flag, keeping {}: {:#}", running, e),
        }
        if !running {
            info!("Bot stopped manually.");
            return RunSummary {
                cycles,
                reason: StopReason::FlagCleared,
            };
        }

        let outcome = bot.run_cycle().await;
        cycles += 1;
        match &outcome {
            CycleOutcome::Error(_) | CycleOutcome::OrderFailed { .. } => {
                error!("Cycle {} ended: {}", cycles, outcome)
            }
            _ => info!("Cycle {} ended: {}", cycles, outcome),
        }
        let state = bot.state();
        info!(
            "Failed trades: {}, cumulative gain: {:.2}",
            state.failed_trades, state.cumulative_gain
        );

        tokio::select! {
            _ = sleep(interval) => {}
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                return RunSummary {
                    cycles,
                    reason: StopReason::Shutdown,
                };
            }
        }
    }
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed
pub async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating shutdown..."),
        Err(e) => {
            error!("Error setting up signal handler: {}", e);
            std::future::pending::<()>().await
        }
    }
}
