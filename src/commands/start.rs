//! `start` and `run`: launch the trading loop

use anyhow::{Context, Result};
use spot_rotator::gateway::{ExchangeGateway, PaperGateway};
use spot_rotator::logging::{spawn_log_truncation, SharedLogFile};
use spot_rotator::run_flag::{FileRunFlag, RunFlag};
use spot_rotator::runner::{self, StopReason};
use spot_rotator::{Config, TradingBot};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{error, info, warn};

use super::{build_runtime, connect, verify_exchange};

/// Re-execute this binary with the hidden `run` subcommand, detached from
/// the terminal
pub fn start_detached(config_path: &Path, paper: bool, verbose: bool) -> Result<()> {
    let exe = std::env::current_exe().context("Failed to locate current executable")?;

    let mut cmd = Command::new(exe);
    cmd.arg("--config").arg(config_path).arg("run");
    if paper {
        cmd.arg("--paper");
    }
    if verbose {
        cmd.arg("--verbose");
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let child = cmd.spawn().context("Failed to launch trading bot")?;
    println!("Trading bot started in the background (pid {}).", child.id());
    Ok(())
}

/// Run the trading loop in this process until stopped
pub fn run(config: Config, paper: bool, log: SharedLogFile) -> Result<()> {
    let runtime = build_runtime()?;
    runtime.block_on(run_async(config, paper, log))
}

async fn run_async(config: Config, paper: bool, log: SharedLogFile) -> Result<()> {
    let flag = FileRunFlag::new(&config.runtime.state_file);
    flag.write(true)?;

    let truncation = spawn_log_truncation(log, config.runtime.log_clear_interval());

    let result = match connect(&config) {
        Ok(client) if paper => {
            info!("Paper trading mode: orders are simulated");
            drive(PaperGateway::new(client), &config, &flag).await
        }
        Ok(client) => {
            warn!("LIVE TRADING MODE - REAL MONEY AT RISK!");
            drive(client, &config, &flag).await
        }
        Err(e) => Err(e),
    };

    truncation.abort();

    if let Err(e) = &result {
        error!("Trading bot exiting: {:#}", e);
        flag.write(false)?;
    }
    result
}

async fn drive<G: ExchangeGateway>(gateway: G, config: &Config, flag: &FileRunFlag) -> Result<()> {
    verify_exchange(&gateway).await?;

    let t = &config.trading;
    info!(
        "Refresh interval {}s, base position {}, min trade {} ({:?})",
        t.refresh_interval_secs, t.base_position_fraction, t.min_trade_amount, t.min_trade_basis
    );

    let mut bot = TradingBot::new(gateway, t);
    let summary = runner::run_loop(&mut bot, flag, t.refresh_interval(), runner::ctrl_c()).await;

    if summary.reason == StopReason::Shutdown {
        flag.write(false)?;
    }

    let state = bot.state();
    info!(
        "Trading loop ended after {} cycles: failed trades {}, cumulative gain {:.2}",
        summary.cycles, state.failed_trades, state.cumulative_gain
    );
    Ok(())
}
