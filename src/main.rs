//! Spot rotator - main entry point
//!
//! Subcommands:
//! - start: launch the trading loop in the background (or `--foreground`)
//! - stop / status: flip or report the persisted run flag
//! - monitor / monitor-live / clear-log: inspect or reset the log file
//! - select: choose a pair interactively and run one decision pass

use anyhow::Result;
use clap::{Parser, Subcommand};
use spot_rotator::logging::{self, SharedLogFile};
use spot_rotator::Config;
use std::path::PathBuf;
use tracing::info;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "spot-rotator")]
#[command(about = "Single-exchange spot trading agent that rotates into the best-scoring pair", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "configs/coinbase.json")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the trading bot
    Start {
        /// Stay attached to the terminal instead of running in the background
        #[arg(long)]
        foreground: bool,

        /// Paper trading mode (orders are simulated)
        #[arg(long)]
        paper: bool,
    },

    /// Run the trading loop in this process (used by `start`)
    #[command(hide = true)]
    Run {
        #[arg(long)]
        paper: bool,
    },

    /// Stop the trading bot
    Stop,

    /// Check if the bot is active
    Status,

    /// Print the bot log
    Monitor,

    /// Follow the bot log in real time
    MonitorLive,

    /// Clear the bot log file
    ClearLog,

    /// Pick a pair interactively and trade it once
    Select {
        /// Paper trading mode (orders are simulated)
        #[arg(long)]
        paper: bool,
    },
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;
    let runtime = &config.runtime;

    match cli.command {
        Commands::Start {
            foreground: false,
            paper,
        } => {
            logging::setup_console_logging(cli.verbose);
            commands::start::start_detached(&cli.config, paper, cli.verbose)
        }

        Commands::Start {
            foreground: true,
            paper,
        } => {
            let log = SharedLogFile::open(&runtime.log_file)?;
            let _guard = logging::setup_logging(cli.verbose, &log, true);
            info!("Log file: {}", log.path().display());
            commands::start::run(config, paper, log)
        }

        Commands::Run { paper } => {
            let log = SharedLogFile::open(&runtime.log_file)?;
            let _guard = logging::setup_logging(cli.verbose, &log, false);
            info!("Trading bot started (pid {})", std::process::id());
            commands::start::run(config, paper, log)
        }

        Commands::Stop => {
            let log = SharedLogFile::open(&runtime.log_file)?;
            let _guard = logging::setup_logging(cli.verbose, &log, false);
            commands::control::stop(&runtime.state_file)
        }

        Commands::Status => {
            logging::setup_console_logging(cli.verbose);
            commands::control::status(&runtime.state_file)
        }

        Commands::Monitor => commands::monitor::monitor(&runtime.log_file),

        Commands::MonitorLive => commands::monitor::monitor_live(&runtime.log_file),

        Commands::ClearLog => commands::monitor::clear(&runtime.log_file),

        Commands::Select { paper } => {
            let log = SharedLogFile::open(&runtime.log_file)?;
            let _guard = logging::setup_logging(cli.verbose, &log, true);
            commands::select::run(config, paper)
        }
    }
}
