//! `monitor`, `monitor-live` and `clear-log`

use anyhow::Result;
use spot_rotator::logging::{clear_log, follow_log, read_log};
use std::path::Path;
use std::time::Duration;

pub fn monitor(log_file: &Path) -> Result<()> {
    if !log_file.exists() {
        println!("Log file not found.");
        return Ok(());
    }
    print!("{}", read_log(log_file)?);
    Ok(())
}

/// Stream new log lines until interrupted
pub fn monitor_live(log_file: &Path) -> Result<()> {
    if !log_file.exists() {
        println!("Log file not found.");
        return Ok(());
    }
    let mut stdout = std::io::stdout();
    follow_log(log_file, &mut stdout, Duration::from_millis(500), || true)
}

pub fn clear(log_file: &Path) -> Result<()> {
    clear_log(log_file)?;
    println!("Bot logs cleared.");
    Ok(())
}
