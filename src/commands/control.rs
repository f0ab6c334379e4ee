//! `stop` and `status`

use anyhow::Result;
use spot_rotator::run_flag::{FileRunFlag, RunFlag};
use std::path::Path;
use tracing::info;

pub fn stop(state_file: &Path) -> Result<()> {
    FileRunFlag::new(state_file).write(false)?;
    info!("Bot stopping...");
    println!("Bot stopped. The loop exits at the start of its next cycle.");
    Ok(())
}

pub fn status(state_file: &Path) -> Result<()> {
    if FileRunFlag::new(state_file).read()? {
        println!("Bot is active.");
    } else {
        println!("Bot is not active.");
    }
    Ok(())
}
