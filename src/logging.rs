//! Logging setup and log file maintenance
//!
//! The trading loop and the periodic truncation task share one
//! [`SharedLogFile`]. Every write and every truncation takes the same mutex,
//! so a truncation never interleaves with a half-written line.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Append-mode log file behind a mutex
#[derive(Debug, Clone)]
pub struct SharedLogFile {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl SharedLogFile {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, File> {
        self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Empty the file; later writes start at offset zero
    pub fn truncate(&self) -> io::Result<()> {
        self.lock().set_len(0)
    }
}

impl Write for SharedLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.lock().write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    // Filter out noisy HTTP crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str))
}

/// Console plus file logging. Keep the returned guard alive for the life of
/// the process or buffered lines are lost.
pub fn setup_logging(verbose: bool, log: &SharedLogFile, console: bool) -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(log.clone());

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    let console_layer = console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(true)
    });

    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

/// Console-only logging for the short-lived control commands
pub fn setup_console_logging(verbose: bool) {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(console_layer)
        .init();
}

/// Truncate `log` every `interval` until the runtime shuts down
pub fn spawn_log_truncation(log: SharedLogFile, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick fires immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match log.truncate() {
                Ok(()) => info!("Bot logs cleared."),
                Err(e) => warn!("Failed to clear log {}: {}", log.path().display(), e),
            }
        }
    })
}

pub fn read_log(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read log file {}", path.display()))
}

pub fn clear_log(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    File::create(path).with_context(|| format!("Failed to clear log file {}", path.display()))?;
    Ok(())
}

/// Stream lines appended to `path` into `out`, polling every `poll`.
/// Starts at the current end of the file and starts over if it shrinks.
/// Returns when `keep_going` yields false.
pub fn follow_log<W, F>(path: impl AsRef<Path>, out: &mut W, poll: Duration, mut keep_going: F) -> Result<()>
where
    W: Write,
    F: FnMut() -> bool,
{
    let path = path.as_ref();
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    let mut offset = file.seek(SeekFrom::End(0))?;
    let mut buf = String::new();

    while keep_going() {
        let len = file.metadata()?.len();
        if len < offset {
            offset = 0;
        }
        if len > offset {
            file.seek(SeekFrom::Start(offset))?;
            buf.clear();
            let read = file.read_to_string(&mut buf)?;
            offset += read as u64;
            out.write_all(buf.as_bytes())?;
            out.flush()?;
        }
        std::thread::sleep(poll);
    }

    Ok(())
}
