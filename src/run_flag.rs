//! Persisted on/off switch for the trading loop
//!
//! `start` writes `True`, `stop` writes `False`, and the loop reads the flag
//! at the top of every cycle. The file is the only state shared between
//! invocations of the binary. Writes go through a sibling temp file and a
//! rename, so a reader sees either the old value or the new one.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub trait RunFlag: Send + Sync {
    /// Current value, `false` when never written
    fn read(&self) -> Result<bool>;

    fn write(&self, running: bool) -> Result<()>;
}

/// Flag stored as `True` / `False` in a text file
#[derive(Debug, Clone)]
pub struct FileRunFlag {
    path: PathBuf,
}

impl FileRunFlag {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl RunFlag for FileRunFlag {
    fn read(&self) -> Result<bool> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(contents.trim() == "True"),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read run flag {}", self.path.display())),
        }
    }

    fn write(&self, running: bool) -> Result<()> {
        let value = if running { "True" } else { "False" };
        let tmp = self.temp_path();
        fs::write(&tmp, value)
            .with_context(|| format!("Failed to write run flag {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace run flag {}", self.path.display()))
    }
}

/// In-memory flag; clones share the same value
#[derive(Debug, Clone, Default)]
pub struct MemoryRunFlag {
    running: Arc<AtomicBool>,
}

impl MemoryRunFlag {
    pub fn new(running: bool) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(running)),
        }
    }
}

impl RunFlag for MemoryRunFlag {
    fn read(&self) -> Result<bool> {
        Ok(self.running.load(Ordering::SeqCst))
    }

    fn write(&self, running: bool) -> Result<()> {
        self.running.store(running, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("{}-{}-{}", name, std::process::id(), nanos))
    }

    #[test]
    fn test_absent_file_reads_false() {
        let flag = FileRunFlag::new(temp_path("run-flag-absent"));
        assert!(!flag.read().unwrap());
    }

    #[test]
    fn test_file_flag_round_trip() {
        let path = temp_path("run-flag");
        let flag = FileRunFlag::new(&path);

        flag.write(true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "True");
        assert!(flag.read().unwrap());

        flag.write(false).unwrap();
        assert!(!flag.read().unwrap());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_replaces_file_without_leftovers() {
        let path = temp_path("run-flag-replace");
        let flag = FileRunFlag::new(&path);
        fs::write(&path, "True").unwrap();

        flag.write(false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "False");
        assert!(!flag.temp_path().exists());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_unreadable_flag_is_an_error() {
        let dir = temp_path("run-flag-dir");
        fs::create_dir(&dir).unwrap();
        assert!(FileRunFlag::new(&dir).read().is_err());
        fs::remove_dir(&dir).unwrap();
    }

    #[test]
    fn test_unexpected_contents_read_false() {
        let path = temp_path("run-flag-garbage");
        fs::write(&path, "yes please").unwrap();
        assert!(!FileRunFlag::new(&path).read().unwrap());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_memory_flag_clones_share_state() {
        let flag = MemoryRunFlag::new(true);
        let other = flag.clone();
        other.write(false).unwrap();
        assert!(!flag.read().unwrap());
    }
}
