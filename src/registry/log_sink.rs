//! Log sinks identified by name.
//!
//! Both the manager's own log and the logs forwarded by remote workers are
//! written through [`LogSink`], so rotation and routing treat them alike.

use chrono::Local;
use parking_lot::Mutex;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Severity of a forwarded log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "critical" | "fatal" => Ok(LogLevel::Critical),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// A destination for log records from one named source
pub trait LogSink: Send + Sync {
    /// Append one record attributed to `name`
    fn write_record(&self, name: &str, level: LogLevel, message: &str) -> io::Result<()>;

    /// Start a fresh file, keeping the previous ones as numbered backups
    fn rotate(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Append-only log file that can be rotated on demand
///
/// Cloning shares the underlying file, so one handle can be given to the
/// tracing writer while another is kept for rotation.
#[derive(Clone)]
pub struct RotatingLogFile {
    inner: Arc<RotatingInner>,
}

struct RotatingInner {
    path: PathBuf,
    backup_count: usize,
    file: Mutex<File>,
}

impl RotatingLogFile {
    /// Open (or create) `path` for appending, creating parent directories
    pub fn open<P: Into<PathBuf>>(path: P, backup_count: usize) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = open_append(&path)?;

        Ok(Self {
            inner: Arc::new(RotatingInner {
                path,
                backup_count,
                file: Mutex::new(file),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Path of the `index`-th backup (`name.log.1` is the newest)
    pub fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.inner.path.as_os_str().to_owned();
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    fn rotate_files(&self) -> io::Result<()> {
        let mut file = self.inner.file.lock();
        file.flush()?;

        let oldest = self.backup_path(self.inner.backup_count);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.inner.backup_count).rev() {
            let source = self.backup_path(index);
            if source.exists() {
                fs::rename(&source, self.backup_path(index + 1))?;
            }
        }
        if self.inner.path.exists() {
            fs::rename(&self.inner.path, self.backup_path(1))?;
        }

        *file = open_append(&self.inner.path)?;
        Ok(())
    }
}

impl fmt::Debug for RotatingLogFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotatingLogFile")
            .field("path", &self.inner.path)
            .field("backup_count", &self.inner.backup_count)
            .finish()
    }
}

impl Write for RotatingLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.file.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.file.lock().flush()
    }
}

impl LogSink for RotatingLogFile {
    fn write_record(&self, name: &str, level: LogLevel, message: &str) -> io::Result<()> {
        let line = format!(
            "{} {} [{}] {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            level,
            name,
            message
        );
        self.inner.file.lock().write_all(line.as_bytes())
    }

    fn rotate(&self) -> io::Result<()> {
        self.rotate_files()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
