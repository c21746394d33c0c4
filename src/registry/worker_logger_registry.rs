//! # Worker Logger Registry
//!
//! Maps a worker name to the sink that receives the log records it forwards
//! to the manager. Entries are created lazily the first time a worker logs
//! and live as long as the manager process.

use serde_json::Value;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::log_sink::{LogLevel, LogSink, RotatingLogFile};

/// Builds the sink for a worker seen for the first time
pub type SinkFactory = Box<dyn Fn(&str) -> io::Result<Arc<dyn LogSink>> + Send + Sync>;

/// A named logger backed by a sink
#[derive(Clone)]
pub struct WorkerLogger {
    name: String,
    sink: Arc<dyn LogSink>,
}

impl WorkerLogger {
    pub fn new<N: Into<String>>(name: N, sink: Arc<dyn LogSink>) -> Self {
        Self {
            name: name.into(),
            sink,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Write `message` to the sink and mirror it into the manager's trace
    pub fn log(&self, level: LogLevel, message: &str) -> io::Result<()> {
        match level {
            LogLevel::Debug => debug!(worker = %self.name, "{}", message),
            LogLevel::Info => info!(worker = %self.name, "{}", message),
            LogLevel::Warning => warn!(worker = %self.name, "{}", message),
            LogLevel::Error | LogLevel::Critical => error!(worker = %self.name, "{}", message),
        }
        self.sink.write_record(&self.name, level, message)
    }

    pub fn rotate(&self) -> io::Result<()> {
        self.sink.rotate()
    }
}

/// Registry of per-worker log sinks, keyed by worker name
pub struct WorkerLoggerRegistry {
    loggers: BTreeMap<String, WorkerLogger>,
    factory: SinkFactory,
}

impl WorkerLoggerRegistry {
    pub fn new(factory: SinkFactory) -> Self {
        Self {
            loggers: BTreeMap::new(),
            factory,
        }
    }

    /// Registry whose workers each log to `<log_dir>/<worker>.log`
    pub fn with_log_dir<P: Into<PathBuf>>(log_dir: P, backup_count: usize) -> Self {
        let log_dir = log_dir.into();
        Self::new(Box::new(move |worker: &str| {
            let sink = RotatingLogFile::open(log_dir.join(format!("{worker}.log")), backup_count)?;
            Ok(Arc::new(sink) as Arc<dyn LogSink>)
        }))
    }

    /// Register a sink under `name` directly, replacing any existing entry
    ///
    /// Used for the manager's own log so that rotation covers it too.
    pub fn register<N: Into<String>>(&mut self, name: N, sink: Arc<dyn LogSink>) {
        let name = name.into();
        if self.loggers.contains_key(&name) {
            warn!("Replacing existing log sink for {}", name);
        }
        self.loggers.insert(name.clone(), WorkerLogger::new(name, sink));
    }

    /// Logger for `worker`, created on first use
    pub fn logger(&mut self, worker: &str) -> io::Result<&WorkerLogger> {
        if !self.loggers.contains_key(worker) {
            let sink = (self.factory)(worker)?;
            debug!("Created log sink for worker {}", worker);
            self.loggers
                .insert(worker.to_string(), WorkerLogger::new(worker, sink));
        }
        self.loggers
            .get(worker)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, worker.to_string()))
    }

    /// Forward a remote log record to `worker`'s sink
    ///
    /// String payloads are written as-is; anything else is written as
    /// compact JSON.
    pub fn forward(&mut self, worker: &str, level: LogLevel, payload: &Value) -> io::Result<()> {
        let message = match payload {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        self.logger(worker)?.log(level, &message)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.loggers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.loggers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }

    /// Rotate every registered sink; returns the sinks that failed
    pub fn rotate_all(&self) -> Vec<(String, io::Error)> {
        let mut failures = Vec::new();
        for (name, logger) in &self.loggers {
            if let Err(e) = logger.rotate() {
                failures.push((name.clone(), e));
            }
        }
        failures
    }
}
