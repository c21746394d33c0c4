//! # Structured Logging Module
//!
//! Manager logging goes to `<log dir>/<manager log file>` through a
//! non-blocking writer over a [`RotatingLogFile`], so the `rotate_logs`
//! pipeline step can cycle it. `--debug` adds a console layer.

use chrono::Utc;
use std::io;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogFormat, LoggingConfig};
use crate::registry::RotatingLogFile;

/// Keeps the manager log alive; dropping it flushes buffered records
pub struct LoggingGuard {
    manager_log: RotatingLogFile,
    _flush_guard: WorkerGuard,
}

impl LoggingGuard {
    /// Handle to the manager's log file, for registration with the
    /// worker logger registry so rotation covers it
    pub fn manager_log(&self) -> RotatingLogFile {
        self.manager_log.clone()
    }
}

/// Initialize manager logging from the `logging` config section
///
/// `RUST_LOG` overrides the configured level. An already-installed global
/// subscriber is left in place.
pub fn init_structured_logging(
    config: &LoggingConfig,
    console: bool,
) -> io::Result<LoggingGuard> {
    let manager_log = RotatingLogFile::open(config.manager_log_path(), config.backup_count)?;
    let (file_writer, flush_guard) = tracing_appender::non_blocking(manager_log.clone());

    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
    };

    let (json_layer, text_layer) = match config.format {
        LogFormat::Json => (
            Some(
                fmt::layer()
                    .json()
                    .with_writer(file_writer)
                    .with_target(true)
                    .with_ansi(false)
                    .with_filter(filter()),
            ),
            None,
        ),
        LogFormat::Text => (
            None,
            Some(
                fmt::layer()
                    .with_writer(file_writer)
                    .with_target(true)
                    .with_ansi(false)
                    .with_filter(filter()),
            ),
        ),
    };

    let console_layer = console.then(|| {
        fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(filter())
    });

    let subscriber = tracing_subscriber::registry()
        .with(json_layer)
        .with(text_layer)
        .with(console_layer);

    if subscriber.try_init().is_err() {
        tracing::debug!(
            "Global tracing subscriber already initialized - continuing with existing subscriber"
        );
    }

    tracing::info!(
        pid = std::process::id(),
        log_file = %manager_log.path().display(),
        level = %config.level,
        console = console,
        "Structured logging initialized"
    );

    Ok(LoggingGuard {
        manager_log,
        _flush_guard: flush_guard,
    })
}

/// Console-only logging for short-lived command line tools
pub fn init_console_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Log a worker subprocess launch
pub fn log_worker_launch(worker: &str, args: &[String], pid: Option<u32>) {
    tracing::info!(
        operation = "launch_worker",
        worker = %worker,
        args = ?args,
        pid = pid,
        timestamp = %Utc::now().to_rfc3339(),
        "Launched {} worker",
        worker
    );
}

/// Log a committed checklist update
pub fn log_checklist_update(stage: &str, source: &str) {
    tracing::info!(
        operation = "update_checklist",
        stage = %stage,
        source = %source,
        timestamp = %Utc::now().to_rfc3339(),
        "Checklist updated [{}] by {}",
        stage,
        source
    );
}

/// Log the outcome of handling one inbound message
pub fn log_message_handled(source: &str, msg_type: &str, outcome: &str, action_count: usize) {
    tracing::debug!(
        operation = "handle_message",
        source = %source,
        msg_type = %msg_type,
        outcome = %outcome,
        actions = action_count,
        "Handled ({}, {})",
        source,
        msg_type
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "{} {} failed: {}",
        component,
        operation,
        error
    );
}
