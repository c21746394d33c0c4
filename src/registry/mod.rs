//! # Log Sink Registry
//!
//! Named log sinks for the manager and its remote workers.

pub mod log_sink;
pub mod worker_logger_registry;

pub use log_sink::{LogLevel, LogSink, RotatingLogFile};
pub use worker_logger_registry::{SinkFactory, WorkerLogger, WorkerLoggerRegistry};
