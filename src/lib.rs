#![allow(clippy::doc_markdown)] // Allow technical terms like NEMO, NetCDF in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Salish Sea Nowcast Manager
//!
//! Coordinator for the daily Salish Sea ocean model pipeline: weather and
//! river forcing downloads, NEMO model runs on remote hosts, results
//! retrieval, plotting and web publication.
//!
//! ## Overview
//!
//! Workers are short-lived processes that each do one job and report back
//! with a `(source, msg_type, payload)` message. The manager is the only
//! long-lived process. For each message it:
//!
//! 1. checks it against the configured message types,
//! 2. replies (`ack` or `undefined msg`),
//! 3. applies the follow-up actions from the next-step table: recording the
//!    stage in the checklist and launching the downstream workers.
//!
//! The checklist is persisted after every change, so a restarted manager
//! picks the day up where it left off.
//!
//! ## Module Organization
//!
//! - [`config`] - YAML configuration loading and validation
//! - [`messaging`] - Wire codec for control messages
//! - [`checklist`] - Persistent per-day stage record
//! - [`registry`] - Per-worker log sinks
//! - [`execution`] - Transport, dispatch, the pipeline graph and action execution
//! - [`orchestration`] - The manager event loop
//! - [`client`] - Worker-side connection to the manager
//! - [`logging`] - Manager logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nowcast::config::ConfigManager;
//! use nowcast::execution::ProcessLauncher;
//! use nowcast::orchestration::{ManagerOptions, NowcastManager};
//! use nowcast::registry::WorkerLoggerRegistry;
//! use std::sync::Arc;
//!
//! # async fn example() -> nowcast::Result<()> {
//! let config = ConfigManager::load("nowcast.yaml")?;
//! let loggers = WorkerLoggerRegistry::with_log_dir(
//!     config.logging().log_dir.clone(),
//!     config.logging().backup_count,
//! );
//! let launcher = Arc::new(ProcessLauncher::new(config.worker_command().to_vec(), config.path()));
//!
//! let mut manager =
//!     NowcastManager::start(config, ManagerOptions::default(), launcher, loggers).await?;
//! manager.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await;
//! # Ok(())
//! # }
//! ```

pub mod checklist;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod execution;
pub mod logging;
pub mod messaging;
pub mod orchestration;
pub mod registry;

pub use checklist::{Checklist, ChecklistError};
pub use config::{ConfigManager, ConfigurationError, NowcastConfig};
pub use error::{NowcastError, Result};
pub use execution::{Action, Dispatcher, NextStepTable};
pub use messaging::{decode, encode, Message, MessagingError};
pub use orchestration::{ManagerOptions, NowcastManager};
