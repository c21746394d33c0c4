//! Command line arguments shared by every worker.
//!
//! The manager launches each worker with the configuration file path as the
//! first argument, followed by worker-specific arguments. Workers flatten
//! [`WorkerArgs`] into their own parser:
//!
//! ```rust
//! use clap::Parser;
//! use nowcast::client::WorkerArgs;
//!
//! #[derive(Parser)]
//! struct GetNeahBaySsh {
//!     #[command(flatten)]
//!     common: WorkerArgs,
//!
//!     /// nowcast, forecast or forecast2
//!     run_type: String,
//! }
//!
//! let args = GetNeahBaySsh::parse_from(["get_NeahBay_ssh", "nowcast.yaml", "forecast2"]);
//! assert_eq!(args.run_type, "forecast2");
//! ```

use chrono::NaiveDate;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use super::error::ClientResult;
use crate::config::{ConfigManager, NowcastConfig};

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct WorkerArgs {
    /// Path to the nowcast configuration file
    pub config_file: PathBuf,

    /// Log to the console at debug level instead of forwarding to the manager
    #[arg(long)]
    pub debug: bool,
}

impl WorkerArgs {
    pub fn load_config(&self) -> ClientResult<Arc<NowcastConfig>> {
        Ok(ConfigManager::load(&self.config_file)?)
    }
}

/// Value parser for worker date arguments (`YYYY-MM-DD`)
///
/// Use as `#[arg(long, value_parser = parse_run_date)]`.
pub fn parse_run_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("expected a YYYY-MM-DD date, got '{value}': {e}"))
}
