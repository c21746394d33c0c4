//! # Orchestration
//!
//! The nowcast manager process: startup, the request loop and shutdown.

pub mod manager;
pub mod shutdown;

pub use manager::{HandlingStats, ManagerOptions, NowcastManager};
pub use shutdown::ShutdownSignals;
