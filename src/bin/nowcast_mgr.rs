//! # Nowcast Manager
//!
//! Long-running coordinator for the daily nowcast pipeline.
//!
//! ## Usage
//!
//! ```bash
//! nowcast-mgr /results/nowcast/nowcast.yaml
//!
//! # Start from an empty checklist and echo logs to the console
//! nowcast-mgr /results/nowcast/nowcast.yaml --ignore-checklist --debug
//! ```

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use nowcast::config::ConfigManager;
use nowcast::constants::MANAGER_NAME;
use nowcast::execution::ProcessLauncher;
use nowcast::logging;
use nowcast::orchestration::{ManagerOptions, NowcastManager, ShutdownSignals};
use nowcast::registry::WorkerLoggerRegistry;

#[derive(Parser, Debug)]
#[command(name = "nowcast-mgr")]
#[command(about = "Coordinate the nowcast pipeline workers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to the nowcast configuration file
    config_file: PathBuf,

    /// Start with an empty checklist instead of loading the persisted one
    #[arg(long)]
    ignore_checklist: bool,

    /// Also log to the console
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let signals = ShutdownSignals::install().context("Failed to install signal handlers")?;

    let config = ConfigManager::load(&cli.config_file).with_context(|| {
        format!("Failed to load configuration from {}", cli.config_file.display())
    })?;

    let logging_guard = logging::init_structured_logging(config.logging(), cli.debug)
        .context("Failed to initialize logging")?;

    info!("Starting nowcast manager");
    info!("   Version: {}", env!("CARGO_PKG_VERSION"));
    info!("   Config: {}", config.path().display());

    let logging_config = config.logging();
    let mut loggers = WorkerLoggerRegistry::with_log_dir(
        logging_config.log_dir.clone(),
        logging_config.backup_count,
    );
    loggers.register(MANAGER_NAME, Arc::new(logging_guard.manager_log()));

    let launcher = Arc::new(ProcessLauncher::new(
        config.worker_command().to_vec(),
        config.path(),
    ));
    let options = ManagerOptions {
        ignore_checklist: cli.ignore_checklist,
    };

    let mut manager = NowcastManager::start(Arc::clone(&config), options, launcher, loggers)
        .await
        .context("Failed to start nowcast manager")?;

    info!("   Listening on {}", manager.local_addr());
    manager.run_until(signals.wait()).await;

    info!("Nowcast manager shutdown complete");
    drop(logging_guard);
    Ok(())
}
