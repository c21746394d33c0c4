//! # Nowcast Tell
//!
//! Send one message to a running manager on behalf of a worker and print
//! the reply. Useful for replaying a missed step by hand.
//!
//! ```bash
//! nowcast-tell nowcast.yaml download_weather "success 06" --payload '{"06 forecast": true}'
//! nowcast-tell nowcast.yaml download_weather need --payload '"weather"'
//! ```

use anyhow::{bail, Context};
use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;

use nowcast::client::tell_manager;
use nowcast::config::ConfigManager;
use nowcast::logging;

#[derive(Parser, Debug)]
#[command(name = "nowcast-tell")]
#[command(about = "Send a message to the nowcast manager")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to the nowcast configuration file
    config_file: PathBuf,

    /// Worker the message is sent as
    worker: String,

    /// Message type, e.g. "success 06"
    msg_type: String,

    /// JSON payload
    #[arg(long, default_value = "null")]
    payload: String,

    /// Log to the console at debug level
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_console_logging(if cli.debug { "debug" } else { "warn" });

    let payload: Value = serde_json::from_str(&cli.payload)
        .with_context(|| format!("Payload is not JSON: {}", cli.payload))?;
    let config = ConfigManager::load(&cli.config_file).with_context(|| {
        format!("Failed to load configuration from {}", cli.config_file.display())
    })?;

    let reply = tell_manager(&config, &cli.worker, &cli.msg_type, payload)
        .await
        .context("Failed to reach the nowcast manager")?;

    println!("{}", reply.encode());
    if reply.is_undefined() {
        bail!("Manager does not recognize ({}, {})", cli.worker, cli.msg_type);
    }
    Ok(())
}
