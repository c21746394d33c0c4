//! # Worker Client
//!
//! The worker side of the messaging protocol: a connection to the manager
//! that sends one message and waits for its reply, plus the command line
//! arguments every worker accepts.
//!
//! ```rust,no_run
//! use nowcast::client::ManagerClient;
//! use serde_json::json;
//!
//! # async fn run(config: &nowcast::config::NowcastConfig) -> nowcast::client::ClientResult<()> {
//! let mut client = ManagerClient::for_config(config, "download_weather").await?;
//! let already_done = client.need("weather").await?;
//! client.tell("success 06", json!({"06 forecast": true})).await?;
//! client.the_end().await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod manager_client;
pub mod worker_args;

pub use error::{ClientError, ClientResult};
pub use manager_client::{tell_manager, ManagerClient};
pub use worker_args::{parse_run_date, WorkerArgs};
