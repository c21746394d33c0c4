//! # Client Error Types

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::messaging::MessagingError;

pub type ClientResult<T> = Result<T, ClientError>;

/// Errors seen by workers and tools talking to the manager
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to connect to manager at {address}: {error}")]
    Connect { address: String, error: String },

    #[error("Manager closed the connection before replying")]
    ConnectionClosed,

    #[error("Timeout waiting for manager reply to {msg_type}")]
    Timeout { msg_type: String },

    #[error("Manager rejected ({source_name}, {msg_type}) as undefined")]
    Rejected { source_name: String, msg_type: String },

    #[error("Invalid reply: {0}")]
    InvalidReply(#[from] MessagingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigurationError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ClientError {
    pub fn connect(address: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::Connect {
            address: address.into(),
            error: error.to_string(),
        }
    }
}
