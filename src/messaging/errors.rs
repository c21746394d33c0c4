//! # Messaging Error Types

use thiserror::Error;

/// Errors raised by the message codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessagingError {
    /// Input could not be parsed, or lacks `source` / `msg_type`
    #[error("Malformed message: {reason}")]
    MalformedMessage { reason: String },
}

impl MessagingError {
    pub fn malformed<R: std::fmt::Display>(reason: R) -> Self {
        Self::MalformedMessage {
            reason: reason.to_string(),
        }
    }
}

/// Result type for codec operations
pub type MessagingResult<T> = Result<T, MessagingError>;
