//! Crate-level error type
//!
//! Each subsystem has its own error enum; `NowcastError` wraps them for
//! callers that drive the whole manager.

use thiserror::Error;

use crate::checklist::ChecklistError;
use crate::config::ConfigurationError;
use crate::execution::{LaunchError, TransportError};
use crate::messaging::MessagingError;

#[derive(Debug, Error)]
pub enum NowcastError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    #[error("Checklist error: {0}")]
    Checklist(#[from] ChecklistError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NowcastError>;
