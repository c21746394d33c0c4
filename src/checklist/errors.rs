//! # Checklist Error Types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChecklistError {
    /// Writing the checklist file failed; the in-memory state was rolled back
    #[error("Failed to persist checklist to {path:?}: {error}")]
    PersistError { path: PathBuf, error: String },

    /// An existing checklist file could not be read or parsed
    #[error("Failed to load checklist from {path:?}: {error}")]
    LoadError { path: PathBuf, error: String },
}

pub type ChecklistResult<T> = Result<T, ChecklistError>;
