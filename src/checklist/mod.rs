//! # Pipeline Checklist
//!
//! Durable record of which stages of the current day's pipeline have
//! completed, and with what artifacts. Owned exclusively by the manager.

pub mod errors;
pub mod store;

pub use errors::{ChecklistError, ChecklistResult};
pub use store::Checklist;
