//! # Manager/Worker Messaging
//!
//! Control messages exchanged between the nowcast manager and its workers.
//! Every message is a `(source, msg_type, payload)` triple carried as one
//! line of JSON text, so either end can parse it without a shared schema.

pub mod errors;
pub mod message;

pub use errors::{MessagingError, MessagingResult};
pub use message::{decode, encode, Message};
