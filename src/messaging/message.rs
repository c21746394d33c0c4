//! # Message Codec
//!
//! Translates between [`Message`] and its wire text. The encoding is a
//! compact JSON object with keys in a fixed order, so equal messages always
//! encode to identical bytes. Message types are not validated here; the
//! dispatcher checks them against the configured universe.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::errors::{MessagingError, MessagingResult};
use crate::constants::{reply, MANAGER_NAME};

/// A manager/worker control message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Worker name, or `nowcast_mgr` for replies
    pub source: String,

    /// Short token from the source's configured message types
    pub msg_type: String,

    /// Arbitrary structured data; null when absent
    #[serde(default)]
    pub payload: Value,
}

impl Message {
    pub fn new<S: Into<String>, T: Into<String>>(source: S, msg_type: T, payload: Value) -> Self {
        Self {
            source: source.into(),
            msg_type: msg_type.into(),
            payload,
        }
    }

    /// Manager acknowledgement carrying `payload`
    pub fn ack(payload: Value) -> Self {
        Self::new(MANAGER_NAME, reply::ACK, payload)
    }

    /// Manager reply to a message it does not recognize
    pub fn undefined() -> Self {
        Self::new(MANAGER_NAME, reply::UNDEFINED_MSG, Value::Null)
    }

    pub fn is_ack(&self) -> bool {
        self.msg_type == reply::ACK
    }

    pub fn is_undefined(&self) -> bool {
        self.msg_type == reply::UNDEFINED_MSG
    }

    /// Wire text for this message
    pub fn encode(&self) -> String {
        encode(&self.source, &self.msg_type, &self.payload)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.source, self.msg_type)
    }
}

/// Encode a message triple as a single line of JSON text
///
/// Never fails and never emits a newline, so the result can be framed by
/// line on the transport.
pub fn encode(source: &str, msg_type: &str, payload: &Value) -> String {
    let mut envelope = serde_json::Map::new();
    envelope.insert("source".to_string(), Value::String(source.to_string()));
    envelope.insert("msg_type".to_string(), Value::String(msg_type.to_string()));
    envelope.insert("payload".to_string(), payload.clone());
    Value::Object(envelope).to_string()
}

/// Decode wire bytes into a message
///
/// A missing `payload` decodes as null. Surrounding whitespace (including
/// the line terminator) is ignored.
pub fn decode(bytes: &[u8]) -> MessagingResult<Message> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| MessagingError::malformed(format!("not UTF-8: {e}")))?
        .trim();

    if text.is_empty() {
        return Err(MessagingError::malformed("empty message"));
    }

    serde_json::from_str::<Message>(text).map_err(MessagingError::malformed)
}
