//! # Message Dispatcher
//!
//! Turns one inbound wire message into exactly one reply plus the list of
//! follow-up actions to apply after the reply is sent. The dispatcher reads
//! the checklist (to answer `need`) and writes forwarded worker logs, but
//! never mutates the checklist itself; checklist updates are actions.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::actions::Action;
use super::next_steps::NextStepTable;
use crate::checklist::Checklist;
use crate::config::NowcastConfig;
use crate::constants::msg_types;
use crate::messaging::{decode, Message};
use crate::registry::{LogLevel, WorkerLoggerRegistry};

/// Why a message was answered with `undefined msg`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Not decodable, or missing `source` / `msg_type`
    Malformed(String),

    /// `source` has no `msg_types` entry
    UnknownWorker,

    /// `msg_type` is not among the source's configured types
    UnknownMsgType,
}

/// Result of dispatching one message
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// The decoded request, when decoding succeeded
    pub request: Option<Message>,

    /// Reply to send before any action runs
    pub reply: Message,

    /// Follow-up actions, in application order
    pub actions: Vec<Action>,

    pub rejection: Option<Rejection>,
}

impl Dispatch {
    fn ack(request: Message, payload: Value, actions: Vec<Action>) -> Self {
        Self {
            request: Some(request),
            reply: Message::ack(payload),
            actions,
            rejection: None,
        }
    }

    fn rejected(request: Option<Message>, rejection: Rejection) -> Self {
        Self {
            request,
            reply: Message::undefined(),
            actions: Vec::new(),
            rejection: Some(rejection),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }

    /// Short outcome label for logs and statistics
    pub fn outcome(&self) -> &'static str {
        match self.rejection {
            None => "ack",
            Some(Rejection::Malformed(_)) => "malformed",
            Some(Rejection::UnknownWorker) => "unknown_worker",
            Some(Rejection::UnknownMsgType) => "unknown_msg_type",
        }
    }
}

/// Validates messages against the configured universe and routes them
pub struct Dispatcher {
    config: Arc<NowcastConfig>,
    next_steps: NextStepTable,
}

impl Dispatcher {
    pub fn new(config: Arc<NowcastConfig>, next_steps: NextStepTable) -> Self {
        Self { config, next_steps }
    }

    pub fn config(&self) -> &NowcastConfig {
        &self.config
    }

    pub fn next_steps(&self) -> &NextStepTable {
        &self.next_steps
    }

    /// Decode and route one raw request
    pub fn dispatch(
        &self,
        bytes: &[u8],
        checklist: &Checklist,
        loggers: &mut WorkerLoggerRegistry,
    ) -> Dispatch {
        match decode(bytes) {
            Ok(message) => self.dispatch_message(message, checklist, loggers),
            Err(e) => {
                debug!(error = %e, "Rejecting undecodable message");
                Dispatch::rejected(None, Rejection::Malformed(e.to_string()))
            }
        }
    }

    /// Route an already decoded message
    pub fn dispatch_message(
        &self,
        message: Message,
        checklist: &Checklist,
        loggers: &mut WorkerLoggerRegistry,
    ) -> Dispatch {
        if !self.config.is_known_worker(&message.source) {
            warn!(
                source = %message.source,
                msg_type = %message.msg_type,
                "Message from unknown worker"
            );
            return Dispatch::rejected(Some(message), Rejection::UnknownWorker);
        }
        if !self.config.accepts(&message.source, &message.msg_type) {
            warn!(source = %message.source, msg_type = %message.msg_type, "Undefined message type");
            return Dispatch::rejected(Some(message), Rejection::UnknownMsgType);
        }

        if message.msg_type == msg_types::NEED {
            let value = self.lookup_need(&message, checklist);
            return Dispatch::ack(message, value, Vec::new());
        }

        if let Some(token) = log_level(&message.msg_type) {
            let level = if token.is_empty() {
                LogLevel::Info
            } else {
                token.parse::<LogLevel>().unwrap_or_else(|_| {
                    warn!(
                        source = %message.source,
                        level = %token,
                        "Unknown log level, forwarding at info"
                    );
                    LogLevel::Info
                })
            };
            if let Err(e) = loggers.forward(&message.source, level, &message.payload) {
                warn!(source = %message.source, error = %e, "Failed to write forwarded log record");
            }
            return Dispatch::ack(message, Value::Null, Vec::new());
        }

        if message.msg_type == msg_types::THE_END {
            debug!(source = %message.source, "Worker finished");
            return Dispatch::ack(message, Value::Null, Vec::new());
        }

        let description = self
            .config
            .describe(&message.source, &message.msg_type)
            .unwrap_or_default();
        if message.msg_type == msg_types::CRASH {
            error!(source = %message.source, "Worker crashed: {}", description);
        } else if message.msg_type.starts_with(msg_types::FAILURE) {
            warn!(source = %message.source, msg_type = %message.msg_type, "{}", description);
        } else {
            debug!(source = %message.source, msg_type = %message.msg_type, "{}", description);
        }

        let actions = self
            .next_steps
            .next_steps(&message.source, &message.msg_type, &message.payload, &self.config)
            .unwrap_or_else(|| {
                debug!(source = %message.source, "No next-step entry for worker");
                Vec::new()
            });
        Dispatch::ack(message, Value::Null, actions)
    }

    fn lookup_need(&self, message: &Message, checklist: &Checklist) -> Value {
        match &message.payload {
            Value::String(stage) => checklist.get(stage).cloned().unwrap_or(Value::Null),
            other => {
                warn!(
                    source = %message.source,
                    payload = %other,
                    "need payload is not a stage name"
                );
                Value::Null
            }
        }
    }
}

/// Level token of a log message type
///
/// Any type starting with `log` is a log message. The level follows the
/// first `.` (`log.error`); a bare `log` yields an empty token.
fn log_level(msg_type: &str) -> Option<&str> {
    let rest = msg_type.strip_prefix(msg_types::LOG_PREFIX)?;
    Some(rest.strip_prefix('.').unwrap_or(rest))
}
