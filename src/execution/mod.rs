//! # Execution Layer
//!
//! Everything between a raw request on the socket and its effects:
//!
//! - [`transport`]: newline-framed request/reply socket
//! - [`dispatcher`]: validation and routing of one message to a reply plus actions
//! - [`next_steps`]: the pipeline graph, one pure decision function per worker
//! - [`action_executor`]: ordered application of follow-up actions
//! - [`worker_launcher`]: subprocess creation for launched workers

pub mod action_executor;
pub mod actions;
pub mod dispatcher;
pub mod next_steps;
pub mod transport;
pub mod worker_launcher;

pub use action_executor::{ActionError, ActionExecutor, ExecutionReport};
pub use actions::Action;
pub use dispatcher::{Dispatch, Dispatcher, Rejection};
pub use next_steps::{NextStepFn, NextStepTable};
pub use transport::{InboundRequest, Transport, TransportError};
pub use worker_launcher::{LaunchError, ProcessLauncher, WorkerLauncher};
