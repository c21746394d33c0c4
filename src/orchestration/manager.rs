//! # Nowcast Manager
//!
//! The manager's single-threaded event loop. It owns the checklist, the
//! worker log registry and the transport, and handles one request at a time:
//! dispatch, reply, then apply the follow-up actions. Handling of the next
//! request starts only after the previous one's actions have run, so the
//! checklist is never touched concurrently.

use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::checklist::Checklist;
use crate::config::NowcastConfig;
use crate::error::Result;
use crate::execution::{
    ActionExecutor, Dispatch, Dispatcher, ExecutionReport, InboundRequest, NextStepTable, Transport,
    WorkerLauncher,
};
use crate::logging::log_message_handled;
use crate::registry::WorkerLoggerRegistry;

/// Startup switches from the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct ManagerOptions {
    /// Start from an empty checklist instead of the persisted one
    pub ignore_checklist: bool,
}

/// Counters accumulated over the manager's lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlingStats {
    pub handled: u64,
    pub acked: u64,
    pub rejected: u64,
    pub actions_applied: u64,
    pub action_errors: u64,
    pub aborted_action_lists: u64,
    pub workers_launched: u64,

    /// Handled messages per source; malformed messages count under `""`
    pub by_source: BTreeMap<String, u64>,
}

impl HandlingStats {
    fn record_dispatch(&mut self, dispatch: &Dispatch) {
        self.handled += 1;
        if dispatch.is_rejected() {
            self.rejected += 1;
        } else {
            self.acked += 1;
        }
        let source = dispatch
            .request
            .as_ref()
            .map(|request| request.source.clone())
            .unwrap_or_default();
        *self.by_source.entry(source).or_default() += 1;
    }

    fn record_execution(&mut self, report: &ExecutionReport) {
        self.actions_applied += report.applied as u64;
        self.action_errors += report.errors.len() as u64;
        self.workers_launched += report.launched.len() as u64;
        if report.aborted {
            self.aborted_action_lists += 1;
        }
    }
}

pub struct NowcastManager {
    config: Arc<NowcastConfig>,
    checklist: Checklist,
    loggers: WorkerLoggerRegistry,
    dispatcher: Dispatcher,
    executor: ActionExecutor,
    transport: Transport,
    stats: HandlingStats,
}

impl NowcastManager {
    /// Load the checklist and bind the transport
    ///
    /// The standard pipeline table is used; see [`NowcastManager::with_next_steps`].
    pub async fn start(
        config: Arc<NowcastConfig>,
        options: ManagerOptions,
        launcher: Arc<dyn WorkerLauncher>,
        loggers: WorkerLoggerRegistry,
    ) -> Result<Self> {
        Self::with_next_steps(config, options, launcher, loggers, NextStepTable::standard()).await
    }

    pub async fn with_next_steps(
        config: Arc<NowcastConfig>,
        options: ManagerOptions,
        launcher: Arc<dyn WorkerLauncher>,
        loggers: WorkerLoggerRegistry,
        next_steps: NextStepTable,
    ) -> Result<Self> {
        let checklist = if options.ignore_checklist {
            info!(
                path = %config.checklist_file().display(),
                "Ignoring persisted checklist; starting empty"
            );
            Checklist::new(config.checklist_file())
        } else {
            Checklist::load(config.checklist_file())?
        };

        let transport = Transport::bind(&config.bind_address()).await?;
        let executor = ActionExecutor::new(launcher, config.status_page().map(ToOwned::to_owned));
        let dispatcher = Dispatcher::new(Arc::clone(&config), next_steps);

        info!(
            address = %transport.local_addr(),
            checklist_entries = checklist.len(),
            workers = config.msg_types().len(),
            "Nowcast manager started"
        );

        Ok(Self {
            config,
            checklist,
            loggers,
            dispatcher,
            executor,
            transport,
            stats: HandlingStats::default(),
        })
    }

    pub fn config(&self) -> &NowcastConfig {
        &self.config
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    pub fn checklist(&self) -> &Checklist {
        &self.checklist
    }

    pub fn loggers(&self) -> &WorkerLoggerRegistry {
        &self.loggers
    }

    pub fn stats(&self) -> &HandlingStats {
        &self.stats
    }

    /// Serve requests until `shutdown` completes or the transport closes
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                request = self.transport.receive() => match request {
                    Some(request) => {
                        self.handle_request(request);
                    }
                    None => {
                        warn!("Transport closed");
                        break;
                    }
                },
            }
        }

        self.transport.shutdown();
        self.log_summary();
    }

    /// Dispatch one request, reply, then apply its actions
    pub fn handle_request(&mut self, request: InboundRequest) -> ExecutionReport {
        let dispatch = self
            .dispatcher
            .dispatch(&request.body, &self.checklist, &mut self.loggers);
        self.stats.record_dispatch(&dispatch);

        let peer = request.peer;
        if let Err(e) = request.reply(&dispatch.reply) {
            // The message itself was valid; its consequences still apply
            warn!(peer = %peer, error = %e, "Reply not delivered");
        }

        let (source, msg_type) = dispatch
            .request
            .as_ref()
            .map(|message| (message.source.as_str(), message.msg_type.as_str()))
            .unwrap_or(("", ""));

        let report = if dispatch.actions.is_empty() {
            ExecutionReport::default()
        } else {
            self.executor
                .execute(source, &dispatch.actions, &mut self.checklist, &self.loggers)
        };
        self.stats.record_execution(&report);

        log_message_handled(source, msg_type, dispatch.outcome(), dispatch.actions.len());
        if !report.is_clean() {
            debug!(
                source = %source,
                msg_type = %msg_type,
                errors = report.errors.len(),
                "Actions completed with errors"
            );
        }
        report
    }

    fn log_summary(&self) {
        let stats = &self.stats;
        info!(
            handled = stats.handled,
            acked = stats.acked,
            rejected = stats.rejected,
            actions_applied = stats.actions_applied,
            action_errors = stats.action_errors,
            aborted_action_lists = stats.aborted_action_lists,
            workers_launched = stats.workers_launched,
            checklist_entries = self.checklist.len(),
            "Nowcast manager stopped"
        );
        for (source, count) in &stats.by_source {
            debug!(source = %source, messages = count, "Messages handled");
        }
    }
}
