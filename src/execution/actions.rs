//! # Follow-up Actions
//!
//! Tagged operations produced by the next-step table and applied, in order,
//! by the action executor.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// One operation the manager performs after acknowledging a message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Record `value` for `stage` in the checklist
    UpdateChecklist { stage: String, value: Value },

    /// Spawn `worker` with the config path followed by `args`
    LaunchWorker { worker: String, args: Vec<String> },

    /// Cycle the manager log and every worker log sink
    RotateLogs,

    /// Log the finished day's checklist, then empty it
    ClearChecklist,

    /// Render the pipeline status page from the checklist
    RenderStatusPage,
}

impl Action {
    pub fn update_checklist<S: Into<String>>(stage: S, value: Value) -> Self {
        Action::UpdateChecklist {
            stage: stage.into(),
            value,
        }
    }

    pub fn launch<W: Into<String>>(worker: W, args: &[&str]) -> Self {
        Action::LaunchWorker {
            worker: worker.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    /// Short name of the variant, for logs and statistics
    pub fn kind(&self) -> &'static str {
        match self {
            Action::UpdateChecklist { .. } => "update_checklist",
            Action::LaunchWorker { .. } => "launch_worker",
            Action::RotateLogs => "rotate_logs",
            Action::ClearChecklist => "clear_checklist",
            Action::RenderStatusPage => "render_status_page",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::UpdateChecklist { stage, .. } => write!(f, "update_checklist({stage})"),
            Action::LaunchWorker { worker, args } if args.is_empty() => {
                write!(f, "launch_worker({worker})")
            }
            Action::LaunchWorker { worker, args } => {
                write!(f, "launch_worker({worker} {})", args.join(" "))
            }
            other => f.write_str(other.kind()),
        }
    }
}
