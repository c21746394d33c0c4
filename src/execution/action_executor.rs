//! # Action Executor
//!
//! Applies the follow-up actions of one dispatched message, in order, after
//! the reply has been sent. A failed checklist write stops the remaining
//! actions of that message so no worker starts against state that was never
//! committed. A failed launch is logged and the list continues.

use chrono::Utc;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::actions::Action;
use super::worker_launcher::{LaunchError, WorkerLauncher};
use crate::checklist::{Checklist, ChecklistError};
use crate::logging::{log_checklist_update, log_error, log_worker_launch};
use crate::registry::WorkerLoggerRegistry;

/// Failure of a single action
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error(transparent)]
    Checklist(#[from] ChecklistError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error("Failed to rotate log sink {sink}: {error}")]
    Rotate { sink: String, error: String },

    #[error("Failed to write status page {path:?}: {error}")]
    StatusPage { path: PathBuf, error: String },
}

/// What happened while applying one message's actions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Actions that completed
    pub applied: usize,

    /// Workers launched, with their pid when known
    pub launched: Vec<(String, Option<u32>)>,

    pub errors: Vec<ActionError>,

    /// Set when a checklist failure skipped the rest of the list
    pub aborted: bool,
}

impl ExecutionReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && !self.aborted
    }
}

/// Applies actions against the checklist, the log registry and the launcher
pub struct ActionExecutor {
    launcher: Arc<dyn WorkerLauncher>,
    status_page: Option<PathBuf>,
}

impl ActionExecutor {
    pub fn new(launcher: Arc<dyn WorkerLauncher>, status_page: Option<PathBuf>) -> Self {
        Self {
            launcher,
            status_page,
        }
    }

    /// Apply `actions` for a message from `source`
    pub fn execute(
        &self,
        source: &str,
        actions: &[Action],
        checklist: &mut Checklist,
        loggers: &WorkerLoggerRegistry,
    ) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        for (index, action) in actions.iter().enumerate() {
            match action {
                Action::UpdateChecklist { stage, value } => {
                    if let Err(e) = checklist.set(stage.as_str(), value.clone()) {
                        self.abort(&mut report, actions, index, e);
                        break;
                    }
                    log_checklist_update(stage, source);
                    report.applied += 1;
                }
                Action::LaunchWorker { worker, args } => match self.launcher.launch(worker, args) {
                    Ok(pid) => {
                        log_worker_launch(worker, args, pid);
                        report.launched.push((worker.clone(), pid));
                        report.applied += 1;
                    }
                    Err(e) => {
                        log_error(
                            "action_executor",
                            "launch_worker",
                            &e.to_string(),
                            Some(worker.as_str()),
                        );
                        report.errors.push(e.into());
                    }
                },
                Action::RotateLogs => {
                    let failures = loggers.rotate_all();
                    if failures.is_empty() {
                        info!(sinks = loggers.len(), "Rotated log files");
                        report.applied += 1;
                    }
                    for (sink, e) in failures {
                        log_error(
                            "action_executor",
                            "rotate_logs",
                            &e.to_string(),
                            Some(sink.as_str()),
                        );
                        report.errors.push(ActionError::Rotate {
                            sink,
                            error: e.to_string(),
                        });
                    }
                }
                Action::ClearChecklist => {
                    match checklist.to_yaml() {
                        Ok(document) => {
                            info!(entries = checklist.len(), "Checklist:\n{}", document)
                        }
                        Err(e) => warn!(error = %e, "Could not render checklist before clearing"),
                    }
                    if let Err(e) = checklist.clear() {
                        self.abort(&mut report, actions, index, e);
                        break;
                    }
                    info!("Checklist cleared");
                    report.applied += 1;
                }
                Action::RenderStatusPage => match self.status_page.as_deref() {
                    None => debug!("No status page configured; skipping render"),
                    Some(path) => match write_status_page(path, checklist) {
                        Ok(()) => {
                            debug!(path = %path.display(), "Status page written");
                            report.applied += 1;
                        }
                        Err(e) => {
                            let error = e.to_string();
                            log_error("action_executor", "render_status_page", &error, None);
                            report.errors.push(ActionError::StatusPage {
                                path: path.to_path_buf(),
                                error,
                            });
                        }
                    },
                },
            }
        }

        report
    }

    fn abort(
        &self,
        report: &mut ExecutionReport,
        actions: &[Action],
        index: usize,
        e: ChecklistError,
    ) {
        let skipped: Vec<String> = actions[index + 1..].iter().map(ToString::to_string).collect();
        error!(
            error = %e,
            action = %actions[index],
            skipped = ?skipped,
            "Checklist write failed; skipping remaining actions"
        );
        report.errors.push(e.into());
        report.aborted = true;
    }
}

/// Render the checklist as a small HTML page and replace `path` atomically
pub fn write_status_page(path: &Path, checklist: &Checklist) -> std::io::Result<()> {
    let html = render_status_page(checklist);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "status.html".to_string());
    let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

    let written = fs::File::create(&temp_path).and_then(|mut file| {
        file.write_all(html.as_bytes())?;
        file.sync_all()
    });
    if let Err(e) = written.and_then(|_| fs::rename(&temp_path, path)) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}

/// HTML summary of the checklist, one table row per stage
pub fn render_status_page(checklist: &Checklist) -> String {
    let mut rows = String::new();
    for (stage, value) in checklist.entries() {
        let rendered = match value {
            Value::String(text) => text.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        };
        rows.push_str(&format!(
            "    <tr><th>{}</th><td><pre>{}</pre></td></tr>\n",
            escape_html(stage),
            escape_html(&rendered)
        ));
    }

    format!(
        "<!DOCTYPE html>\n<html>\n\
         <head><meta charset=\"utf-8\"><title>Nowcast status</title></head>\n<body>\n\
         <h1>Nowcast status</h1>\n<p>Updated {}</p>\n<table>\n{}</table>\n</body>\n</html>\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        rows
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{LogLevel, LogSink};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::io;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingLauncher {
        launches: Mutex<Vec<(String, Vec<String>)>>,
        fail: Option<&'static str>,
    }

    impl WorkerLauncher for RecordingLauncher {
        fn launch(&self, worker: &str, args: &[String]) -> Result<Option<u32>, LaunchError> {
            if self.fail == Some(worker) {
                return Err(LaunchError::SpawnError {
                    worker: worker.to_string(),
                    error: "No such file or directory".to_string(),
                });
            }
            self.launches.lock().push((worker.to_string(), args.to_vec()));
            Ok(Some(4242))
        }
    }

    #[derive(Default)]
    struct CountingSink {
        rotations: Mutex<usize>,
    }

    impl LogSink for CountingSink {
        fn write_record(&self, _name: &str, _level: LogLevel, _message: &str) -> io::Result<()> {
            Ok(())
        }

        fn rotate(&self) -> io::Result<()> {
            *self.rotations.lock() += 1;
            Ok(())
        }
    }

    fn loggers() -> WorkerLoggerRegistry {
        WorkerLoggerRegistry::new(Box::new(|_: &str| {
            Ok(Arc::new(CountingSink::default()) as Arc<dyn LogSink>)
        }))
    }

    #[test]
    fn test_update_then_launch() {
        let dir = TempDir::new().unwrap();
        let launcher = Arc::new(RecordingLauncher::default());
        let executor = ActionExecutor::new(launcher.clone(), None);
        let mut checklist = Checklist::new(dir.path().join("checklist.yaml"));

        let actions = vec![
            Action::update_checklist("weather", json!({"06 forecast": true})),
            Action::launch("make_runoff_file", &[]),
            Action::launch("get_NeahBay_ssh", &["forecast2"]),
        ];
        let report = executor.execute("download_weather", &actions, &mut checklist, &loggers());

        assert!(report.is_clean());
        assert_eq!(report.applied, 3);
        assert_eq!(checklist.get("weather"), Some(&json!({"06 forecast": true})));
        assert_eq!(
            *launcher.launches.lock(),
            vec![
                ("make_runoff_file".to_string(), vec![]),
                ("get_NeahBay_ssh".to_string(), vec!["forecast2".to_string()]),
            ]
        );
    }

    #[test]
    fn test_checklist_failure_aborts_remaining_actions() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let launcher = Arc::new(RecordingLauncher::default());
        let executor = ActionExecutor::new(launcher.clone(), None);
        let mut checklist = Checklist::new(blocker.join("checklist.yaml"));

        let actions = vec![
            Action::update_checklist("weather", json!(true)),
            Action::launch("make_runoff_file", &[]),
        ];
        let report = executor.execute("download_weather", &actions, &mut checklist, &loggers());

        assert!(report.aborted);
        assert_eq!(report.applied, 0);
        assert!(matches!(
            report.errors[..],
            [ActionError::Checklist(ChecklistError::PersistError { .. })]
        ));
        assert!(launcher.launches.lock().is_empty());
        assert_eq!(checklist.get("weather"), None);
    }

    #[test]
    fn test_launch_failure_continues() {
        let dir = TempDir::new().unwrap();
        let launcher = Arc::new(RecordingLauncher {
            fail: Some("upload_forcing"),
            ..Default::default()
        });
        let executor = ActionExecutor::new(launcher.clone(), None);
        let mut checklist = Checklist::new(dir.path().join("checklist.yaml"));

        let actions = vec![
            Action::launch("upload_forcing", &["west.cloud", "nowcast+"]),
            Action::launch("upload_forcing", &["salish", "nowcast+"]),
            Action::launch("make_plots", &["nowcast", "research"]),
        ];
        let report = executor.execute("grib_to_netcdf", &actions, &mut checklist, &loggers());

        assert!(!report.aborted);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.launched, vec![("make_plots".to_string(), Some(4242))]);
    }

    #[test]
    fn test_rotate_logs_rotates_every_sink() {
        let dir = TempDir::new().unwrap();
        let executor = ActionExecutor::new(Arc::new(RecordingLauncher::default()), None);
        let mut checklist = Checklist::new(dir.path().join("checklist.yaml"));

        let sink = Arc::new(CountingSink::default());
        let mut registry = loggers();
        registry.register("nowcast_mgr", sink.clone());
        registry.register("download_weather", sink.clone());

        let report =
            executor.execute("rotate_logs", &[Action::RotateLogs], &mut checklist, &registry);

        assert!(report.is_clean());
        assert_eq!(*sink.rotations.lock(), 2);
    }

    #[test]
    fn test_clear_checklist() {
        let dir = TempDir::new().unwrap();
        let executor = ActionExecutor::new(Arc::new(RecordingLauncher::default()), None);
        let mut checklist = Checklist::new(dir.path().join("checklist.yaml"));
        checklist.set("weather", json!(true)).unwrap();

        let report = executor.execute(
            "clear_checklist",
            &[Action::ClearChecklist],
            &mut checklist,
            &loggers(),
        );

        assert!(report.is_clean());
        assert!(checklist.is_empty());
        assert!(Checklist::load(dir.path().join("checklist.yaml")).unwrap().is_empty());
    }

    #[test]
    fn test_status_page_written_when_configured() {
        let dir = TempDir::new().unwrap();
        let page = dir.path().join("site").join("status.html");
        let executor =
            ActionExecutor::new(Arc::new(RecordingLauncher::default()), Some(page.clone()));
        let mut checklist = Checklist::new(dir.path().join("checklist.yaml"));
        checklist.set("push to salishsea site", json!("<done>")).unwrap();

        let report = executor.execute(
            "push_to_web",
            &[Action::RenderStatusPage],
            &mut checklist,
            &loggers(),
        );

        assert!(report.is_clean());
        let html = fs::read_to_string(&page).unwrap();
        assert!(html.contains("push to salishsea site"));
        assert!(html.contains("&lt;done&gt;"));
    }

    #[test]
    fn test_status_page_failure_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let page = dir.path().join("status.html");
        // a non-empty directory in the way makes the final rename fail
        fs::create_dir(&page).unwrap();
        fs::write(page.join("occupant"), "x").unwrap();

        let executor =
            ActionExecutor::new(Arc::new(RecordingLauncher::default()), Some(page.clone()));
        let mut checklist = Checklist::new(dir.path().join("checklist.yaml"));

        let report = executor.execute(
            "push_to_web",
            &[Action::RenderStatusPage],
            &mut checklist,
            &loggers(),
        );

        assert!(matches!(report.errors.as_slice(), [ActionError::StatusPage { .. }]));
        assert!(!dir.path().join(".status.html.tmp").exists());
        assert!(page.is_dir());
    }

    #[test]
    fn test_status_page_skipped_when_unconfigured() {
        let dir = TempDir::new().unwrap();
        let executor = ActionExecutor::new(Arc::new(RecordingLauncher::default()), None);
        let mut checklist = Checklist::new(dir.path().join("checklist.yaml"));

        let report = executor.execute(
            "push_to_web",
            &[Action::RenderStatusPage],
            &mut checklist,
            &loggers(),
        );

        assert!(report.errors.is_empty());
        assert_eq!(report.applied, 0);
    }
}
