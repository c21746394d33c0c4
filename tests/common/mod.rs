#![allow(dead_code)]

pub mod strategies;

use parking_lot::Mutex;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use nowcast::client::ManagerClient;
use nowcast::config::{ConfigManager, NowcastConfig};
use nowcast::execution::{LaunchError, WorkerLauncher};
use nowcast::orchestration::{ManagerOptions, NowcastManager};
use nowcast::registry::WorkerLoggerRegistry;

/// Message type variants each pipeline worker declares, besides the
/// `need`, `log.*`, `the end` and `crash` types every worker gets
pub const WORKER_VARIANTS: &[(&str, &[&str])] = &[
    ("download_weather", &["00", "06", "12", "18"]),
    ("make_runoff_file", &[""]),
    ("get_NeahBay_ssh", &["nowcast", "forecast", "forecast2"]),
    ("grib_to_netcdf", &["nowcast+", "forecast2"]),
    ("upload_forcing", &["nowcast+", "forecast2", "ssh"]),
    ("make_forcing_links", &["nowcast+", "forecast2", "ssh"]),
    ("run_NEMO", &["nowcast", "forecast", "forecast2"]),
    ("watch_NEMO", &["nowcast", "forecast", "forecast2"]),
    ("download_results", &["nowcast", "forecast", "forecast2"]),
    (
        "make_plots",
        &["nowcast research", "nowcast publish", "forecast publish", "forecast2 publish"],
    ),
    (
        "make_site_page",
        &["nowcast research", "nowcast publish", "forecast publish", "forecast2 publish"],
    ),
    ("push_to_web", &[""]),
    ("rotate_logs", &[""]),
    ("clear_checklist", &[""]),
];

const LOG_LEVELS: &[&str] = &["debug", "info", "warning", "error", "critical"];

fn with_variant(kind: &str, variant: &str) -> String {
    if variant.is_empty() {
        kind.to_string()
    } else {
        format!("{kind} {variant}")
    }
}

/// `msg_types` section covering the whole pipeline plus two ad hoc workers
pub fn msg_types_yaml() -> String {
    let mut yaml = String::from("msg_types:\n");
    for (worker, variants) in WORKER_VARIANTS {
        yaml.push_str(&format!("  {worker}:\n"));
        for variant in *variants {
            for kind in ["success", "failure"] {
                let msg_type = with_variant(kind, variant);
                yaml.push_str(&format!("    \"{msg_type}\": {worker} {msg_type}\n"));
            }
        }
        yaml.push_str("    crash: worker crashed\n");
        yaml.push_str("    need: request checklist value\n");
        yaml.push_str("    the end: worker finished\n");
        for level in LOG_LEVELS {
            yaml.push_str(&format!("    log.{level}: {level} level log message\n"));
        }
    }
    yaml.push_str("  foo:\n    success: foo succeeded\n");
    yaml.push_str("  bar:\n    need: request checklist value\n");
    yaml
}

/// Complete configuration document rooted at `root`
pub fn config_yaml(root: &Path, run_types: &[&str]) -> String {
    format!(
        r#"checklist file: {root}/nowcast_checklist.yaml

ports:
  backend: 0
  bind address: 127.0.0.1

manager host: 127.0.0.1

logging:
  log dir: {root}/logs
  level: debug
  backup count: 3

run_types: [{run_types}]

run:
  west.cloud:
    run dir: /nemoShare/MEOPAR/nowcast
  salish:
    run dir: /data/nowcast

publish:
  status page: {root}/www/status.html

{msg_types}"#,
        root = root.display(),
        run_types = run_types.join(", "),
        msg_types = msg_types_yaml(),
    )
}

/// Write a configuration file under `root` and load it
pub fn write_config(root: &Path, run_types: &[&str]) -> Arc<NowcastConfig> {
    let path = root.join("nowcast.yaml");
    std::fs::write(&path, config_yaml(root, run_types)).unwrap();
    ConfigManager::load(&path).unwrap()
}

/// Launcher that records launches instead of spawning processes
#[derive(Default)]
pub struct RecordingLauncher {
    launches: Mutex<Vec<(String, Vec<String>)>>,
}

impl RecordingLauncher {
    pub fn launches(&self) -> Vec<(String, Vec<String>)> {
        self.launches.lock().clone()
    }
}

impl WorkerLauncher for RecordingLauncher {
    fn launch(&self, worker: &str, args: &[String]) -> Result<Option<u32>, LaunchError> {
        self.launches
            .lock()
            .push((worker.to_string(), args.to_vec()));
        Ok(None)
    }
}

/// A manager serving on an ephemeral port inside a temporary directory
pub struct ManagerHarness {
    pub root: PathBuf,
    pub config: Arc<NowcastConfig>,
    pub launcher: Arc<RecordingLauncher>,
    pub address: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<NowcastManager>,
}

impl ManagerHarness {
    pub async fn start(dir: &TempDir, run_types: &[&str]) -> Self {
        Self::start_with(dir, run_types, ManagerOptions::default()).await
    }

    pub async fn start_with(dir: &TempDir, run_types: &[&str], options: ManagerOptions) -> Self {
        let root = dir.path().to_path_buf();
        let config = write_config(&root, run_types);
        let launcher = Arc::new(RecordingLauncher::default());
        let loggers = WorkerLoggerRegistry::with_log_dir(
            config.logging().log_dir.clone(),
            config.logging().backup_count,
        );

        let mut manager =
            NowcastManager::start(Arc::clone(&config), options, launcher.clone(), loggers)
                .await
                .unwrap();
        let address = manager.local_addr();

        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            manager
                .run_until(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            manager
        });

        Self {
            root,
            config,
            launcher,
            address,
            shutdown,
            handle,
        }
    }

    pub async fn client(&self, worker: &str) -> ManagerClient {
        ManagerClient::connect(&self.address.to_string(), worker)
            .await
            .unwrap()
    }

    pub fn launches(&self) -> Vec<(String, Vec<String>)> {
        self.launcher.launches()
    }

    pub fn checklist_path(&self) -> PathBuf {
        self.config.checklist_file().to_path_buf()
    }

    /// Stop the manager and hand it back for inspection
    pub async fn stop(self) -> NowcastManager {
        let _ = self.shutdown.send(());
        self.handle.await.unwrap()
    }
}

pub fn launch(worker: &str, args: &[&str]) -> (String, Vec<String>) {
    (
        worker.to_string(),
        args.iter().map(|arg| arg.to_string()).collect(),
    )
}
