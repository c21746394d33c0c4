//! # Nowcast Configuration
//!
//! The configuration document is loaded once at manager start and is
//! read-only afterwards. It is shared as `Arc<NowcastConfig>` and handed
//! explicitly to every component that needs it.
//!
//! ## Layout
//!
//! ```yaml
//! checklist file: /results/nowcast/nowcast_checklist.yaml
//!
//! ports:
//!   backend: 5555
//!
//! logging:
//!   log dir: /results/nowcast/logs
//!   level: info
//!
//! run_types: [nowcast, forecast, forecast2]
//!
//! run:
//!   west.cloud:
//!     run dir: /nemoShare/MEOPAR/nowcast
//!
//! msg_types:
//!   download_weather:
//!     success 06: 06 weather forecast ready
//!     failure 06: 06 weather forecast download failed
//!     crash: download_weather worker crashed
//!     log.info: info level log message
//! ```
//!
//! Keys keep their historical spelling (`checklist file`, `log dir`), so
//! typed sections use explicit serde renames.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use nowcast::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigManager::load("nowcast.yaml")?;
//! let port = config.backend_port();
//! let accepted = config.accepts("download_weather", "success 06");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Top-level keys that must be present in every configuration document
pub const REQUIRED_KEYS: [&str; 5] =
    ["checklist file", "msg_types", "ports", "logging", "run_types"];

/// Immutable, validated nowcast configuration
#[derive(Debug, Clone)]
pub struct NowcastConfig {
    /// Absolute path of the document this config was loaded from
    path: PathBuf,

    /// The whole parsed document, for opaque nested lookups
    raw: serde_yaml::Value,

    checklist_file: PathBuf,
    msg_types: BTreeMap<String, BTreeMap<String, String>>,
    ports: PortsConfig,
    logging: LoggingConfig,
    run_types: BTreeSet<String>,
    run: BTreeMap<String, serde_yaml::Value>,
    workers: WorkersConfig,
    manager_host: String,
    publish: PublishConfig,
}

/// Typed view over the configuration document used during deserialization
#[derive(Debug, Deserialize)]
pub(crate) struct ConfigDocument {
    #[serde(rename = "checklist file")]
    pub checklist_file: PathBuf,

    pub msg_types: BTreeMap<String, BTreeMap<String, String>>,

    pub ports: PortsConfig,

    pub logging: LoggingConfig,

    pub run_types: BTreeSet<String>,

    #[serde(default)]
    pub run: BTreeMap<String, serde_yaml::Value>,

    #[serde(default)]
    pub workers: WorkersConfig,

    #[serde(rename = "manager host", default = "default_manager_host")]
    pub manager_host: String,

    #[serde(default)]
    pub publish: PublishConfig,
}

/// Port numbers and bind address for the transport socket
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PortsConfig {
    /// Port the manager's request/reply socket binds to
    pub backend: u16,

    /// Interface the manager binds to
    #[serde(rename = "bind address", default = "default_bind_address")]
    pub bind_address: String,
}

/// Log sinks and formats for the manager and forwarded worker logs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Directory holding the manager log and one log file per worker
    #[serde(rename = "log dir")]
    pub log_dir: PathBuf,

    /// File name of the manager's own log within `log dir`
    #[serde(rename = "manager log file", default = "default_manager_log_file")]
    pub manager_log_file: String,

    /// Default filter directive (`info`, `debug`, ...)
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Number of rotated files kept per sink
    #[serde(rename = "backup count", default = "default_backup_count")]
    pub backup_count: usize,
}

impl LoggingConfig {
    /// Path of the manager's own log file
    pub fn manager_log_path(&self) -> PathBuf {
        self.log_dir.join(&self.manager_log_file)
    }
}

/// Line format of log files written by the manager
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// How worker subprocesses are launched
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkersConfig {
    /// Argv template; `{worker}` is replaced with the worker name, then the
    /// config path and worker-specific arguments are appended
    #[serde(default = "default_worker_command")]
    pub command: Vec<String>,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            command: default_worker_command(),
        }
    }
}

/// Publication settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PublishConfig {
    /// Where the pipeline status page is rendered; rendering is skipped if unset
    #[serde(rename = "status page", default)]
    pub status_page: Option<PathBuf>,
}

fn default_manager_host() -> String {
    "localhost".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_manager_log_file() -> String {
    "nowcast_mgr.log".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_backup_count() -> usize {
    7
}

fn default_worker_command() -> Vec<String> {
    vec![
        "python3".to_string(),
        "-m".to_string(),
        "nowcast.workers.{worker}".to_string(),
    ]
}

impl NowcastConfig {
    pub(crate) fn from_parts(path: PathBuf, raw: serde_yaml::Value, doc: ConfigDocument) -> Self {
        Self {
            path,
            raw,
            checklist_file: doc.checklist_file,
            msg_types: doc.msg_types,
            ports: doc.ports,
            logging: doc.logging,
            run_types: doc.run_types,
            run: doc.run,
            workers: doc.workers,
            manager_host: doc.manager_host,
            publish: doc.publish,
        }
    }

    /// Path of the configuration file; passed to every launched worker
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the persisted checklist
    pub fn checklist_file(&self) -> &Path {
        &self.checklist_file
    }

    /// The universe of accepted messages, per worker
    pub fn msg_types(&self) -> &BTreeMap<String, BTreeMap<String, String>> {
        &self.msg_types
    }

    pub fn is_known_worker(&self, worker: &str) -> bool {
        self.msg_types.contains_key(worker)
    }

    /// Whether `msg_type` is declared for `worker`
    pub fn accepts(&self, worker: &str, msg_type: &str) -> bool {
        self.msg_types
            .get(worker)
            .is_some_and(|types| types.contains_key(msg_type))
    }

    /// Human-readable description of a worker's message type
    pub fn describe(&self, worker: &str, msg_type: &str) -> Option<&str> {
        self.msg_types
            .get(worker)
            .and_then(|types| types.get(msg_type))
            .map(String::as_str)
    }

    pub fn backend_port(&self) -> u16 {
        self.ports.backend
    }

    /// `host:port` the transport binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.ports.bind_address, self.ports.backend)
    }

    /// Host worker clients connect to
    pub fn manager_host(&self) -> &str {
        &self.manager_host
    }

    pub fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    pub fn run_types(&self) -> &BTreeSet<String> {
        &self.run_types
    }

    pub fn run_type_enabled(&self, run_type: &str) -> bool {
        self.run_types.contains(run_type)
    }

    /// Names of the configured model-run hosts
    pub fn run_hosts(&self) -> impl Iterator<Item = &str> {
        self.run.keys().map(String::as_str)
    }

    /// Opaque descriptor for a model-run host
    pub fn host(&self, name: &str) -> Option<&serde_yaml::Value> {
        self.run.get(name)
    }

    pub fn worker_command(&self) -> &[String] {
        &self.workers.command
    }

    pub fn status_page(&self) -> Option<&Path> {
        self.publish.status_page.as_deref()
    }

    /// Look up an arbitrary nested value by key path
    pub fn get(&self, keys: &[&str]) -> Option<&serde_yaml::Value> {
        keys.iter().try_fold(&self.raw, |node, key| node.get(*key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
checklist file: /tmp/nowcast_checklist.yaml
ports:
  backend: 5555
logging:
  log dir: /tmp/nowcast-logs
run_types: [nowcast, forecast2]
run:
  west.cloud:
    run dir: /nemoShare/MEOPAR/nowcast
msg_types:
  download_weather:
    success 06: 06 weather forecast ready
    crash: download_weather worker crashed
"#;

    fn config() -> NowcastConfig {
        ConfigManager::from_yaml_str(CONFIG, "/etc/nowcast.yaml").unwrap()
    }

    #[test]
    fn test_defaults_fill_optional_sections() {
        let config = config();

        assert_eq!(config.bind_address(), "0.0.0.0:5555");
        assert_eq!(config.manager_host(), "localhost");
        assert_eq!(config.logging().level, "info");
        assert_eq!(config.logging().format, LogFormat::Text);
        assert_eq!(config.logging().backup_count, 7);
        assert_eq!(
            config.logging().manager_log_path(),
            PathBuf::from("/tmp/nowcast-logs/nowcast_mgr.log")
        );
        assert_eq!(config.worker_command()[0], "python3");
        assert!(config.status_page().is_none());
    }

    #[test]
    fn test_msg_type_lookups() {
        let config = config();

        assert!(config.is_known_worker("download_weather"));
        assert!(!config.is_known_worker("make_plots"));
        assert!(config.accepts("download_weather", "success 06"));
        assert!(!config.accepts("download_weather", "success 12"));
        assert_eq!(
            config.describe("download_weather", "crash"),
            Some("download_weather worker crashed")
        );
    }

    #[test]
    fn test_run_types_and_hosts() {
        let config = config();

        assert!(config.run_type_enabled("nowcast"));
        assert!(!config.run_type_enabled("forecast"));
        assert_eq!(config.run_hosts().collect::<Vec<_>>(), vec!["west.cloud"]);
        assert_eq!(
            config
                .get(&["run", "west.cloud", "run dir"])
                .and_then(|v| v.as_str()),
            Some("/nemoShare/MEOPAR/nowcast")
        );
        assert!(config.get(&["run", "salish"]).is_none());
    }
}
