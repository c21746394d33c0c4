//! # Worker Launcher
//!
//! Spawns worker subprocesses. Every worker is invoked the same way: the
//! configured command template with `{worker}` substituted, then the
//! configuration file path, then any worker-specific arguments. Launched
//! workers are not tracked; their completion is observed only through the
//! messages they send back.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// Worker spawn failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LaunchError {
    #[error("Failed to spawn worker {worker}: {error}")]
    SpawnError { worker: String, error: String },

    #[error("Worker command template is empty")]
    EmptyCommand,
}

/// Seam between the action executor and process creation
pub trait WorkerLauncher: Send + Sync {
    /// Start `worker` with `args`; returns the child's pid when known
    fn launch(&self, worker: &str, args: &[String]) -> Result<Option<u32>, LaunchError>;
}

/// Launches workers as detached subprocesses
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    command: Vec<String>,
    config_path: PathBuf,
}

impl ProcessLauncher {
    pub fn new<P: Into<PathBuf>>(command: Vec<String>, config_path: P) -> Self {
        Self {
            command,
            config_path: config_path.into(),
        }
    }

    /// Full argv for launching `worker`
    pub fn argv(&self, worker: &str, args: &[String]) -> Result<Vec<String>, LaunchError> {
        if self.command.is_empty() {
            return Err(LaunchError::EmptyCommand);
        }

        let mut argv: Vec<String> = self
            .command
            .iter()
            .map(|part| part.replace("{worker}", worker))
            .collect();
        argv.push(path_arg(&self.config_path));
        argv.extend(args.iter().cloned());
        Ok(argv)
    }
}

impl WorkerLauncher for ProcessLauncher {
    fn launch(&self, worker: &str, args: &[String]) -> Result<Option<u32>, LaunchError> {
        let argv = self.argv(worker, args)?;
        let (program, program_args) = argv.split_first().ok_or(LaunchError::EmptyCommand)?;

        // The child handle is dropped straight away; tokio reaps the
        // process in the background once it exits.
        let child = Command::new(program)
            .args(program_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false)
            .spawn()
            .map_err(|e| LaunchError::SpawnError {
                worker: worker.to_string(),
                error: e.to_string(),
            })?;

        Ok(child.id())
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
