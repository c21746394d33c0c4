//! Checklist store with atomic on-disk persistence.
//!
//! The whole mapping is rewritten after every mutation: it is serialized to
//! a sibling temp file, synced, then renamed over `checklist file`. A crash
//! mid-write leaves the previous checklist intact.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::errors::{ChecklistError, ChecklistResult};

/// Mapping of stage name to completion value, mirrored to disk
#[derive(Debug, Clone)]
pub struct Checklist {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
}

impl Checklist {
    /// Empty checklist that will persist to `path`; nothing is written yet
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the checklist persisted at `path`
    ///
    /// A missing file yields an empty checklist and a warning. A file that
    /// exists but cannot be read or parsed is an error.
    pub fn load<P: Into<PathBuf>>(path: P) -> ChecklistResult<Self> {
        let path = path.into();

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Checklist file {} not found; starting with empty checklist",
                    path.display()
                );
                return Ok(Self::new(path));
            }
            Err(e) => {
                return Err(ChecklistError::LoadError {
                    path,
                    error: e.to_string(),
                })
            }
        };

        let entries = if content.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_yaml::from_str::<BTreeMap<String, Value>>(&content).map_err(|e| {
                ChecklistError::LoadError {
                    path: path.clone(),
                    error: e.to_string(),
                }
            })?
        };

        debug!(
            stages = entries.len(),
            "Checklist loaded from {}",
            path.display()
        );
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Completion value for `stage`; `None` is the absent sentinel
    pub fn get(&self, stage: &str) -> Option<&Value> {
        self.entries.get(stage)
    }

    /// Record `value` for `stage` and persist the whole checklist
    ///
    /// On failure the previous value is restored, so `get` only ever
    /// reflects committed state.
    pub fn set<S: Into<String>>(&mut self, stage: S, value: Value) -> ChecklistResult<()> {
        let stage = stage.into();
        let previous = self.entries.insert(stage.clone(), value);

        if let Err(e) = self.persist() {
            match previous {
                Some(previous) => {
                    self.entries.insert(stage, previous);
                }
                None => {
                    self.entries.remove(&stage);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    /// Empty the checklist at a day boundary and persist it
    pub fn clear(&mut self) -> ChecklistResult<()> {
        let previous = std::mem::take(&mut self.entries);

        if let Err(e) = self.persist() {
            self.entries = previous;
            return Err(e);
        }
        Ok(())
    }

    pub fn entries(&self) -> &BTreeMap<String, Value> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checklist as a YAML document, as written to disk
    pub fn to_yaml(&self) -> ChecklistResult<String> {
        serde_yaml::to_string(&self.entries).map_err(|e| self.persist_error(e))
    }

    fn persist(&self) -> ChecklistResult<()> {
        let document = self.to_yaml()?;
        let temp_path = self.temp_path();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.persist_error(e))?;
        }

        let write_result = File::create(&temp_path).and_then(|mut file| {
            file.write_all(document.as_bytes())?;
            file.sync_all()
        });
        if let Err(e) = write_result.and_then(|_| fs::rename(&temp_path, &self.path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(self.persist_error(e));
        }

        debug!(stages = self.entries.len(), "Checklist persisted");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "checklist".to_string());
        self.path.with_file_name(format!(".{file_name}.tmp"))
    }

    fn persist_error<E: std::fmt::Display>(&self, error: E) -> ChecklistError {
        ChecklistError::PersistError {
            path: self.path.clone(),
            error: error.to_string(),
        }
    }
}
