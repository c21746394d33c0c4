//! Configuration Loader
//!
//! Reads the YAML configuration document, checks the required top-level
//! keys, expands `${VAR}` references in path values and produces an
//! immutable [`NowcastConfig`].

use super::error::{ConfigResult, ConfigurationError};
use super::{ConfigDocument, NowcastConfig, REQUIRED_KEYS};
use serde_yaml::Value as YamlValue;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Loads and validates nowcast configuration documents
pub struct ConfigManager;

impl ConfigManager {
    /// Load the configuration file at `path`
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Arc<NowcastConfig>> {
        let path = path.as_ref();
        let absolute = std::path::absolute(path).map_err(|e| ConfigurationError::UnresolvablePath {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let yaml_content = Self::read_config_file_safely(&absolute)?;
        let config = Self::from_yaml_str(&yaml_content, &absolute)?;

        debug!(
            "Configuration loaded: {}",
            serde_json::to_string_pretty(&Self::sanitize_config_for_logging(&config.raw))
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );
        info!(
            config_file = %absolute.display(),
            workers = config.msg_types().len(),
            run_types = ?config.run_types(),
            backend_port = config.backend_port(),
            "Configuration loaded successfully"
        );

        Ok(Arc::new(config))
    }

    /// Parse a configuration document held in memory
    ///
    /// `path` is recorded as the document's location; it is what launched
    /// workers receive as their first argument.
    pub fn from_yaml_str<P: AsRef<Path>>(yaml: &str, path: P) -> ConfigResult<NowcastConfig> {
        let path = path.as_ref();
        let file_label = path.display().to_string();

        let raw: YamlValue = serde_yaml::from_str(yaml)
            .map_err(|e| ConfigurationError::invalid_yaml(file_label.clone(), e))?;

        Self::validate_required_keys(&raw)?;

        let mut doc: ConfigDocument = serde_yaml::from_value(raw.clone()).map_err(|e| {
            ConfigurationError::invalid_yaml(
                file_label,
                format!("Failed to deserialize configuration: {e}"),
            )
        })?;

        Self::expand_environment_variables(&mut doc);
        Self::validate_document(&doc)?;

        Ok(NowcastConfig::from_parts(path.to_path_buf(), raw, doc))
    }

    /// Safely read a configuration file with a size limit
    fn read_config_file_safely(path: &Path) -> ConfigResult<String> {
        const MAX_CONFIG_FILE_SIZE: u64 = 10 * 1024 * 1024;

        let metadata = std::fs::metadata(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))?;

        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigurationError::invalid_value(
                "file_size",
                metadata.len().to_string(),
                format!(
                    "Configuration file too large ({}MB > {}MB limit)",
                    metadata.len() / (1024 * 1024),
                    MAX_CONFIG_FILE_SIZE / (1024 * 1024)
                ),
            ));
        }

        if !metadata.is_file() {
            return Err(ConfigurationError::invalid_value(
                "file_type",
                "directory or special file".to_string(),
                "Configuration path must point to a regular file",
            ));
        }

        std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))
    }

    fn validate_required_keys(raw: &YamlValue) -> ConfigResult<()> {
        let YamlValue::Mapping(map) = raw else {
            return Err(ConfigurationError::invalid_value(
                "document",
                "non-mapping",
                "Configuration document must be a mapping",
            ));
        };

        for key in REQUIRED_KEYS {
            if !map.contains_key(key) {
                return Err(ConfigurationError::missing_required_field(key, "top level"));
            }
        }

        if raw.get("ports").and_then(|ports| ports.get("backend")).is_none() {
            return Err(ConfigurationError::missing_required_field("backend", "ports"));
        }

        Ok(())
    }

    fn validate_document(doc: &ConfigDocument) -> ConfigResult<()> {
        if doc.checklist_file.as_os_str().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "checklist file",
                "",
                "Checklist file path cannot be empty",
            ));
        }

        if doc.msg_types.is_empty() {
            return Err(ConfigurationError::invalid_value(
                "msg_types",
                "{}",
                "At least one worker must declare message types",
            ));
        }

        if doc.workers.command.is_empty() {
            return Err(ConfigurationError::invalid_value(
                "workers.command",
                "[]",
                "Worker command template cannot be empty",
            ));
        }

        if doc.logging.backup_count == 0 {
            return Err(ConfigurationError::invalid_value(
                "logging.backup count",
                "0",
                "At least one rotated log file must be kept",
            ));
        }

        for run_type in &doc.run_types {
            if !matches!(run_type.as_str(), "nowcast" | "forecast" | "forecast2") {
                warn!("Unrecognized run type '{}' enabled in run_types", run_type);
            }
        }

        Ok(())
    }

    /// Expand `${VAR}` references in path-valued settings
    fn expand_environment_variables(doc: &mut ConfigDocument) {
        doc.checklist_file = PathBuf::from(expand_env_refs(&doc.checklist_file.to_string_lossy()));
        doc.logging.log_dir =
            PathBuf::from(expand_env_refs(&doc.logging.log_dir.to_string_lossy()));
        if let Some(page) = doc.publish.status_page.take() {
            doc.publish.status_page = Some(PathBuf::from(expand_env_refs(&page.to_string_lossy())));
        }
    }

    /// Mask sensitive fields (passwords, keys, tokens) before logging
    fn sanitize_config_for_logging(raw: &YamlValue) -> serde_json::Value {
        let mut config_json = serde_json::to_value(raw).unwrap_or(serde_json::Value::Null);
        let sensitive_patterns = ["password", "secret", "key", "token", "credential"];
        Self::sanitize_json_recursive(&mut config_json, &sensitive_patterns);
        config_json
    }

    fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    let is_sensitive = sensitive_patterns
                        .iter()
                        .any(|pattern| key_lower.contains(pattern));

                    if is_sensitive {
                        *val = serde_json::Value::String("[MASKED]".to_string());
                    } else {
                        Self::sanitize_json_recursive(val, sensitive_patterns);
                    }
                }
            }
            serde_json::Value::Array(arr) => {
                for item in arr.iter_mut() {
                    Self::sanitize_json_recursive(item, sensitive_patterns);
                }
            }
            _ => {}
        }
    }
}

/// Replace every `${NAME}` with the value of environment variable `NAME`
///
/// Unset variables are left in place and reported.
fn expand_env_refs(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var_name = &after[..end];
                match env::var(var_name) {
                    Ok(value) => {
                        debug!("Expanding environment variable {} in configuration", var_name);
                        output.push_str(&value);
                    }
                    Err(_) => {
                        warn!(
                            "Environment variable {} not found, keeping original value",
                            var_name
                        );
                        output.push_str(&rest[start..start + 2 + end + 1]);
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                output.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    output.push_str(rest);
    output
}
