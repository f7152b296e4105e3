//! Configuration store for Enigma.
//!
//! A YAML document is loaded once, every leaf is overlaid with an environment
//! variable derived from its dot-path, and the resolved tree is read-only for
//! the rest of the process. Components receive the [`Config`] by reference.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Default location of the configuration document.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// Errors that can occur during configuration loading and lookup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("Configuration file not found: {}", .0.display())]
    Missing(PathBuf),

    /// Failed to read configuration file.
    #[error("Failed to read configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// A required key is absent.
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// A key is present but has the wrong shape.
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Resolved, read-only configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    root: Value,
    source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self { root: Value::Object(serde_json::Map::new()), source: None }
    }
}

impl Config {
    /// Loads `path` and overlays the process environment.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Loads `path` and overlays values returned by `lookup`.
    pub fn load_with_env(path: &Path, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;

        let mut config = Self::from_yaml_str_with_env(&content, lookup)?;
        config.source = Some(path.to_path_buf());
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Parses a YAML document without any environment overlay.
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        Self::from_yaml_str_with_env(content, |_| None)
    }

    /// Parses a YAML document and overlays values returned by `lookup`.
    pub fn from_yaml_str_with_env(
        content: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<Self> {
        let parsed: Value =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let root = match parsed {
            Value::Null => Value::Object(serde_json::Map::new()),
            Value::Object(map) => Value::Object(overlay(map, "", &lookup)),
            other => {
                return Err(ConfigError::Parse(format!(
                    "configuration root must be a mapping, found {other}"
                )));
            }
        };
        Ok(Self { root, source: None })
    }

    /// Wraps an already-resolved tree. No overlay is applied.
    #[must_use]
    pub fn from_value(root: Value) -> Self {
        Self { root, source: None }
    }

    /// File the configuration was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Environment variable that overrides `path`: `model.lr_params.C` → `MODEL_LR_PARAMS_C`.
    #[must_use]
    pub fn env_key(path: &str) -> String {
        path.to_uppercase().replace('.', "_")
    }

    /// Navigates a dot-path. Any missing segment yields `None`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(&self.root, |node, segment| node.as_object()?.get(segment))
    }

    /// Like [`Config::get`] but returns `default` for missing keys.
    pub fn get_or(&self, path: &str, default: Value) -> Value {
        self.get(path).cloned().unwrap_or(default)
    }

    /// Decodes the value at `path`; `Ok(None)` if absent or null.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> ConfigResult<Option<T>> {
        match self.get(path) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|e| {
                ConfigError::InvalidValue { key: path.to_string(), message: e.to_string() }
            }),
        }
    }

    /// Decodes the value at `path`, falling back to `default` if absent.
    pub fn get_as_or<T: DeserializeOwned>(&self, path: &str, default: T) -> ConfigResult<T> {
        Ok(self.get_as(path)?.unwrap_or(default))
    }

    /// Decodes a key that must be present.
    pub fn require<T: DeserializeOwned>(&self, path: &str) -> ConfigResult<T> {
        self.get_as(path)?.ok_or_else(|| ConfigError::MissingKey(path.to_string()))
    }
}

fn overlay(
    map: serde_json::Map<String, Value>,
    prefix: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> serde_json::Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| {
            let env_key = Config::env_key(&format!("{prefix}{key}"));
            let resolved = match value {
                Value::Object(inner) => Value::Object(overlay(inner, &format!("{env_key}_"), lookup)),
                leaf => match lookup(&env_key) {
                    Some(raw) => {
                        debug!(env_key = %env_key, "Applying environment override");
                        parse_override(raw)
                    }
                    None => leaf,
                },
            };
            (key, resolved)
        })
        .collect()
}

/// Reads an override as a YAML scalar or sequence; anything else stays a string.
fn parse_override(raw: String) -> Value {
    if raw.trim().is_empty() {
        return Value::String(raw);
    }
    match serde_yaml::from_str::<Value>(&raw) {
        Ok(Value::Object(_)) | Err(_) => Value::String(raw),
        Ok(value) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    const DOC: &str = r"
data:
  features: [hour, ip_freq]
  label_col: is_threat
  test_size: 0.2
model:
  lr_params:
    C: 1.0
preprocess:
  dropna: false
";

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn test_env_key() {
        assert_eq!(Config::env_key("data.features"), "DATA_FEATURES");
        assert_eq!(Config::env_key("model.lr_params.C"), "MODEL_LR_PARAMS_C");
    }

    #[test]
    fn test_get_dot_path() {
        let config = Config::from_yaml_str(DOC).unwrap();
        assert_eq!(config.get("data.label_col"), Some(&Value::from("is_threat")));
        assert_eq!(config.get("data.missing.deeper"), None);
        assert_eq!(config.get("data.label_col.more"), None);
        assert_eq!(config.get_or("server.port", Value::from(8000)), Value::from(8000));
    }

    #[test]
    fn test_typed_access() {
        let config = Config::from_yaml_str(DOC).unwrap();
        let features: Vec<String> = config.require("data.features").unwrap();
        assert_eq!(features, vec!["hour", "ip_freq"]);
        assert!((config.get_as_or::<f64>("data.val_size", 0.1).unwrap() - 0.1).abs() < f64::EPSILON);
        assert!(matches!(config.require::<String>("data.nope"), Err(ConfigError::MissingKey(_))));
        assert!(matches!(
            config.require::<u32>("data.label_col"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_env_overrides_leaves() {
        let vars = env(&[
            ("DATA_TEST_SIZE", "0.3"),
            ("MODEL_LR_PARAMS_C", "0.5"),
            ("PREPROCESS_DROPNA", "true"),
            ("DATA_FEATURES", "[a, b, c]"),
        ]);
        let config = Config::from_yaml_str_with_env(DOC, |k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.get("data.test_size"), Some(&Value::from(0.3)));
        assert_eq!(config.get("model.lr_params.C"), Some(&Value::from(0.5)));
        assert_eq!(config.get("preprocess.dropna"), Some(&Value::Bool(true)));
        let features: Vec<String> = config.require("data.features").unwrap();
        assert_eq!(features, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_env_does_not_add_keys() {
        let vars = env(&[("DATA_NEW_KEY", "x")]);
        let config = Config::from_yaml_str_with_env(DOC, |k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.get("data.new_key"), None);
    }

    #[test]
    fn test_env_override_non_scalar_stays_string() {
        let vars = env(&[("DATA_LABEL_COL", "a: b"), ("DATA_TEST_SIZE", "")]);
        let config = Config::from_yaml_str_with_env(DOC, |k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.get("data.label_col"), Some(&Value::from("a: b")));
        assert_eq!(config.get("data.test_size"), Some(&Value::from("")));
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = Config::load(&temp.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_load_from_file_records_source() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, DOC).unwrap();

        let config = Config::load_with_env(&path, |_| None).unwrap();
        assert_eq!(config.source(), Some(path.as_path()));
    }

    #[test]
    fn test_empty_document_is_empty_mapping() {
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config.get("anything"), None);
    }

    #[test]
    fn test_scalar_root_rejected() {
        assert!(matches!(Config::from_yaml_str("42"), Err(ConfigError::Parse(_))));
    }
}
