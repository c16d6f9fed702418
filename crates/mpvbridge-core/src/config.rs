use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::Format;

/// Hard upper bound on command arguments.
pub const MAX_COMMAND_ARGS: usize = 128;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read bridge config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid bridge config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedProperty {
    pub name: String,
    #[serde(default = "default_observe_format")]
    pub format: Format,
}

impl ObservedProperty {
    pub fn new(name: impl Into<String>, format: Format) -> Self {
        Self { name: name.into(), format }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Minimum engine log level forwarded to the sink ("no", "fatal", ..., "trace").
    pub engine_log_level: String,
    /// Clamped to `1..=MAX_COMMAND_ARGS`.
    pub max_command_args: usize,
    pub dispatch_thread_name: String,
    pub dispatch_stack_size: Option<usize>,
    pub normalize_numeric_locale: bool,
    /// Engine options applied right after the instance is created.
    pub options: BTreeMap<String, String>,
    /// Properties observed as soon as the instance is running.
    pub observe: Vec<ObservedProperty>,
}

fn default_engine_log_level() -> String {
    "v".to_string()
}

fn default_dispatch_thread_name() -> String {
    "mpv-dispatch".to_string()
}

fn default_observe_format() -> Format {
    Format::String
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            engine_log_level: default_engine_log_level(),
            max_command_args: MAX_COMMAND_ARGS,
            dispatch_thread_name: default_dispatch_thread_name(),
            dispatch_stack_size: None,
            normalize_numeric_locale: true,
            options: BTreeMap::new(),
            observe: Vec::new(),
        }
    }
}

impl BridgeConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_json_str(&text)
    }

    #[inline]
    pub fn effective_max_command_args(&self) -> usize {
        self.max_command_args.clamp(1, MAX_COMMAND_ARGS)
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    pub fn with_observed(mut self, name: impl Into<String>, format: Format) -> Self {
        self.observe.push(ObservedProperty::new(name, format));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let cfg = BridgeConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, BridgeConfig::default());
        assert_eq!(cfg.engine_log_level, "v");
        assert_eq!(cfg.dispatch_thread_name, "mpv-dispatch");
        assert_eq!(cfg.effective_max_command_args(), 128);
    }

    #[test]
    fn parses_options_and_observers() {
        let cfg = BridgeConfig::from_json_str(
            r#"{
                "engine_log_level": "warn",
                "max_command_args": 4096,
                "options": { "vo": "null", "hwdec": "auto" },
                "observe": [ { "name": "pause", "format": "flag" }, { "name": "path" } ]
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.engine_log_level, "warn");
        assert_eq!(cfg.effective_max_command_args(), MAX_COMMAND_ARGS);
        assert_eq!(cfg.options.get("vo").map(String::as_str), Some("null"));
        assert_eq!(cfg.observe[0], ObservedProperty::new("pause", Format::Flag));
        assert_eq!(cfg.observe[1].format, Format::String);
    }

    #[test]
    fn zero_argument_limit_is_clamped() {
        let cfg = BridgeConfig { max_command_args: 0, ..BridgeConfig::default() };
        assert_eq!(cfg.effective_max_command_args(), 1);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = BridgeConfig::from_json_file("/nonexistent/mpvbridge.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/mpvbridge.json"));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(BridgeConfig::from_json_str("{ nope"), Err(ConfigError::Parse(_))));
    }
}
