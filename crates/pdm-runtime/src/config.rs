#![forbid(unsafe_code)]

//! Runtime configuration as data.
//!
//! [`RuntimeConfig`] gathers the tunables of the runtime so a host can load
//! them from TOML or JSON at startup.
//!
//! ```toml
//! [history]
//! max_depth = 200
//! max_bytes = 0
//!
//! [undo]
//! enabled = true
//! disabled_kinds = ["add_item"]
//!
//! [logging]
//! filter = "pdm=debug"
//! format = "json"
//! ```
//!
//! Every field has a default equal to the hard-coded component default, so
//! an empty file yields `RuntimeConfig::default()`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::command::CommandKind;
use crate::history::HistoryConfig;
use crate::manager::CommandManager;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub history: HistoryPolicy,
    pub undo: UndoPolicy,
    pub logging: LoggingPolicy,
}

/// Undo history limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryPolicy {
    /// Maximum undo entries.
    pub max_depth: usize,
    /// Byte budget over both stacks (0 = unlimited).
    pub max_bytes: usize,
}

impl Default for HistoryPolicy {
    fn default() -> Self {
        let defaults = HistoryConfig::default();
        Self {
            max_depth: defaults.max_depth,
            max_bytes: defaults.max_bytes,
        }
    }
}

/// Which commands are recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndoPolicy {
    pub enabled: bool,
    /// Kinds that run without being recorded.
    pub disabled_kinds: Vec<CommandKind>,
}

impl Default for UndoPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            disabled_kinds: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingPolicy {
    /// `EnvFilter` directives, used when `PDM_LOG` is unset.
    pub filter: String,
    pub format: LogFormat,
    /// Include the event target in text output.
    pub with_target: bool,
}

impl Default for LoggingPolicy {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
            with_target: true,
        }
    }
}

impl RuntimeConfig {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::TomlWrite)
    }

    /// Problems with the values. Empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.history.max_depth == 0 {
            errors.push("history.max_depth must be > 0".into());
        }

        let mut seen = Vec::new();
        for kind in &self.undo.disabled_kinds {
            if seen.contains(kind) {
                errors.push(format!("undo.disabled_kinds lists {kind:?} twice"));
            }
            seen.push(*kind);
        }

        if self.logging.filter.trim().is_empty() {
            errors.push("logging.filter must not be empty".into());
        }

        errors
    }

    /// Like [`Self::validate`], but as a `Result`.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    #[must_use]
    pub fn to_history_config(&self) -> HistoryConfig {
        HistoryConfig::new(self.history.max_depth, self.history.max_bytes)
    }

    /// Apply the undo policy to `manager`.
    pub fn apply_undo_policy(&self, manager: &mut CommandManager) {
        manager.set_undo_enabled(self.undo.enabled);
        for kind in &self.undo.disabled_kinds {
            manager.set_undo_enabled_for(*kind, false);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[source] toml::de::Error),
    #[error("TOML write error: {0}")]
    TomlWrite(#[source] toml::ser::Error),
    #[error("JSON parse error: {0}")]
    Json(#[source] serde_json::Error),
    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}
