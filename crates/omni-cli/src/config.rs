//! TOML configuration for the `omni` binary.
//!
//! ```toml
//! [engine]
//! max_parallel = 3
//! max_retries = 3
//! retry_delay_ms = 2000
//! continue_on_error = false
//!
//! [parser]
//! oracle_confidence_threshold = 0.5
//! oracle_timeout_ms = 5000
//!
//! [filesystem]
//! root = "."
//! sandbox = false
//! blocked_paths = ["/srv/backups"]
//! blocked_operations = ["filesystem:delete"]
//!
//! [history]
//! capacity = 1000
//! ```
//!
//! Every table and field is optional.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use omni_adapters::RulePermissionGate;
use omni_intent::history::DEFAULT_HISTORY_CAPACITY;
use omni_intent::{EngineConfig, ParserConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "omni.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OmniConfig {
    pub engine: EngineConfig,
    pub parser: ParserConfig,
    pub filesystem: FilesystemConfig,
    pub history: HistoryConfig,
}

/// The `[filesystem]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesystemConfig {
    /// Directory every action is confined to.
    pub root: PathBuf,
    /// Refuse delete-class actions.
    pub sandbox: bool,
    /// Path prefixes refused for every action.
    pub blocked_paths: Vec<String>,
    /// `"category:action"` pairs that are always refused.
    pub blocked_operations: Vec<String>,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            sandbox: false,
            blocked_paths: Vec::new(),
            blocked_operations: Vec::new(),
        }
    }
}

/// The `[history]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl OmniConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] when `path` is
    /// `None`.  An explicit path must exist; a missing default file yields
    /// the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !required && !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Build the permission gate described by `[filesystem]`.
    pub fn permission_gate(&self) -> RulePermissionGate {
        let fs = &self.filesystem;
        let gate = fs
            .blocked_paths
            .iter()
            .fold(RulePermissionGate::new().with_sandbox(fs.sandbox), |gate, p| {
                gate.block_path(p)
            });
        fs.blocked_operations
            .iter()
            .fold(gate, |gate, op| gate.block_operation(op.as_str()))
    }
}
