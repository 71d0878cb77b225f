//! Plugin runtime configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Plugin runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginSystemConfig {
    /// Directory holding per-server data exposed to plugins.
    #[serde(default = "default_data_directory")]
    pub data_dir: String,
    /// Optional per-handler timeout in milliseconds. Unset means no timeout.
    #[serde(default)]
    pub handler_timeout_ms: Option<u64>,
    /// Whether to install and enable built-in plugins on startup.
    #[serde(default = "default_true")]
    pub enable_built_ins: bool,
}

impl PluginSystemConfig {
    /// Returns the configured handler timeout as a `Duration`.
    pub fn handler_timeout(&self) -> Option<Duration> {
        self.handler_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for PluginSystemConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_directory(),
            handler_timeout_ms: None,
            enable_built_ins: true,
        }
    }
}

fn default_data_directory() -> String {
    "./data".to_string()
}

fn default_true() -> bool {
    true
}
