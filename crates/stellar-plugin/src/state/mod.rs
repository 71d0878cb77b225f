//! Persistent per-plugin state.

pub mod store;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PluginConfig;
use crate::manifest::PluginManifest;

pub use store::{InMemoryStateStore, PluginStateStore};

/// Lifecycle status of an installed plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginStatus {
    Installed,
    Enabled,
    Disabled,
    Error,
    Updating,
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Installed => "installed",
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Error => "error",
            Self::Updating => "updating",
        };
        write!(f, "{s}")
    }
}

/// What the host remembers about an installed plugin.
///
/// Status changes go through the transition methods so that `error` is set
/// exactly when the status is [`PluginStatus::Error`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginState {
    pub manifest: PluginManifest,
    status: PluginStatus,
    pub is_built_in: bool,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    error: Option<String>,
    /// Effective config: defaults overlaid with user overrides.
    pub config: PluginConfig,
}

impl PluginState {
    /// A freshly installed plugin.
    pub fn installed(manifest: PluginManifest, config: PluginConfig, is_built_in: bool) -> Self {
        let now = Utc::now();
        Self {
            manifest,
            status: PluginStatus::Installed,
            is_built_in,
            installed_at: now,
            updated_at: now,
            error: None,
            config,
        }
    }

    pub fn id(&self) -> &str {
        &self.manifest.id
    }

    pub fn status(&self) -> PluginStatus {
        self.status
    }

    /// Error message; present only in [`PluginStatus::Error`].
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn mark_installed(&mut self) {
        self.transition(PluginStatus::Installed, None);
    }

    pub fn mark_enabled(&mut self) {
        self.transition(PluginStatus::Enabled, None);
    }

    pub fn mark_disabled(&mut self) {
        self.transition(PluginStatus::Disabled, None);
    }

    pub fn mark_updating(&mut self) {
        self.transition(PluginStatus::Updating, None);
    }

    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.transition(PluginStatus::Error, Some(message.into()));
    }

    /// Replaces the effective config.
    pub fn set_config(&mut self, config: PluginConfig) {
        self.config = config;
        self.updated_at = Utc::now();
    }

    /// Replaces the manifest after an update.
    pub fn set_manifest(&mut self, manifest: PluginManifest) {
        self.manifest = manifest;
        self.updated_at = Utc::now();
    }

    fn transition(&mut self, status: PluginStatus, error: Option<String>) {
        self.status = status;
        self.error = error;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestBuilder;

    fn state() -> PluginState {
        PluginState::installed(
            ManifestBuilder::new("motd", "MOTD", "1.0.0").build(),
            PluginConfig::new(),
            true,
        )
    }

    #[test]
    fn test_error_only_in_error_status() {
        let mut state = state();
        assert_eq!(state.status(), PluginStatus::Installed);
        assert!(state.error().is_none());

        state.mark_error("on_enable failed");
        assert_eq!(state.status(), PluginStatus::Error);
        assert_eq!(state.error(), Some("on_enable failed"));

        state.mark_enabled();
        assert_eq!(state.status(), PluginStatus::Enabled);
        assert!(state.error().is_none());
    }

    #[test]
    fn test_transitions_bump_updated_at() {
        let mut state = state();
        let before = state.updated_at;
        state.mark_disabled();
        assert!(state.updated_at >= before);
        assert_eq!(state.installed_at, before);
    }

    #[test]
    fn test_serializes_status_lowercase() {
        let value = serde_json::to_value(state()).unwrap();
        assert_eq!(value["status"], "installed");
        assert_eq!(value["isBuiltIn"], true);
        assert_eq!(value["manifest"]["id"], "motd");
    }
}
