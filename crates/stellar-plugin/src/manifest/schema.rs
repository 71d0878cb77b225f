//! Typed plugin manifest and its builder.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigSchema, PluginConfig};
use crate::hooks::PluginHookEvent;

use super::validator::{ManifestDocument, ManifestValidationError};

/// Marketplace category of a plugin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginCategory {
    ServerManagement,
    Monitoring,
    Automation,
    Integration,
    Utility,
    GameSpecific,
    Security,
    #[default]
    Other,
}

impl PluginCategory {
    /// All categories.
    pub const ALL: [PluginCategory; 8] = [
        Self::ServerManagement,
        Self::Monitoring,
        Self::Automation,
        Self::Integration,
        Self::Utility,
        Self::GameSpecific,
        Self::Security,
        Self::Other,
    ];

    /// Returns the wire name of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServerManagement => "server-management",
            Self::Monitoring => "monitoring",
            Self::Automation => "automation",
            Self::Integration => "integration",
            Self::Utility => "utility",
            Self::GameSpecific => "game-specific",
            Self::Security => "security",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for PluginCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PluginCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category '{s}'"))
    }
}

/// Reference to a host-side UI component a plugin contributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiComponentRef {
    /// Identifier unique within the plugin.
    pub id: String,
    /// Title shown by the host.
    pub title: String,
    /// Component reference resolved by the host.
    pub component: String,
    /// Optional icon name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// UI surfaces a manifest declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiDeclarations {
    #[serde(default)]
    pub server_tabs: Vec<UiComponentRef>,
    #[serde(default)]
    pub admin_pages: Vec<UiComponentRef>,
    #[serde(default)]
    pub server_widgets: Vec<UiComponentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_panel: Option<UiComponentRef>,
}

impl UiDeclarations {
    /// Iterates over every declared component reference with its group name.
    pub fn components(&self) -> impl Iterator<Item = (&'static str, &UiComponentRef)> {
        self.server_tabs
            .iter()
            .map(|c| ("serverTabs", c))
            .chain(self.admin_pages.iter().map(|c| ("adminPages", c)))
            .chain(self.server_widgets.iter().map(|c| ("serverWidgets", c)))
            .chain(self.settings_panel.iter().map(|c| ("settingsPanel", c)))
    }
}

/// A validated, normalized plugin manifest.
///
/// Obtain one through [`validate_manifest`](super::validate_manifest) or
/// [`ManifestBuilder`]; built manifests still go through
/// [`PluginManifest::validate`] when installed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub license: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,
    pub category: PluginCategory,
    pub game_types: Vec<String>,
    pub permissions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui: Option<UiDeclarations>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_schema: Option<ConfigSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_config: Option<PluginConfig>,
    /// Events the plugin declares interest in. Informational only.
    pub hooks: Vec<PluginHookEvent>,
}

impl PluginManifest {
    /// Re-runs every manifest rule against this manifest.
    pub fn validate(&self) -> Result<(), ManifestValidationError> {
        let violations = ManifestDocument::from(self).violations().0;
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ManifestValidationError::new(violations))
        }
    }

    /// Config a fresh install starts from: schema defaults overlaid with
    /// `defaultConfig`.
    pub fn initial_config(&self) -> PluginConfig {
        let mut config = self
            .config_schema
            .as_ref()
            .map(ConfigSchema::defaults)
            .unwrap_or_default();
        if let Some(defaults) = &self.default_config {
            config.merge(defaults);
        }
        config
    }

    /// Whether the plugin applies to servers of `game_type`.
    pub fn supports_game(&self, game_type: &str) -> bool {
        self.game_types
            .iter()
            .any(|g| g == "*" || g.eq_ignore_ascii_case(game_type))
    }

    /// Whether the manifest requests `permission`.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// Builder for manifests of plugins compiled into the host.
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    manifest: PluginManifest,
}

impl ManifestBuilder {
    /// Creates a builder with every optional field at its default.
    pub fn new(id: &str, name: &str, version: &str) -> Self {
        Self {
            manifest: PluginManifest {
                id: id.to_string(),
                name: name.to_string(),
                version: version.to_string(),
                description: name.to_string(),
                author: "Unknown".to_string(),
                license: "MIT".to_string(),
                homepage: None,
                repository: None,
                icon: None,
                min_version: None,
                category: PluginCategory::Other,
                game_types: vec!["*".to_string()],
                permissions: Vec::new(),
                ui: None,
                config_schema: None,
                default_config: None,
                hooks: Vec::new(),
            },
        }
    }

    /// Sets the description (defaults to the name).
    pub fn description(mut self, description: &str) -> Self {
        self.manifest.description = description.to_string();
        self
    }

    /// Sets the author.
    pub fn author(mut self, author: &str) -> Self {
        self.manifest.author = author.to_string();
        self
    }

    /// Sets the license identifier (defaults to `MIT`).
    pub fn license(mut self, license: &str) -> Self {
        self.manifest.license = license.to_string();
        self
    }

    /// Sets the homepage URL.
    pub fn homepage(mut self, homepage: &str) -> Self {
        self.manifest.homepage = Some(homepage.to_string());
        self
    }

    /// Sets the icon name.
    pub fn icon(mut self, icon: &str) -> Self {
        self.manifest.icon = Some(icon.to_string());
        self
    }

    /// Sets the minimum host version.
    pub fn min_version(mut self, min_version: &str) -> Self {
        self.manifest.min_version = Some(min_version.to_string());
        self
    }

    /// Sets the category (defaults to `other`).
    pub fn category(mut self, category: PluginCategory) -> Self {
        self.manifest.category = category;
        self
    }

    /// Replaces the default `["*"]` game types.
    pub fn game_types(mut self, game_types: &[&str]) -> Self {
        self.manifest.game_types = game_types.iter().map(|g| g.to_string()).collect();
        self
    }

    /// Requests one API permission.
    pub fn permission(mut self, permission: &str) -> Self {
        self.manifest.permissions.push(permission.to_string());
        self
    }

    /// Declares a hook the plugin listens to.
    pub fn hook(mut self, event: PluginHookEvent) -> Self {
        self.manifest.hooks.push(event);
        self
    }

    /// Sets the external UI component declarations.
    pub fn ui(mut self, ui: UiDeclarations) -> Self {
        self.manifest.ui = Some(ui);
        self
    }

    /// Sets the config schema.
    pub fn config_schema(mut self, schema: ConfigSchema) -> Self {
        self.manifest.config_schema = Some(schema);
        self
    }

    /// Sets config defaults layered over the schema defaults.
    pub fn default_config(mut self, config: PluginConfig) -> Self {
        self.manifest.default_config = Some(config);
        self
    }

    /// Builds the manifest without validating it.
    pub fn build(self) -> PluginManifest {
        self.manifest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let manifest = ManifestBuilder::new("motd", "MOTD", "1.0.0").build();
        assert_eq!(manifest.description, "MOTD");
        assert_eq!(manifest.license, "MIT");
        assert_eq!(manifest.category, PluginCategory::Other);
        assert_eq!(manifest.game_types, vec!["*".to_string()]);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_builder_setters() {
        let manifest = ManifestBuilder::new("motd", "MOTD", "1.0.0")
            .description("Message of the day")
            .author("Stellar Team")
            .license("Apache-2.0")
            .category(PluginCategory::ServerManagement)
            .game_types(&["minecraft"])
            .permission("servers:read")
            .hook(PluginHookEvent::ServerAfterStart)
            .build();

        assert_eq!(manifest.author, "Stellar Team");
        assert_eq!(manifest.license, "Apache-2.0");
        assert!(manifest.supports_game("minecraft"));
        assert!(!manifest.supports_game("rust"));
        assert!(manifest.has_permission("servers:read"));
        assert_eq!(manifest.hooks, vec![PluginHookEvent::ServerAfterStart]);
    }
}
