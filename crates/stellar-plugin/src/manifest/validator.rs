//! Manifest validation.
//!
//! Raw manifests are deserialized leniently into [`ManifestDocument`] so that
//! a single pass can report every broken field instead of stopping at the
//! first one. Field-level rules are declared with `validator`; rules spanning
//! enums, event names and the config schema are checked by hand.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use stellar_core::AppError;

use crate::config::{ConfigSchema, PluginConfig};
use crate::hooks::PluginHookEvent;

use super::schema::{PluginCategory, PluginManifest, UiDeclarations};

/// Lowercase letters, digits and hyphens, not starting with a hyphen.
pub static PLUGIN_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").expect("plugin id pattern compiles"));

/// `MAJOR.MINOR.PATCH` with an optional `-prerelease` suffix.
pub static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+\.\d+\.\d+(-[0-9A-Za-z.-]+)?$").expect("version pattern compiles")
});

/// One broken manifest field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestViolation {
    /// camelCase path of the field, e.g. `version` or `hooks[2]`.
    pub field: String,
    /// Machine-readable rule name.
    pub code: String,
    /// Human-readable explanation.
    pub message: String,
}

impl ManifestViolation {
    fn new(field: impl Into<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// A manifest was rejected. Lists every violated field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid plugin manifest: {}", summarize(.violations))]
pub struct ManifestValidationError {
    pub violations: Vec<ManifestViolation>,
}

impl ManifestValidationError {
    pub(crate) fn new(violations: Vec<ManifestViolation>) -> Self {
        Self { violations }
    }

    /// Returns whether `field` is among the violations.
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl From<ManifestValidationError> for AppError {
    fn from(err: ManifestValidationError) -> Self {
        AppError::with_source(
            stellar_core::error::ErrorKind::Validation,
            err.to_string(),
            err,
        )
    }
}

fn summarize(violations: &[ManifestViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{} ({})", v.field, v.message))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Lenient wire shape of a manifest.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ManifestDocument {
    #[serde(default)]
    #[validate(
        length(min = 2, max = 64, message = "must be 2 to 64 characters"),
        regex(
            path = *PLUGIN_ID_PATTERN,
            message = "must contain only lowercase letters, digits and hyphens"
        )
    )]
    pub id: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(regex(path = *VERSION_PATTERN, message = "must be a semantic version like 1.2.3"))]
    pub version: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 500, message = "must be 1 to 500 characters"))]
    pub description: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub author: String,

    #[validate(length(min = 1, max = 64, message = "must be 1 to 64 characters"))]
    pub license: Option<String>,

    #[validate(url(message = "must be a valid URL"))]
    pub homepage: Option<String>,

    #[validate(url(message = "must be a valid URL"))]
    pub repository: Option<String>,

    pub icon: Option<String>,

    #[validate(regex(path = *VERSION_PATTERN, message = "must be a semantic version like 1.2.3"))]
    pub min_version: Option<String>,

    pub category: Option<String>,

    pub game_types: Option<Vec<String>>,

    pub permissions: Option<Vec<String>>,

    pub ui: Option<UiDeclarations>,

    pub config_schema: Option<Value>,

    pub default_config: Option<Map<String, Value>>,

    pub hooks: Option<Vec<String>>,
}

/// Validates a raw manifest document and applies defaults.
pub fn validate_manifest(raw: &Value) -> Result<PluginManifest, ManifestValidationError> {
    let document: ManifestDocument = serde_json::from_value(raw.clone()).map_err(|e| {
        ManifestValidationError::new(vec![ManifestViolation::new(
            "$document",
            "type",
            format!("manifest is not well-formed: {e}"),
        )])
    })?;

    document.into_manifest()
}

/// Values parsed while checking, reused to build the manifest.
#[derive(Debug, Default)]
pub(crate) struct Parsed {
    category: PluginCategory,
    hooks: Vec<PluginHookEvent>,
    config_schema: Option<ConfigSchema>,
}

impl ManifestDocument {
    /// Converts into a typed manifest if no rule is broken.
    pub fn into_manifest(self) -> Result<PluginManifest, ManifestValidationError> {
        let (violations, parsed) = self.violations();
        if !violations.is_empty() {
            return Err(ManifestValidationError::new(violations));
        }

        Ok(PluginManifest {
            id: self.id,
            name: self.name,
            version: self.version,
            description: self.description,
            author: self.author,
            license: self.license.unwrap_or_else(|| "MIT".to_string()),
            homepage: self.homepage,
            repository: self.repository,
            icon: self.icon,
            min_version: self.min_version,
            category: parsed.category,
            game_types: self.game_types.unwrap_or_else(|| vec!["*".to_string()]),
            permissions: self.permissions.unwrap_or_default(),
            ui: self.ui,
            config_schema: parsed.config_schema,
            default_config: self.default_config.map(PluginConfig::from),
            hooks: parsed.hooks,
        })
    }

    /// Runs every rule, returning all violations sorted by field.
    pub(crate) fn violations(&self) -> (Vec<ManifestViolation>, Parsed) {
        let mut violations = Vec::new();
        let mut parsed = Parsed::default();

        if let Err(errors) = self.validate() {
            for (field, errs) in errors.field_errors() {
                for err in errs.iter() {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed '{}' check", err.code));
                    violations.push(ManifestViolation::new(
                        camel_case(&field),
                        &err.code,
                        message,
                    ));
                }
            }
        }

        if let Some(category) = &self.category {
            match category.parse::<PluginCategory>() {
                Ok(c) => parsed.category = c,
                Err(_) => violations.push(ManifestViolation::new(
                    "category",
                    "enum",
                    format!(
                        "must be one of: {}",
                        PluginCategory::ALL
                            .iter()
                            .map(PluginCategory::as_str)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                )),
            }
        }

        if let Some(game_types) = &self.game_types {
            if game_types.is_empty() {
                violations.push(ManifestViolation::new(
                    "gameTypes",
                    "length",
                    "must list at least one game type",
                ));
            }
            for (i, game) in game_types.iter().enumerate() {
                if game.trim().is_empty() {
                    violations.push(ManifestViolation::new(
                        format!("gameTypes[{i}]"),
                        "length",
                        "must not be empty",
                    ));
                }
            }
        }

        if let Some(permissions) = &self.permissions {
            for (i, permission) in permissions.iter().enumerate() {
                if permission.trim().is_empty() {
                    violations.push(ManifestViolation::new(
                        format!("permissions[{i}]"),
                        "length",
                        "must not be empty",
                    ));
                }
            }
        }

        if let Some(hooks) = &self.hooks {
            for (i, name) in hooks.iter().enumerate() {
                match name.parse::<PluginHookEvent>() {
                    Ok(event) => parsed.hooks.push(event),
                    Err(e) => violations.push(ManifestViolation::new(
                        format!("hooks[{i}]"),
                        "enum",
                        e.to_string(),
                    )),
                }
            }
        }

        if let Some(ui) = &self.ui {
            let mut seen = std::collections::HashSet::new();
            for (group, component) in ui.components() {
                if component.id.trim().is_empty() || component.component.trim().is_empty() {
                    violations.push(ManifestViolation::new(
                        format!("ui.{group}"),
                        "required",
                        "component references need an id and a component",
                    ));
                } else if !seen.insert(component.id.as_str()) {
                    violations.push(ManifestViolation::new(
                        format!("ui.{group}"),
                        "unique",
                        format!("duplicate component id '{}'", component.id),
                    ));
                }
            }
        }

        if let Some(raw_schema) = &self.config_schema {
            match ConfigSchema::parse(raw_schema) {
                Ok(schema) => {
                    if let Some(defaults) = &self.default_config {
                        let mut candidate = schema.defaults();
                        candidate.merge(&PluginConfig::from(defaults.clone()));
                        if let Err(config_violations) = schema.validate(&candidate) {
                            for v in config_violations {
                                violations.push(ManifestViolation::new(
                                    format!("defaultConfig.{}", v.key),
                                    "config",
                                    v.message,
                                ));
                            }
                        }
                    }
                    parsed.config_schema = Some(schema);
                }
                Err(message) => {
                    violations.push(ManifestViolation::new("configSchema", "schema", message));
                }
            }
        }

        violations.sort_by(|a, b| a.field.cmp(&b.field));
        (violations, parsed)
    }
}

impl From<&PluginManifest> for ManifestDocument {
    fn from(manifest: &PluginManifest) -> Self {
        Self {
            id: manifest.id.clone(),
            name: manifest.name.clone(),
            version: manifest.version.clone(),
            description: manifest.description.clone(),
            author: manifest.author.clone(),
            license: Some(manifest.license.clone()),
            homepage: manifest.homepage.clone(),
            repository: manifest.repository.clone(),
            icon: manifest.icon.clone(),
            min_version: manifest.min_version.clone(),
            category: Some(manifest.category.as_str().to_string()),
            game_types: Some(manifest.game_types.clone()),
            permissions: Some(manifest.permissions.clone()),
            ui: manifest.ui.clone(),
            config_schema: manifest
                .config_schema
                .as_ref()
                .and_then(|s| serde_json::to_value(s).ok()),
            default_config: manifest
                .default_config
                .as_ref()
                .map(|c| c.as_map().clone()),
            hooks: Some(
                manifest
                    .hooks
                    .iter()
                    .map(|h| h.as_str().to_string())
                    .collect(),
            ),
        }
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn base() -> Value {
        json!({
            "id": "my-plugin",
            "name": "My Plugin",
            "version": "1.2.3",
            "description": "Does useful things",
            "author": "Stellar Team"
        })
    }

    fn with(field: &str, value: Value) -> Value {
        let mut doc = base();
        doc[field] = value;
        doc
    }

    #[test]
    fn test_minimal_manifest_gets_defaults() {
        let manifest = validate_manifest(&base()).expect("valid");
        assert_eq!(manifest.id, "my-plugin");
        assert_eq!(manifest.license, "MIT");
        assert_eq!(manifest.category, PluginCategory::Other);
        assert_eq!(manifest.game_types, vec!["*".to_string()]);
        assert!(manifest.permissions.is_empty());
        assert!(manifest.hooks.is_empty());
        assert!(manifest.config_schema.is_none());
    }

    #[test]
    fn test_uppercase_id_is_rejected() {
        let err = validate_manifest(&with("id", json!("My-Plugin"))).unwrap_err();
        assert!(err.has_field("id"));
        assert_eq!(err.violations.len(), 1);
    }

    #[test]
    fn test_id_rejects_leading_hyphen_and_symbols() {
        assert!(validate_manifest(&with("id", json!("-plugin"))).is_err());
        assert!(validate_manifest(&with("id", json!("my_plugin"))).is_err());
        assert!(validate_manifest(&with("id", json!("x"))).is_err());
        assert!(validate_manifest(&with("id", json!("plugin-2"))).is_ok());
    }

    #[test]
    fn test_version_patterns() {
        assert!(validate_manifest(&with("version", json!("1.2"))).is_err());
        assert!(validate_manifest(&with("version", json!("v1.2.3"))).is_err());
        assert!(validate_manifest(&with("version", json!("1.2.3"))).is_ok());
        assert!(validate_manifest(&with("version", json!("1.2.3-beta"))).is_ok());
        assert!(validate_manifest(&with("version", json!("1.2.3-rc.1"))).is_ok());
    }

    #[test]
    fn test_every_violation_is_listed() {
        let doc = json!({
            "id": "Bad Id",
            "name": "",
            "version": "1",
            "description": "ok",
            "author": "me",
            "category": "games",
            "hooks": ["server:afterStart", "server:exploded"],
            "homepage": "not a url"
        });
        let err = validate_manifest(&doc).unwrap_err();
        let fields: Vec<&str> = err.violations.iter().map(|v| v.field.as_str()).collect();
        for expected in ["category", "homepage", "hooks[1]", "id", "name", "version"] {
            assert!(fields.contains(&expected), "missing {expected} in {fields:?}");
        }
        assert!(!fields.contains(&"hooks[0]"));
        assert!(err.to_string().starts_with("invalid plugin manifest:"));
    }

    #[test]
    fn test_missing_required_fields() {
        let err = validate_manifest(&json!({})).unwrap_err();
        for field in ["author", "description", "id", "name", "version"] {
            assert!(err.has_field(field), "missing {field}");
        }
    }

    #[test]
    fn test_type_mismatch_is_a_document_violation() {
        let err = validate_manifest(&with("gameTypes", json!("minecraft"))).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].field, "$document");
    }

    #[test]
    fn test_min_version_reports_camel_case_field() {
        let err = validate_manifest(&with("minVersion", json!("latest"))).unwrap_err();
        assert!(err.has_field("minVersion"));
    }

    #[test]
    fn test_category_and_hooks_are_parsed() {
        let mut doc = with("category", json!("monitoring"));
        doc["hooks"] = json!(["server:console", "plugin:configUpdated"]);
        doc["gameTypes"] = json!(["minecraft", "rust"]);
        let manifest = validate_manifest(&doc).expect("valid");
        assert_eq!(manifest.category, PluginCategory::Monitoring);
        assert_eq!(
            manifest.hooks,
            vec![
                PluginHookEvent::ServerConsole,
                PluginHookEvent::PluginConfigUpdated
            ]
        );
        assert!(manifest.supports_game("Minecraft"));
        assert!(!manifest.supports_game("valheim"));
    }

    #[test]
    fn test_default_config_checked_against_schema() {
        let mut doc = with(
            "configSchema",
            json!({
                "type": "object",
                "properties": {
                    "interval": {"type": "integer", "minimum": 10, "default": 60},
                    "message": {"type": "string"}
                }
            }),
        );
        doc["defaultConfig"] = json!({"interval": 1});
        let err = validate_manifest(&doc).unwrap_err();
        assert!(err.has_field("defaultConfig.interval"));

        doc["defaultConfig"] = json!({"message": "hi"});
        let manifest = validate_manifest(&doc).expect("valid");
        let initial = manifest.initial_config();
        assert_eq!(initial.get_i64("interval"), Some(60));
        assert_eq!(initial.get_str("message"), Some("hi"));
    }

    #[test]
    fn test_broken_config_schema_is_reported() {
        let err = validate_manifest(&with("configSchema", json!({"type": "string"}))).unwrap_err();
        assert!(err.has_field("configSchema"));
    }

    #[test]
    fn test_duplicate_ui_component_ids() {
        let doc = with(
            "ui",
            json!({
                "serverTabs": [{"id": "console", "title": "Console", "component": "ConsoleTab"}],
                "adminPages": [{"id": "console", "title": "Admin", "component": "AdminPage"}]
            }),
        );
        let err = validate_manifest(&doc).unwrap_err();
        assert!(err.has_field("ui.adminPages"));
    }

    #[test]
    fn test_typed_manifest_validation_reuses_rules() {
        let manifest = validate_manifest(&base()).expect("valid");
        assert!(manifest.validate().is_ok());

        let mut broken = manifest.clone();
        broken.version = "1.2".to_string();
        broken.id = "Nope".to_string();
        let err = broken.validate().unwrap_err();
        assert!(err.has_field("id"));
        assert!(err.has_field("version"));
    }
}
