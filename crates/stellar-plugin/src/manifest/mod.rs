//! Plugin manifests: the typed descriptor every plugin ships with.

pub mod schema;
pub mod validator;

pub use schema::{ManifestBuilder, PluginCategory, PluginManifest, UiComponentRef, UiDeclarations};
pub use validator::{
    ManifestDocument, ManifestValidationError, ManifestViolation, PLUGIN_ID_PATTERN,
    VERSION_PATTERN, validate_manifest,
};
