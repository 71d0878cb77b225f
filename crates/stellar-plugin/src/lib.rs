//! # stellar-plugin
//!
//! Plugin runtime for the Stellar game-server panel. Provides:
//!
//! - Manifest validation with defaults and per-field violations
//! - A shared hook/filter registry with priority ordering and failure isolation
//! - A per-plugin context scoping registrations, config and host services
//! - The [`StellarPlugin`] lifecycle contract, plugin routes and declarative UI schemas
//! - [`PluginManager`] driving install, enable, disable, update and uninstall

pub mod api;
pub mod config;
pub mod hooks;
pub mod macros;
pub mod manager;
pub mod manifest;
pub mod plugin;
pub mod prelude;
pub mod registry;
pub mod route;
pub mod state;
pub mod ui;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use api::{PluginApi, PluginApiProvider, PluginContext};
pub use config::{ConfigSchema, PluginConfig};
pub use hooks::{HookContext, HookPayload, HookPriority, HookRegistry, PluginHookEvent};
pub use manager::PluginManager;
pub use manifest::{ManifestBuilder, PluginManifest, validate_manifest};
pub use plugin::StellarPlugin;
pub use registry::PluginRegistry;
pub use route::{PluginRoute, RouteMethod, RouteRequest, RouteResponse};
pub use state::{InMemoryStateStore, PluginState, PluginStateStore, PluginStatus};
pub use ui::{UiSchema, UiSurface};
