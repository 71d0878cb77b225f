//! Prelude for convenient imports.

pub use async_trait::async_trait;

pub use stellar_core::{AppError, AppResult};

pub use crate::api::{
    FileEntry, HttpResponse, PluginApi, PluginContext, PluginLogger, ServerInfo, ServerStatus,
    ToastKind, permissions,
};
pub use crate::config::{ConfigSchema, PluginConfig, PropertySchema, PropertyType};
pub use crate::hooks::{
    HookContext, HookPayload, HookPriority, PluginHookEvent, filter_fn, hook_fn,
};
pub use crate::manifest::{ManifestBuilder, PluginCategory, PluginManifest};
pub use crate::plugin::StellarPlugin;
pub use crate::route::{
    PluginRoute, RouteMethod, RouteRequest, RouteResponse, RouteUser, route_fn,
};
pub use crate::ui::{FieldBase, FieldSchema, UiSchema, UiSurface};

pub use crate::{hook_payload, plugin_config};
