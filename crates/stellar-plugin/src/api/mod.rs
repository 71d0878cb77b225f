//! Plugin API: context and capability services exposed to plugin code.

pub mod context;
pub mod logger;
pub mod services;

use std::sync::Arc;

pub use context::PluginContext;
pub use logger::PluginLogger;
pub use services::{
    FileApi, FileEntry, HttpApi, HttpResponse, NotifyApi, ServerApi, ServerInfo, ServerStatus,
    StorageApi, ToastKind,
};

use crate::manifest::PluginManifest;

/// Permission names checked by host implementations.
pub mod permissions {
    pub const SERVERS_READ: &str = "servers:read";
    pub const SERVERS_COMMAND: &str = "servers:command";
    pub const FILES_READ: &str = "files:read";
    pub const FILES_WRITE: &str = "files:write";
    pub const HTTP: &str = "http";
    pub const NOTIFY: &str = "notify";
}

/// Capability surface handed to one plugin.
#[derive(Clone)]
pub struct PluginApi {
    pub servers: Arc<dyn ServerApi>,
    pub files: Arc<dyn FileApi>,
    pub storage: Arc<dyn StorageApi>,
    pub http: Arc<dyn HttpApi>,
    pub notify: Arc<dyn NotifyApi>,
}

impl std::fmt::Debug for PluginApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginApi").finish_non_exhaustive()
    }
}

/// Builds plugin-scoped [`PluginApi`] instances.
pub trait PluginApiProvider: Send + Sync {
    /// Returns the API for the plugin described by `manifest`.
    ///
    /// Implementations scope storage to the plugin id and may restrict calls
    /// to the manifest's `permissions`.
    fn api_for(&self, manifest: &PluginManifest) -> PluginApi;
}
