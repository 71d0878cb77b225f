//! Plugin context: the per-plugin facade over the shared runtime.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use tracing::warn;

use crate::config::PluginConfig;
use crate::hooks::{FilterHandler, HookHandler, HookPriority, HookRegistry, PluginHookEvent};
use crate::manifest::PluginManifest;

use super::PluginApi;
use super::logger::PluginLogger;

/// Context passed to a plugin on enable.
///
/// Binds the plugin's manifest, its scoped [`PluginApi`], the shared
/// [`HookRegistry`] and a private config copy. Every hook or filter
/// registered through the context is tagged with the plugin's id, so a
/// plugin cannot register on another plugin's behalf.
///
/// A context is revoked once its plugin is disabled; registrations through a
/// revoked context are dropped.
pub struct PluginContext {
    manifest: Arc<PluginManifest>,
    api: PluginApi,
    hooks: Arc<HookRegistry>,
    config: RwLock<PluginConfig>,
    logger: PluginLogger,
    revoked: AtomicBool,
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("plugin_id", &self.manifest.id)
            .field("revoked", &self.is_revoked())
            .finish_non_exhaustive()
    }
}

impl PluginContext {
    /// Creates a context. `production` suppresses debug logging.
    pub fn new(
        manifest: Arc<PluginManifest>,
        api: PluginApi,
        hooks: Arc<HookRegistry>,
        config: PluginConfig,
        production: bool,
    ) -> Self {
        let logger = PluginLogger::new(&manifest.id, production);
        Self {
            manifest,
            api,
            hooks,
            config: RwLock::new(config),
            logger,
            revoked: AtomicBool::new(false),
        }
    }

    /// Manifest of the owning plugin.
    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    /// Id of the owning plugin.
    pub fn plugin_id(&self) -> &str {
        &self.manifest.id
    }

    /// Capability API scoped to the owning plugin.
    pub fn api(&self) -> &PluginApi {
        &self.api
    }

    /// Whether the plugin this context was issued to has been disabled.
    pub fn is_revoked(&self) -> bool {
        self.revoked.load(Ordering::Acquire)
    }

    pub(crate) fn revoke(&self) {
        self.revoked.store(true, Ordering::Release);
    }

    /// Returns a copy of the current config.
    pub async fn config(&self) -> PluginConfig {
        self.config.read().await.clone()
    }

    /// Shallow-merges `updates` into the in-memory config.
    ///
    /// Nothing is persisted; use `PluginManager::update_config` for that.
    pub async fn update_config(&self, updates: &PluginConfig) {
        self.config.write().await.merge(updates);
    }

    /// Replaces the in-memory config wholesale.
    pub(crate) async fn replace_config(&self, config: PluginConfig) {
        *self.config.write().await = config;
    }

    /// Registers an action handler tagged with this plugin's id.
    ///
    /// `priority` defaults to [`HookPriority::Normal`] when `None`.
    pub async fn on(
        &self,
        event: PluginHookEvent,
        handler: Arc<dyn HookHandler>,
        priority: impl Into<Option<HookPriority>>,
    ) {
        if self.is_revoked() {
            warn!(
                plugin_id = %self.manifest.id,
                event = %event,
                "Hook registration after disable ignored"
            );
            return;
        }
        self.hooks
            .on(event, &self.manifest.id, handler, priority.into().unwrap_or_default())
            .await;
    }

    /// Registers a filter tagged with this plugin's id.
    ///
    /// `priority` defaults to [`HookPriority::Normal`] when `None`.
    pub async fn add_filter(
        &self,
        name: &str,
        filter: Arc<dyn FilterHandler>,
        priority: impl Into<Option<HookPriority>>,
    ) {
        if self.is_revoked() {
            warn!(
                plugin_id = %self.manifest.id,
                filter = %name,
                "Filter registration after disable ignored"
            );
            return;
        }
        self.hooks
            .add_filter(name, &self.manifest.id, filter, priority.into().unwrap_or_default())
            .await;
    }

    /// Logger scoped to this plugin.
    pub fn log(&self) -> &PluginLogger {
        &self.logger
    }
}
