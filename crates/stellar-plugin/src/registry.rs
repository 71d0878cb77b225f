//! Plugin registry: installed plugin instances and their live state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use stellar_core::{AppError, AppResult};

use crate::api::PluginContext;
use crate::plugin::StellarPlugin;
use crate::route::PluginRoute;

/// An installed plugin and, while enabled, its context and mounted routes.
#[derive(Clone)]
pub(crate) struct ManagedPlugin {
    pub plugin: Arc<dyn StellarPlugin>,
    pub context: Option<Arc<PluginContext>>,
    pub routes: Vec<PluginRoute>,
}

/// Registry of all installed plugins.
#[derive(Default)]
pub struct PluginRegistry {
    /// Plugin ID → plugin entry.
    plugins: RwLock<HashMap<String, ManagedPlugin>>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry").finish_non_exhaustive()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin; its id must not be taken.
    pub async fn register(&self, plugin: Arc<dyn StellarPlugin>) -> AppResult<()> {
        let id = plugin.manifest().id.clone();
        let mut plugins = self.plugins.write().await;

        if plugins.contains_key(&id) {
            return Err(AppError::conflict(format!(
                "Plugin '{id}' is already installed"
            )));
        }

        info!(
            plugin_id = %id,
            version = %plugin.manifest().version,
            "Registering plugin"
        );
        plugins.insert(
            id,
            ManagedPlugin {
                plugin,
                context: None,
                routes: Vec::new(),
            },
        );
        Ok(())
    }

    /// Removes a plugin, returning its instance.
    pub async fn unregister(&self, plugin_id: &str) -> Option<Arc<dyn StellarPlugin>> {
        self.plugins
            .write()
            .await
            .remove(plugin_id)
            .map(|entry| entry.plugin)
    }

    /// Swaps the instance behind `plugin_id`, returning the old one.
    pub(crate) async fn replace(
        &self,
        plugin_id: &str,
        plugin: Arc<dyn StellarPlugin>,
    ) -> Option<Arc<dyn StellarPlugin>> {
        let mut plugins = self.plugins.write().await;
        let entry = plugins.get_mut(plugin_id)?;
        Some(std::mem::replace(&mut entry.plugin, plugin))
    }

    pub async fn get(&self, plugin_id: &str) -> Option<Arc<dyn StellarPlugin>> {
        self.plugins
            .read()
            .await
            .get(plugin_id)
            .map(|entry| entry.plugin.clone())
    }

    pub(crate) async fn entry(&self, plugin_id: &str) -> Option<ManagedPlugin> {
        self.plugins.read().await.get(plugin_id).cloned()
    }

    pub async fn contains(&self, plugin_id: &str) -> bool {
        self.plugins.read().await.contains_key(plugin_id)
    }

    /// Installed plugin ids, sorted.
    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.plugins.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Whether the plugin currently has a live context.
    pub async fn is_active(&self, plugin_id: &str) -> bool {
        self.plugins
            .read()
            .await
            .get(plugin_id)
            .is_some_and(|entry| entry.context.is_some())
    }

    /// Records the context and routes of a freshly enabled plugin.
    pub(crate) async fn activate(
        &self,
        plugin_id: &str,
        context: Arc<PluginContext>,
        routes: Vec<PluginRoute>,
    ) {
        if let Some(entry) = self.plugins.write().await.get_mut(plugin_id) {
            entry.context = Some(context);
            entry.routes = routes;
        }
    }

    /// Drops the context and routes, returning the context if there was one.
    pub(crate) async fn deactivate(&self, plugin_id: &str) -> Option<Arc<PluginContext>> {
        let mut plugins = self.plugins.write().await;
        let entry = plugins.get_mut(plugin_id)?;
        entry.routes.clear();
        entry.context.take()
    }

    pub async fn context(&self, plugin_id: &str) -> Option<Arc<PluginContext>> {
        self.plugins
            .read()
            .await
            .get(plugin_id)
            .and_then(|entry| entry.context.clone())
    }

    /// Routes mounted for an enabled plugin; empty otherwise.
    pub async fn routes(&self, plugin_id: &str) -> Vec<PluginRoute> {
        self.plugins
            .read()
            .await
            .get(plugin_id)
            .map(|entry| entry.routes.clone())
            .unwrap_or_default()
    }
}
