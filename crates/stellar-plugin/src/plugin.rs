//! The lifecycle contract every plugin implements.

use std::sync::Arc;

use async_trait::async_trait;

use stellar_core::AppResult;

use crate::api::PluginContext;
use crate::config::PluginConfig;
use crate::manifest::PluginManifest;
use crate::route::PluginRoute;
use crate::ui::UiSurface;

/// A plugin compiled into the host.
///
/// Lifecycle: not loaded → enabled ⇄ disabled → removed. `on_enable` may
/// run again after a disable, always with a fresh context. Hook and filter
/// registrations are removed by the host on disable, so `on_disable` only
/// needs to release whatever else the plugin holds.
#[async_trait]
pub trait StellarPlugin: Send + Sync {
    /// Static descriptor of the plugin.
    fn manifest(&self) -> &PluginManifest;

    /// Called when the plugin is enabled. Register hooks and filters here.
    async fn on_enable(&self, ctx: Arc<PluginContext>) -> AppResult<()>;

    /// Called when the plugin is disabled.
    async fn on_disable(&self, ctx: Arc<PluginContext>) -> AppResult<()>;

    /// Routes mounted under `/api/plugins/<id>/` while enabled.
    fn routes(&self) -> Vec<PluginRoute> {
        Vec::new()
    }

    /// Called after a config update was applied.
    async fn on_config_update(
        &self,
        _ctx: Arc<PluginContext>,
        _old: &PluginConfig,
        _new: &PluginConfig,
    ) -> AppResult<()> {
        Ok(())
    }

    /// Returns a message when `config` is unacceptable; blocks the update.
    fn validate_config(&self, _config: &PluginConfig) -> Option<String> {
        None
    }

    /// Declarative UI surfaces the host renders for this plugin.
    fn ui_schemas(&self) -> Vec<UiSurface> {
        Vec::new()
    }
}
