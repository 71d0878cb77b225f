//! Plugin manager: lifecycle orchestration for every installed plugin.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use stellar_core::{AppError, AppResult};

use crate::api::{PluginApiProvider, PluginContext};
use crate::config::PluginConfig;
use crate::hooks::{HookPayload, HookRegistry, PluginHookEvent};
use crate::manifest::PluginManifest;
use crate::plugin::StellarPlugin;
use crate::registry::PluginRegistry;
use crate::route::{PluginRoute, RouteMethod, RouteRequest, RouteResponse};
use crate::state::{PluginState, PluginStateStore, PluginStatus};
use crate::ui::{self, UiSurface};

/// Drives plugins through install → enable ⇄ disable → uninstall.
///
/// Owns the shared [`HookRegistry`]. Lifecycle operations are serialized;
/// hook emission and route calls run concurrently with them.
pub struct PluginManager {
    plugins: PluginRegistry,
    hooks: Arc<HookRegistry>,
    store: Arc<dyn PluginStateStore>,
    api_provider: Arc<dyn PluginApiProvider>,
    production: bool,
    lifecycle: Mutex<()>,
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("hooks", &self.hooks)
            .field("production", &self.production)
            .finish_non_exhaustive()
    }
}

impl PluginManager {
    /// Creates a manager with a fresh hook registry.
    pub fn new(store: Arc<dyn PluginStateStore>, api_provider: Arc<dyn PluginApiProvider>) -> Self {
        Self {
            plugins: PluginRegistry::new(),
            hooks: Arc::new(HookRegistry::new()),
            store,
            api_provider,
            production: false,
            lifecycle: Mutex::new(()),
        }
    }

    /// Uses `hooks` instead of the default registry.
    pub fn with_hook_registry(mut self, hooks: Arc<HookRegistry>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Production mode suppresses plugin debug logging.
    pub fn with_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    /// The shared hook registry.
    pub fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }

    /// Loaded plugins and their live contexts.
    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Installs a plugin compiled into the host.
    ///
    /// A state persisted by an earlier run is reused, keeping its status and
    /// user config overrides.
    pub async fn install(
        &self,
        plugin: Arc<dyn StellarPlugin>,
        built_in: bool,
    ) -> AppResult<PluginState> {
        let _guard = self.lifecycle.lock().await;

        let manifest = plugin.manifest().clone();
        let id = manifest.id.clone();

        check_plugin(plugin.as_ref())?;
        if self.plugins.contains(&id).await {
            return Err(AppError::conflict(format!(
                "Plugin '{id}' is already installed"
            )));
        }

        let persisted = self.store.load(&id).await?;
        let mut config = manifest.initial_config();
        if let Some(previous) = &persisted {
            config.merge(&previous.config);
        }
        check_config(plugin.as_ref(), &manifest, &config)?;

        let state = match persisted {
            Some(mut state) => {
                state.set_manifest(manifest);
                state.set_config(config);
                state.is_built_in = built_in;
                state
            }
            None => PluginState::installed(manifest, config, built_in),
        };

        self.store.save(&state).await?;
        self.plugins.register(plugin).await?;

        info!(
            plugin_id = %id,
            version = %state.manifest.version,
            built_in = built_in,
            status = %state.status(),
            "Plugin installed"
        );
        Ok(state)
    }

    /// Enables an installed plugin.
    pub async fn enable(&self, plugin_id: &str) -> AppResult<()> {
        let _guard = self.lifecycle.lock().await;
        self.enable_locked(plugin_id).await
    }

    /// Disables an enabled plugin and removes its registrations.
    pub async fn disable(&self, plugin_id: &str) -> AppResult<()> {
        let _guard = self.lifecycle.lock().await;
        self.disable_locked(plugin_id).await
    }

    /// Removes a plugin and its persisted state. Built-in plugins are refused.
    pub async fn uninstall(&self, plugin_id: &str) -> AppResult<()> {
        let _guard = self.lifecycle.lock().await;

        let state = self.load_state(plugin_id).await?;
        if state.is_built_in {
            return Err(AppError::conflict(format!(
                "Plugin '{plugin_id}' is built in and cannot be uninstalled"
            )));
        }

        if self.plugins.is_active(plugin_id).await {
            self.disable_locked(plugin_id).await?;
        }

        self.hooks.remove_plugin(plugin_id).await;
        self.plugins.unregister(plugin_id).await;
        self.store.delete(plugin_id).await?;

        info!(plugin_id = %plugin_id, "Plugin uninstalled");
        Ok(())
    }

    /// Merges `updates` into a plugin's config, validates, persists and
    /// notifies the plugin. Returns the new effective config.
    pub async fn update_config(
        &self,
        plugin_id: &str,
        updates: &PluginConfig,
    ) -> AppResult<PluginConfig> {
        let _guard = self.lifecycle.lock().await;

        let plugin = self.get_plugin(plugin_id).await?;
        let mut state = self.load_state(plugin_id).await?;

        let old = state.config.clone();
        let new = old.merged(updates);
        check_config(plugin.as_ref(), plugin.manifest(), &new)?;

        state.set_config(new.clone());
        self.store.save(&state).await?;

        if let Some(ctx) = self.plugins.context(plugin_id).await {
            ctx.replace_config(new.clone()).await;
            let notified = self
                .hooks
                .guarded(plugin.on_config_update(ctx, &old, &new))
                .await;
            if let Err(e) = notified {
                warn!(plugin_id = %plugin_id, error = %e, "Plugin config update callback failed");
            }
        }

        self.hooks
            .emit(PluginHookEvent::PluginConfigUpdated, plugin_payload(plugin_id))
            .await;

        info!(plugin_id = %plugin_id, keys = updates.len(), "Plugin config updated");
        Ok(new)
    }

    /// Replaces a plugin's implementation with a newer one.
    ///
    /// The plugin is marked `updating` while the swap happens and re-enabled
    /// afterwards if it was enabled before.
    pub async fn update(&self, plugin: Arc<dyn StellarPlugin>) -> AppResult<PluginState> {
        let _guard = self.lifecycle.lock().await;

        let manifest = plugin.manifest().clone();
        let id = manifest.id.clone();
        let mut state = self.load_state(&id).await?;
        if !self.plugins.contains(&id).await {
            return Err(AppError::not_found(format!("Plugin '{id}' is not installed")));
        }
        check_plugin(plugin.as_ref())?;

        let mut config = manifest.initial_config();
        config.merge(&state.config);
        check_config(plugin.as_ref(), &manifest, &config)?;

        let previous_status = state.status();
        let was_enabled = self.plugins.is_active(&id).await;
        if was_enabled {
            self.disable_locked(&id).await?;
            state = self.load_state(&id).await?;
        }

        let from_version = state.manifest.version.clone();
        state.mark_updating();
        self.store.save(&state).await?;

        self.plugins.replace(&id, plugin).await;
        state.set_manifest(manifest);
        state.set_config(config);
        match previous_status {
            PluginStatus::Installed => state.mark_installed(),
            _ => state.mark_disabled(),
        }
        self.store.save(&state).await?;

        info!(
            plugin_id = %id,
            from = %from_version,
            to = %state.manifest.version,
            "Plugin updated"
        );

        if was_enabled {
            self.enable_locked(&id).await?;
            state = self.load_state(&id).await?;
        }
        Ok(state)
    }

    /// Enables every installed plugin whose persisted status is `enabled`.
    ///
    /// Returns how many were enabled; failures are logged and skipped.
    pub async fn start(&self) -> AppResult<usize> {
        let _guard = self.lifecycle.lock().await;

        let mut enabled = 0;
        for id in self.plugins.ids().await {
            let Some(state) = self.store.load(&id).await? else {
                continue;
            };
            if state.status() != PluginStatus::Enabled || self.plugins.is_active(&id).await {
                continue;
            }
            match self.enable_locked(&id).await {
                Ok(()) => enabled += 1,
                Err(e) => error!(plugin_id = %id, error = %e, "Plugin failed to start"),
            }
        }

        info!(enabled = enabled, "Plugin manager started");
        Ok(enabled)
    }

    /// Unloads every enabled plugin for host shutdown.
    ///
    /// Persisted statuses are left alone so [`start`](Self::start) restores
    /// the same set of plugins on the next run.
    pub async fn shutdown(&self) {
        let _guard = self.lifecycle.lock().await;

        let mut unloaded = 0;
        for id in self.plugins.ids().await {
            if !self.plugins.is_active(&id).await {
                continue;
            }
            match self.get_plugin(&id).await {
                Ok(plugin) => {
                    self.unload_locked(&id, plugin.as_ref()).await;
                    unloaded += 1;
                }
                Err(e) => error!(plugin_id = %id, error = %e, "Error unloading plugin"),
            }
        }

        info!(unloaded = unloaded, "All plugins unloaded");
    }

    /// Current persisted state of one plugin.
    pub async fn state(&self, plugin_id: &str) -> AppResult<PluginState> {
        self.load_state(plugin_id).await
    }

    /// Persisted states of every plugin, sorted by id.
    pub async fn list(&self) -> AppResult<Vec<PluginState>> {
        self.store.list().await
    }

    /// UI surfaces of an installed plugin.
    pub async fn ui_surfaces(&self, plugin_id: &str) -> AppResult<Vec<UiSurface>> {
        Ok(self.get_plugin(plugin_id).await?.ui_schemas())
    }

    /// Finds the mounted route for `method` and `path`, with captured params.
    pub async fn resolve_route(
        &self,
        plugin_id: &str,
        method: RouteMethod,
        path: &str,
    ) -> Option<(PluginRoute, HashMap<String, String>)> {
        self.plugins
            .routes(plugin_id)
            .await
            .into_iter()
            .filter(|route| route.method == method)
            .find_map(|route| route.matches(path).map(|params| (route, params)))
    }

    /// Calls a mounted route. Authorization is the caller's job.
    pub async fn invoke_route(
        &self,
        plugin_id: &str,
        method: RouteMethod,
        path: &str,
        mut request: RouteRequest,
    ) -> AppResult<RouteResponse> {
        let (route, params) = self
            .resolve_route(plugin_id, method, path)
            .await
            .ok_or_else(|| {
                AppError::not_found(format!("No route {method} {path} for plugin '{plugin_id}'"))
            })?;
        request.params.extend(params);
        self.call_route(plugin_id, &route, request).await
    }

    /// Calls the route a UI action id resolves to.
    pub async fn invoke_action(
        &self,
        plugin_id: &str,
        action_id: &str,
        request: RouteRequest,
    ) -> AppResult<RouteResponse> {
        let routes = self.plugins.routes(plugin_id).await;
        let route = ui::resolve_action(&routes, action_id).ok_or_else(|| {
            AppError::not_found(format!(
                "Action '{action_id}' is not available for plugin '{plugin_id}'"
            ))
        })?;
        self.call_route(plugin_id, route, request).await
    }

    async fn call_route(
        &self,
        plugin_id: &str,
        route: &PluginRoute,
        mut request: RouteRequest,
    ) -> AppResult<RouteResponse> {
        let ctx = self.plugins.context(plugin_id).await.ok_or_else(|| {
            AppError::plugin(format!("Plugin '{plugin_id}' is not enabled"))
        })?;
        request.config = ctx.config().await;

        self.hooks
            .guarded(route.handler.handle(request))
            .await
            .inspect_err(|e| {
                warn!(
                    plugin_id = %plugin_id,
                    method = %route.method,
                    path = %route.path,
                    error = %e,
                    "Plugin route failed"
                );
            })
    }

    async fn enable_locked(&self, plugin_id: &str) -> AppResult<()> {
        let entry = self
            .plugins
            .entry(plugin_id)
            .await
            .ok_or_else(|| AppError::not_found(format!("Plugin '{plugin_id}' not found")))?;
        if entry.context.is_some() {
            return Ok(());
        }
        let plugin = entry.plugin;
        let mut state = self.load_state(plugin_id).await?;

        let manifest = Arc::new(plugin.manifest().clone());
        let ctx = Arc::new(PluginContext::new(
            manifest.clone(),
            self.api_provider.api_for(&manifest),
            self.hooks.clone(),
            state.config.clone(),
            self.production,
        ));

        if let Err(e) = self.hooks.guarded(plugin.on_enable(ctx.clone())).await {
            ctx.revoke();
            let removed = self.hooks.remove_plugin(plugin_id).await;
            state.mark_error(e.to_string());
            self.store.save(&state).await?;
            error!(
                plugin_id = %plugin_id,
                error = %e,
                removed_registrations = removed,
                "Plugin failed to enable"
            );
            return Err(AppError::with_source(
                stellar_core::error::ErrorKind::Plugin,
                format!("Plugin '{plugin_id}' failed to enable: {}", e.message),
                e,
            ));
        }

        let routes = plugin.routes();
        let route_count = routes.len();
        self.plugins.activate(plugin_id, ctx, routes).await;

        state.mark_enabled();
        self.store.save(&state).await?;

        self.hooks
            .emit(PluginHookEvent::PluginEnabled, plugin_payload(plugin_id))
            .await;

        info!(plugin_id = %plugin_id, routes = route_count, "Plugin enabled");
        Ok(())
    }

    async fn disable_locked(&self, plugin_id: &str) -> AppResult<()> {
        let plugin = self.get_plugin(plugin_id).await?;
        let mut state = self.load_state(plugin_id).await?;

        let removed = self.unload_locked(plugin_id, plugin.as_ref()).await;

        state.mark_disabled();
        self.store.save(&state).await?;

        self.hooks
            .emit(PluginHookEvent::PluginDisabled, plugin_payload(plugin_id))
            .await;

        info!(plugin_id = %plugin_id, removed_registrations = removed, "Plugin disabled");
        Ok(())
    }

    /// Revokes the live context, runs `on_disable` and drops the plugin's
    /// registrations and routes. The persisted state is not touched.
    async fn unload_locked(&self, plugin_id: &str, plugin: &dyn StellarPlugin) -> usize {
        if let Some(ctx) = self.plugins.deactivate(plugin_id).await {
            ctx.revoke();
            if let Err(e) = self.hooks.guarded(plugin.on_disable(ctx)).await {
                warn!(plugin_id = %plugin_id, error = %e, "Plugin disable returned error");
            }
        }
        self.hooks.remove_plugin(plugin_id).await
    }

    async fn get_plugin(&self, plugin_id: &str) -> AppResult<Arc<dyn StellarPlugin>> {
        self.plugins
            .get(plugin_id)
            .await
            .ok_or_else(|| AppError::not_found(format!("Plugin '{plugin_id}' not found")))
    }

    async fn load_state(&self, plugin_id: &str) -> AppResult<PluginState> {
        self.store
            .load(plugin_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Plugin '{plugin_id}' is not installed")))
    }
}

fn plugin_payload(plugin_id: &str) -> HookPayload {
    HookPayload::new().with_string("pluginId", plugin_id)
}

/// Manifest and UI checks run before a plugin is accepted.
fn check_plugin(plugin: &dyn StellarPlugin) -> AppResult<()> {
    plugin.manifest().validate()?;

    let problems = ui::validate_surfaces(&plugin.ui_schemas(), &plugin.routes());
    if !problems.is_empty() {
        return Err(AppError::validation(format!(
            "Plugin '{}' declares invalid UI: {}",
            plugin.manifest().id,
            problems.join("; ")
        )));
    }
    Ok(())
}

/// Schema validation followed by the plugin's own gate.
fn check_config(
    plugin: &dyn StellarPlugin,
    manifest: &PluginManifest,
    config: &PluginConfig,
) -> AppResult<()> {
    if let Some(schema) = &manifest.config_schema {
        if let Err(violations) = schema.validate(config) {
            let details: Vec<String> = violations.iter().map(ToString::to_string).collect();
            return Err(AppError::validation(format!(
                "Invalid config for plugin '{}': {}",
                manifest.id,
                details.join(", ")
            )));
        }
    }

    if let Some(message) = plugin.validate_config(config) {
        return Err(AppError::validation(message));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::config::ConfigSchema;
    use crate::hooks::{HookPriority, hook_fn};
    use crate::manifest::ManifestBuilder;
    use crate::route::{RouteResponse, route_fn};
    use crate::state::InMemoryStateStore;
    use crate::testing::RecordingProvider;
    use crate::ui::{ActionButtonSchema, ButtonVariant, UiSchema};
    use stellar_core::error::ErrorKind;

    struct Greeter {
        manifest: PluginManifest,
        fail_enable: bool,
        enables: AtomicUsize,
        disables: AtomicUsize,
        config_updates: AtomicUsize,
        action: &'static str,
    }

    impl Greeter {
        fn new(version: &str) -> Self {
            let schema = ConfigSchema::parse(&json!({
                "type": "object",
                "properties": {
                    "greeting": {"type": "string", "default": "hello", "minLength": 1},
                    "times": {"type": "integer", "minimum": 1, "default": 1}
                }
            }))
            .unwrap();
            Self {
                manifest: ManifestBuilder::new("greeter", "Greeter", version)
                    .config_schema(schema)
                    .build(),
                fail_enable: false,
                enables: AtomicUsize::new(0),
                disables: AtomicUsize::new(0),
                config_updates: AtomicUsize::new(0),
                action: "greet",
            }
        }

        fn failing() -> Self {
            Self {
                fail_enable: true,
                ..Self::new("1.0.0")
            }
        }
    }

    #[async_trait]
    impl StellarPlugin for Greeter {
        fn manifest(&self) -> &PluginManifest {
            &self.manifest
        }

        async fn on_enable(&self, ctx: Arc<PluginContext>) -> AppResult<()> {
            self.enables.fetch_add(1, Ordering::SeqCst);
            ctx.on(
                PluginHookEvent::ServerAfterStart,
                hook_fn(|_ctx| async { Ok(()) }),
                HookPriority::Normal,
            )
            .await;
            if self.fail_enable {
                return Err(AppError::plugin("database unreachable"));
            }
            Ok(())
        }

        async fn on_disable(&self, _ctx: Arc<PluginContext>) -> AppResult<()> {
            self.disables.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn routes(&self) -> Vec<PluginRoute> {
            vec![
                PluginRoute::post(
                    "/greet",
                    route_fn(|req| async move {
                        let greeting = req.config.get_str("greeting").unwrap_or("?").to_string();
                        Ok(RouteResponse::ok(json!({ "greeting": greeting })))
                    }),
                ),
                PluginRoute::get(
                    "/people/:name",
                    route_fn(|req| async move {
                        Ok(RouteResponse::ok(json!(req.param("name"))))
                    }),
                ),
            ]
        }

        async fn on_config_update(
            &self,
            _ctx: Arc<PluginContext>,
            _old: &PluginConfig,
            _new: &PluginConfig,
        ) -> AppResult<()> {
            self.config_updates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn validate_config(&self, config: &PluginConfig) -> Option<String> {
            (config.get_i64("times").unwrap_or(1) > 10)
                .then(|| "times must be at most 10".to_string())
        }

        fn ui_schemas(&self) -> Vec<UiSurface> {
            vec![UiSurface::new(
                "actions",
                "Actions",
                UiSchema::ActionButton(ActionButtonSchema {
                    label: "Greet".into(),
                    action_id: self.action.into(),
                    variant: ButtonVariant::Primary,
                    confirm: None,
                }),
            )]
        }
    }

    fn manager() -> (PluginManager, Arc<InMemoryStateStore>) {
        let store = Arc::new(InMemoryStateStore::new());
        let manager = PluginManager::new(store.clone(), Arc::new(RecordingProvider::new()));
        (manager, store)
    }

    async fn record_plugin_events(manager: &PluginManager) -> Arc<std::sync::Mutex<Vec<String>>> {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        for event in [
            PluginHookEvent::PluginEnabled,
            PluginHookEvent::PluginDisabled,
            PluginHookEvent::PluginConfigUpdated,
        ] {
            let seen = seen.clone();
            let handler = hook_fn(move |ctx| {
                let seen = seen.clone();
                async move {
                    let id = ctx.get_string("pluginId").unwrap_or_default().to_string();
                    seen.lock().unwrap().push(format!("{} {id}", ctx.event));
                    Ok(())
                }
            });
            manager
                .hooks()
                .on(event, "host", handler, HookPriority::Normal)
                .await;
        }
        seen
    }

    #[tokio::test]
    async fn test_install_applies_schema_defaults() {
        let (manager, _) = manager();
        let state = manager
            .install(Arc::new(Greeter::new("1.0.0")), false)
            .await
            .unwrap();

        assert_eq!(state.status(), PluginStatus::Installed);
        assert_eq!(state.config.get_str("greeting"), Some("hello"));
        assert_eq!(state.config.get_i64("times"), Some(1));
    }

    #[tokio::test]
    async fn test_duplicate_install_is_rejected() {
        let (manager, _) = manager();
        manager
            .install(Arc::new(Greeter::new("1.0.0")), false)
            .await
            .unwrap();
        let err = manager
            .install(Arc::new(Greeter::new("1.0.0")), false)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Conflict));
    }

    #[tokio::test]
    async fn test_invalid_manifest_blocks_install() {
        let (manager, store) = manager();
        let mut plugin = Greeter::new("1.0");
        plugin.manifest.id = "Greeter".into();

        let err = manager.install(Arc::new(plugin), false).await.unwrap_err();
        assert!(err.is(ErrorKind::Validation));
        assert!(store.list().await.unwrap().is_empty());
        assert!(!manager.plugins().contains("Greeter").await);
    }

    #[tokio::test]
    async fn test_unresolved_ui_action_blocks_install() {
        let (manager, _) = manager();
        let mut plugin = Greeter::new("1.0.0");
        plugin.action = "wave";

        let err = manager.install(Arc::new(plugin), false).await.unwrap_err();
        assert!(err.is(ErrorKind::Validation));
        assert!(err.message.contains("wave"));
    }

    #[tokio::test]
    async fn test_enable_disable_cycle() {
        let (manager, _) = manager();
        let events = record_plugin_events(&manager).await;
        let plugin = Arc::new(Greeter::new("1.0.0"));
        manager.install(plugin.clone(), false).await.unwrap();

        manager.enable("greeter").await.unwrap();
        assert_eq!(manager.state("greeter").await.unwrap().status(), PluginStatus::Enabled);
        assert!(manager.hooks().has_hooks(PluginHookEvent::ServerAfterStart).await);
        assert!(manager.resolve_route("greeter", RouteMethod::Post, "/greet").await.is_some());

        // enabling twice is a no-op
        manager.enable("greeter").await.unwrap();
        assert_eq!(plugin.enables.load(Ordering::SeqCst), 1);

        manager.disable("greeter").await.unwrap();
        assert_eq!(manager.state("greeter").await.unwrap().status(), PluginStatus::Disabled);
        assert!(!manager.hooks().has_hooks(PluginHookEvent::ServerAfterStart).await);
        assert!(manager.resolve_route("greeter", RouteMethod::Post, "/greet").await.is_none());
        assert_eq!(plugin.disables.load(Ordering::SeqCst), 1);

        manager.enable("greeter").await.unwrap();
        assert_eq!(plugin.enables.load(Ordering::SeqCst), 2);

        let seen = events.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                "plugin:enabled greeter",
                "plugin:disabled greeter",
                "plugin:enabled greeter"
            ]
        );
    }

    #[tokio::test]
    async fn test_disabled_context_cannot_register_hooks() {
        let (manager, _) = manager();
        manager
            .install(Arc::new(Greeter::new("1.0.0")), false)
            .await
            .unwrap();
        manager.enable("greeter").await.unwrap();
        let stale = manager.plugins().context("greeter").await.unwrap();

        manager.disable("greeter").await.unwrap();
        assert!(stale.is_revoked());

        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        stale
            .on(
                PluginHookEvent::ServerAfterStart,
                hook_fn(move |_ctx| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }),
                None,
            )
            .await;
        manager
            .hooks()
            .emit(PluginHookEvent::ServerAfterStart, HookPayload::new().with_server("s1"))
            .await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        manager.enable("greeter").await.unwrap();
        let fresh = manager.plugins().context("greeter").await.unwrap();
        assert!(!fresh.is_revoked());
        assert_eq!(manager.hooks().handler_count(PluginHookEvent::ServerAfterStart).await, 1);
    }

    #[tokio::test]
    async fn test_failing_enable_leaves_error_and_no_registrations() {
        let (manager, _) = manager();
        manager
            .install(Arc::new(Greeter::failing()), false)
            .await
            .unwrap();

        let err = manager.enable("greeter").await.unwrap_err();
        assert!(err.is(ErrorKind::Plugin));

        let state = manager.state("greeter").await.unwrap();
        assert_eq!(state.status(), PluginStatus::Error);
        assert!(state.error().unwrap().contains("database unreachable"));
        assert!(manager.hooks().registered_hooks().await.is_empty());
        assert!(!manager.plugins().is_active("greeter").await);
    }

    #[tokio::test]
    async fn test_validate_config_blocks_update() {
        let (manager, _) = manager();
        let plugin = Arc::new(Greeter::new("1.0.0"));
        manager.install(plugin.clone(), false).await.unwrap();
        manager.enable("greeter").await.unwrap();

        let err = manager
            .update_config("greeter", &PluginConfig::new().with("times", json!(11)))
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Validation));
        assert_eq!(err.message, "times must be at most 10");

        let state = manager.state("greeter").await.unwrap();
        assert_eq!(state.config.get_i64("times"), Some(1));
        let ctx = manager.plugins().context("greeter").await.unwrap();
        assert_eq!(ctx.config().await.get_i64("times"), Some(1));
        assert_eq!(plugin.config_updates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_schema_violation_blocks_update() {
        let (manager, _) = manager();
        manager
            .install(Arc::new(Greeter::new("1.0.0")), false)
            .await
            .unwrap();

        let err = manager
            .update_config("greeter", &PluginConfig::new().with("times", json!("many")))
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Validation));
        assert!(err.message.contains("times"));
    }

    #[tokio::test]
    async fn test_update_config_reaches_live_context() {
        let (manager, _) = manager();
        let events = record_plugin_events(&manager).await;
        let plugin = Arc::new(Greeter::new("1.0.0"));
        manager.install(plugin.clone(), false).await.unwrap();
        manager.enable("greeter").await.unwrap();

        let config = manager
            .update_config("greeter", &PluginConfig::new().with("greeting", json!("hey")))
            .await
            .unwrap();
        assert_eq!(config.get_str("greeting"), Some("hey"));
        assert_eq!(config.get_i64("times"), Some(1));
        assert_eq!(plugin.config_updates.load(Ordering::SeqCst), 1);

        let response = manager
            .invoke_action("greeter", "greet", RouteRequest::new())
            .await
            .unwrap();
        assert_eq!(response.body, json!({"greeting": "hey"}));

        assert!(
            events
                .lock()
                .unwrap()
                .contains(&"plugin:configUpdated greeter".to_string())
        );
    }

    #[tokio::test]
    async fn test_invoke_route_captures_params() {
        let (manager, _) = manager();
        manager
            .install(Arc::new(Greeter::new("1.0.0")), false)
            .await
            .unwrap();
        manager.enable("greeter").await.unwrap();

        let response = manager
            .invoke_route("greeter", RouteMethod::Get, "/people/ada", RouteRequest::new())
            .await
            .unwrap();
        assert_eq!(response.body, json!("ada"));

        let missing = manager
            .invoke_route("greeter", RouteMethod::Delete, "/people/ada", RouteRequest::new())
            .await
            .unwrap_err();
        assert!(missing.is(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_built_in_plugins_cannot_be_uninstalled() {
        let (manager, _) = manager();
        manager
            .install(Arc::new(Greeter::new("1.0.0")), true)
            .await
            .unwrap();

        let err = manager.uninstall("greeter").await.unwrap_err();
        assert!(err.is(ErrorKind::Conflict));
        assert!(manager.plugins().contains("greeter").await);
    }

    #[tokio::test]
    async fn test_uninstall_removes_everything() {
        let (manager, store) = manager();
        manager
            .install(Arc::new(Greeter::new("1.0.0")), false)
            .await
            .unwrap();
        manager.enable("greeter").await.unwrap();

        manager.uninstall("greeter").await.unwrap();

        assert!(!manager.plugins().contains("greeter").await);
        assert!(store.load("greeter").await.unwrap().is_none());
        assert!(manager.hooks().registered_hooks().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_swaps_and_reenables() {
        let (manager, _) = manager();
        manager
            .install(Arc::new(Greeter::new("1.0.0")), false)
            .await
            .unwrap();
        manager.enable("greeter").await.unwrap();
        manager
            .update_config("greeter", &PluginConfig::new().with("times", json!(3)))
            .await
            .unwrap();

        let newer = Arc::new(Greeter::new("1.1.0"));
        let state = manager.update(newer.clone()).await.unwrap();

        assert_eq!(state.status(), PluginStatus::Enabled);
        assert_eq!(state.manifest.version, "1.1.0");
        assert_eq!(state.config.get_i64("times"), Some(3));
        assert_eq!(newer.enables.load(Ordering::SeqCst), 1);
        assert_eq!(manager.hooks().handler_count(PluginHookEvent::ServerAfterStart).await, 1);
    }

    #[tokio::test]
    async fn test_start_restores_persisted_enabled_plugins() {
        let store = Arc::new(InMemoryStateStore::new());
        {
            let first = PluginManager::new(store.clone(), Arc::new(RecordingProvider::new()));
            first
                .install(Arc::new(Greeter::new("1.0.0")), false)
                .await
                .unwrap();
            first.enable("greeter").await.unwrap();
            first
                .update_config("greeter", &PluginConfig::new().with("greeting", json!("yo")))
                .await
                .unwrap();
        }

        let second = PluginManager::new(store.clone(), Arc::new(RecordingProvider::new()));
        let state = second
            .install(Arc::new(Greeter::new("1.0.0")), false)
            .await
            .unwrap();
        assert_eq!(state.status(), PluginStatus::Enabled);
        assert_eq!(state.config.get_str("greeting"), Some("yo"));

        assert_eq!(second.start().await.unwrap(), 1);
        assert!(second.plugins().is_active("greeter").await);

        second.shutdown().await;
        assert!(!second.plugins().is_active("greeter").await);
        assert!(!second.hooks().has_hooks(PluginHookEvent::ServerAfterStart).await);
        assert_eq!(
            second.state("greeter").await.unwrap().status(),
            PluginStatus::Enabled
        );

        let third = PluginManager::new(store, Arc::new(RecordingProvider::new()));
        third
            .install(Arc::new(Greeter::new("1.0.0")), false)
            .await
            .unwrap();
        assert_eq!(third.start().await.unwrap(), 1);
        assert!(third.plugins().is_active("greeter").await);
    }
}
