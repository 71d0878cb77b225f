//! MOTD plugin implementation.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use stellar_plugin::prelude::*;
use stellar_plugin::ui::{
    ActionButtonSchema, ButtonVariant, CompoundSchema, CompoundSection, FormSchema, StatItem,
    StatsSchema,
};

use crate::hooks::{MotdFilter, PlayerJoinHook, ServerStartedHook};
use crate::message::{self, MOTD_FILTER};
use crate::routes;

/// Context of the plugin while enabled; routes read it on every call.
#[derive(Debug, Default)]
pub struct ActiveContext {
    inner: RwLock<Option<Arc<PluginContext>>>,
}

impl ActiveContext {
    pub async fn get(&self) -> AppResult<Arc<PluginContext>> {
        self.inner
            .read()
            .await
            .clone()
            .ok_or_else(|| AppError::plugin("MOTD plugin is not enabled"))
    }

    async fn set(&self, ctx: Option<Arc<PluginContext>>) {
        *self.inner.write().await = ctx;
    }
}

/// Message-of-the-day plugin.
pub struct MotdPlugin {
    manifest: PluginManifest,
    active: Arc<ActiveContext>,
}

impl MotdPlugin {
    pub fn new() -> Self {
        Self {
            manifest: message::manifest(),
            active: Arc::new(ActiveContext::default()),
        }
    }
}

impl Default for MotdPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StellarPlugin for MotdPlugin {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    async fn on_enable(&self, ctx: Arc<PluginContext>) -> AppResult<()> {
        ctx.on(
            PluginHookEvent::ServerAfterStart,
            Arc::new(ServerStartedHook::new(ctx.clone())),
            HookPriority::Normal,
        )
        .await;
        ctx.on(
            PluginHookEvent::ServerConsole,
            Arc::new(PlayerJoinHook::new(ctx.clone())),
            HookPriority::Low,
        )
        .await;
        ctx.add_filter(
            MOTD_FILTER,
            Arc::new(MotdFilter::new(ctx.clone())),
            HookPriority::Normal,
        )
        .await;

        ctx.log().info("Enabled");
        self.active.set(Some(ctx)).await;
        Ok(())
    }

    async fn on_disable(&self, ctx: Arc<PluginContext>) -> AppResult<()> {
        self.active.set(None).await;
        ctx.log().info("Disabled");
        Ok(())
    }

    fn routes(&self) -> Vec<PluginRoute> {
        routes::routes(self.active.clone())
    }

    async fn on_config_update(
        &self,
        ctx: Arc<PluginContext>,
        old: &PluginConfig,
        new: &PluginConfig,
    ) -> AppResult<()> {
        if old.get_str("message") != new.get_str("message") {
            info!(
                plugin_id = %ctx.plugin_id(),
                message = new.get_str("message").unwrap_or_default(),
                "MOTD message changed"
            );
        }
        Ok(())
    }

    fn validate_config(&self, config: &PluginConfig) -> Option<String> {
        let template = config.get_str("message")?;
        if template.contains('\n') {
            return Some("message must be a single line".to_string());
        }
        message::unknown_placeholder(template).map(|name| {
            format!(
                "unknown placeholder {{{name}}}; use one of {}",
                message::PLACEHOLDERS.join(", ")
            )
        })
    }

    fn ui_schemas(&self) -> Vec<UiSurface> {
        vec![
            UiSurface::new(
                "broadcast",
                "Broadcast",
                UiSchema::Form(FormSchema {
                    fields: vec![
                        FieldSchema::string(FieldBase::new("serverId", "Server").required()),
                        FieldSchema::textarea(FieldBase::new("message", "Message"), 2),
                    ],
                    submit_action_id: "broadcast".to_string(),
                    load_action_id: None,
                    submit_label: Some("Send".to_string()),
                }),
            ),
            UiSurface::new(
                "overview",
                "Message of the Day",
                UiSchema::Compound(CompoundSchema {
                    sections: vec![
                        CompoundSection {
                            title: Some("Activity".to_string()),
                            schema: UiSchema::Stats(StatsSchema {
                                data_action_id: "stats".to_string(),
                                items: vec![
                                    StatItem {
                                        key: "total".to_string(),
                                        label: "Broadcasts".to_string(),
                                        unit: None,
                                    },
                                    StatItem {
                                        key: "servers".to_string(),
                                        label: "Servers reached".to_string(),
                                        unit: None,
                                    },
                                ],
                                refresh_interval_secs: Some(30),
                            }),
                        },
                        CompoundSection {
                            title: None,
                            schema: UiSchema::ActionButton(ActionButtonSchema {
                                label: "Preview message".to_string(),
                                action_id: "motd".to_string(),
                                variant: ButtonVariant::Secondary,
                                confirm: None,
                            }),
                        },
                    ],
                }),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use stellar_plugin::testing::RecordingProvider;
    use stellar_plugin::{HookRegistry, InMemoryStateStore, PluginManager, PluginStatus};

    use super::*;

    async fn running() -> (PluginManager, RecordingProvider) {
        let provider = RecordingProvider::new();
        provider.api.add_server("s1", "minecraft").await;
        let manager = PluginManager::new(
            Arc::new(InMemoryStateStore::new()),
            Arc::new(provider.clone()),
        )
        .with_hook_registry(Arc::new(HookRegistry::new()));
        manager
            .install(Arc::new(MotdPlugin::new()), true)
            .await
            .unwrap();
        manager.enable(message::PLUGIN_ID).await.unwrap();
        (manager, provider)
    }

    #[tokio::test]
    async fn test_announces_on_server_start() {
        let (manager, provider) = running().await;

        manager
            .hooks()
            .emit(
                PluginHookEvent::ServerAfterStart,
                HookPayload::new().with_server("s1"),
            )
            .await;

        assert_eq!(
            provider.api.commands().await,
            vec![("s1".to_string(), "say [MOTD] Welcome to s1!".to_string())]
        );
        assert_eq!(provider.api.stored("broadcasts:total").await, Some(json!(1)));

        let stats = manager
            .invoke_action(message::PLUGIN_ID, "stats", RouteRequest::new())
            .await
            .unwrap();
        assert_eq!(stats.body, json!({"total": 1, "servers": 1}));
    }

    #[tokio::test]
    async fn test_start_announcement_can_be_turned_off() {
        let (manager, provider) = running().await;
        manager
            .update_config(
                message::PLUGIN_ID,
                &PluginConfig::new().with("announceOnStart", json!(false)),
            )
            .await
            .unwrap();

        manager
            .hooks()
            .emit(
                PluginHookEvent::ServerAfterStart,
                HookPayload::new().with_server("s1"),
            )
            .await;

        assert!(provider.api.commands().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_server_does_not_break_emission() {
        let (manager, provider) = running().await;
        manager
            .hooks()
            .emit(
                PluginHookEvent::ServerAfterStart,
                HookPayload::new().with_server("ghost"),
            )
            .await;
        assert!(provider.api.commands().await.is_empty());
    }

    #[tokio::test]
    async fn test_greets_joining_players() {
        let (manager, provider) = running().await;
        manager
            .update_config(
                message::PLUGIN_ID,
                &PluginConfig::new()
                    .with("greetPlayers", json!(true))
                    .with("message", json!("Hi {player}!")),
            )
            .await
            .unwrap();

        manager
            .hooks()
            .emit(
                PluginHookEvent::ServerConsole,
                HookPayload::new()
                    .with_server("s1")
                    .with_string("line", "[Server thread/INFO]: Alex joined the game"),
            )
            .await;

        assert_eq!(
            provider.api.commands().await,
            vec![("s1".to_string(), "tell Alex Hi Alex!".to_string())]
        );
    }

    #[tokio::test]
    async fn test_motd_filter_renders_template() {
        let (manager, _) = running().await;
        let value = manager
            .hooks()
            .apply_filters(
                MOTD_FILTER,
                json!("A Minecraft Server"),
                HookPayload::new()
                    .with_server("s1")
                    .with_string("serverName", "Lobby"),
            )
            .await;
        assert_eq!(value, json!("Welcome to Lobby!"));

        manager.disable(message::PLUGIN_ID).await.unwrap();
        let untouched = manager
            .hooks()
            .apply_filters(MOTD_FILTER, json!("A Minecraft Server"), HookPayload::new())
            .await;
        assert_eq!(untouched, json!("A Minecraft Server"));
    }

    #[tokio::test]
    async fn test_invalid_template_is_rejected() {
        let (manager, _) = running().await;

        let err = manager
            .update_config(
                message::PLUGIN_ID,
                &PluginConfig::new().with("message", json!("Hello {name}")),
            )
            .await
            .unwrap_err();
        assert!(err.message.contains("unknown placeholder {name}"));

        let err = manager
            .update_config(
                message::PLUGIN_ID,
                &PluginConfig::new().with("message", json!("two\nlines")),
            )
            .await
            .unwrap_err();
        assert_eq!(err.message, "message must be a single line");

        let state = manager.state(message::PLUGIN_ID).await.unwrap();
        assert_eq!(state.config.get_str("message"), Some(message::DEFAULT_MESSAGE));
    }

    #[tokio::test]
    async fn test_broadcast_action() {
        let (manager, provider) = running().await;

        let response = manager
            .invoke_action(
                message::PLUGIN_ID,
                "broadcast",
                RouteRequest::new().with_body(json!({"serverId": "s1", "message": "Restart at {game} o'clock"})),
            )
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body["sent"], "[MOTD] Restart at minecraft o'clock");

        let missing = manager
            .invoke_action(message::PLUGIN_ID, "broadcast", RouteRequest::new())
            .await
            .unwrap();
        assert_eq!(missing.status, 400);
        assert_eq!(provider.api.commands().await.len(), 1);
    }

    #[tokio::test]
    async fn test_show_motd_preview() {
        let (manager, _) = running().await;
        let response = manager
            .invoke_route(
                message::PLUGIN_ID,
                RouteMethod::Get,
                "/motd",
                RouteRequest::new().with_query("server", "Lobby"),
            )
            .await
            .unwrap();
        assert_eq!(response.body["preview"], "[MOTD] Welcome to Lobby!");
        assert_eq!(response.body["prefix"], Value::from("[MOTD]"));
    }

    #[tokio::test]
    async fn test_routes_unmounted_when_disabled() {
        let (manager, _) = running().await;
        manager.disable(message::PLUGIN_ID).await.unwrap();

        assert_eq!(
            manager.state(message::PLUGIN_ID).await.unwrap().status(),
            PluginStatus::Disabled
        );
        assert!(
            manager
                .invoke_action(message::PLUGIN_ID, "stats", RouteRequest::new())
                .await
                .is_err()
        );
    }
}
