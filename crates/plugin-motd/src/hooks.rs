//! Hook and filter handlers for the MOTD plugin.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::debug;

use stellar_plugin::hooks::{FilterHandler, HookHandler};
use stellar_plugin::prelude::*;

use crate::message::{self, MessageVars};

/// Storage key of the broadcast counter across all servers.
pub const TOTAL_KEY: &str = "broadcasts:total";

/// Storage key of one server's broadcast counter.
pub fn server_key(server_id: &str) -> String {
    format!("broadcasts:server:{server_id}")
}

/// Sends `line` to the server console and bumps the broadcast counters.
pub async fn broadcast(ctx: &PluginContext, server_id: &str, line: &str) -> AppResult<u64> {
    let api = ctx.api();
    api.servers
        .send_command(server_id, &format!("say {line}"))
        .await?;

    let total = increment(ctx, TOTAL_KEY).await?;
    increment(ctx, &server_key(server_id)).await?;
    api.storage
        .set(
            &format!("last:{server_id}"),
            json!({ "message": line, "at": Utc::now().to_rfc3339() }),
        )
        .await?;

    ctx.log().debug(&format!("Broadcast to {server_id}: {line}"));
    Ok(total)
}

async fn increment(ctx: &PluginContext, key: &str) -> AppResult<u64> {
    let storage = &ctx.api().storage;
    let next = storage
        .get(key)
        .await?
        .and_then(|v| v.as_u64())
        .unwrap_or(0)
        + 1;
    storage.set(key, json!(next)).await?;
    Ok(next)
}

/// Announces the message when a server finishes starting.
pub struct ServerStartedHook {
    ctx: Arc<PluginContext>,
}

impl ServerStartedHook {
    pub fn new(ctx: Arc<PluginContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl HookHandler for ServerStartedHook {
    async fn handle(&self, hook: &HookContext) -> AppResult<()> {
        let config = self.ctx.config().await;
        if !config.get_bool("announceOnStart").unwrap_or(true) {
            return Ok(());
        }
        let Some(server_id) = hook.server_id.as_deref() else {
            debug!(plugin_id = %self.ctx.plugin_id(), "server:afterStart without a server id");
            return Ok(());
        };

        let server = self.ctx.api().servers.get(server_id).await?;
        let line = message::announcement(
            &config,
            &MessageVars {
                server: Some(&server.name),
                game: Some(&server.game_type),
                player: None,
            },
        );
        broadcast(&self.ctx, server_id, &line).await?;
        Ok(())
    }
}

/// Greets players as they join, when enabled in the config.
pub struct PlayerJoinHook {
    ctx: Arc<PluginContext>,
}

impl PlayerJoinHook {
    pub fn new(ctx: Arc<PluginContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl HookHandler for PlayerJoinHook {
    async fn handle(&self, hook: &HookContext) -> AppResult<()> {
        let config = self.ctx.config().await;
        if !config.get_bool("greetPlayers").unwrap_or(false) {
            return Ok(());
        }
        let (Some(server_id), Some(line)) = (hook.server_id.as_deref(), hook.get_string("line"))
        else {
            return Ok(());
        };
        let Some(player) = message::joined_player(line) else {
            return Ok(());
        };

        let greeting = message::render(
            config.get_str("message").unwrap_or(message::DEFAULT_MESSAGE),
            &MessageVars {
                server: Some(server_id),
                game: None,
                player: Some(player),
            },
        );
        self.ctx
            .api()
            .servers
            .send_command(server_id, &format!("tell {player} {greeting}"))
            .await
    }
}

/// Replaces the server's MOTD with the rendered template.
pub struct MotdFilter {
    ctx: Arc<PluginContext>,
}

impl MotdFilter {
    pub fn new(ctx: Arc<PluginContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl FilterHandler for MotdFilter {
    async fn apply(&self, value: Value, hook: &HookContext) -> AppResult<Value> {
        if !value.is_string() {
            return Ok(value);
        }
        let config = self.ctx.config().await;
        let rendered = message::render(
            config.get_str("message").unwrap_or(message::DEFAULT_MESSAGE),
            &MessageVars {
                server: hook.get_string("serverName").or(hook.server_id.as_deref()),
                game: hook.get_string("gameType"),
                player: None,
            },
        );
        Ok(Value::String(rendered))
    }
}
