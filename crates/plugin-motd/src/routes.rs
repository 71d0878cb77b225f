//! HTTP routes of the MOTD plugin.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use stellar_plugin::prelude::*;
use stellar_plugin::route::RouteHandler;

use crate::hooks::{self, TOTAL_KEY};
use crate::message::{self, MessageVars};
use crate::plugin::ActiveContext;

/// `GET /motd`: the current template and a preview.
pub struct ShowMotd {
    active: Arc<ActiveContext>,
}

#[async_trait]
impl RouteHandler for ShowMotd {
    async fn handle(&self, request: RouteRequest) -> AppResult<RouteResponse> {
        self.active.get().await?;
        let template = request
            .config
            .get_str("message")
            .unwrap_or(message::DEFAULT_MESSAGE);
        let server = request.query.get("server").map(String::as_str);
        Ok(RouteResponse::ok(json!({
            "message": template,
            "prefix": request.config.get_str("prefix"),
            "preview": message::announcement(
                &request.config,
                &MessageVars { server, ..Default::default() },
            ),
        })))
    }
}

/// `POST /broadcast`: announce now on one server.
///
/// Body: `{"serverId": "...", "message": "..."}`; `message` falls back to the
/// configured template.
pub struct Broadcast {
    active: Arc<ActiveContext>,
}

#[async_trait]
impl RouteHandler for Broadcast {
    async fn handle(&self, request: RouteRequest) -> AppResult<RouteResponse> {
        let ctx = self.active.get().await?;

        let Some(server_id) = request.body.get("serverId").and_then(|v| v.as_str()) else {
            return Ok(RouteResponse::with_status(
                400,
                json!({ "error": "serverId is required" }),
            ));
        };
        let server = ctx.api().servers.get(server_id).await?;

        let mut config = request.config.clone();
        if let Some(custom) = request
            .body
            .get("message")
            .and_then(|v| v.as_str())
            .filter(|m| !m.trim().is_empty())
        {
            if let Some(name) = message::unknown_placeholder(custom) {
                return Ok(RouteResponse::with_status(
                    400,
                    json!({ "error": format!("unknown placeholder {{{name}}}") }),
                ));
            }
            config.set("message", json!(custom));
        }

        let line = message::announcement(
            &config,
            &MessageVars {
                server: Some(&server.name),
                game: Some(&server.game_type),
                player: None,
            },
        );
        let total = hooks::broadcast(&ctx, server_id, &line).await?;

        Ok(RouteResponse::ok(json!({ "sent": line, "total": total })))
    }
}

/// `GET /stats`: broadcast counters.
pub struct Stats {
    active: Arc<ActiveContext>,
}

#[async_trait]
impl RouteHandler for Stats {
    async fn handle(&self, _request: RouteRequest) -> AppResult<RouteResponse> {
        let ctx = self.active.get().await?;
        let storage = &ctx.api().storage;

        let total = storage
            .get(TOTAL_KEY)
            .await?
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let servers = storage
            .keys()
            .await?
            .into_iter()
            .filter(|k| k.starts_with("broadcasts:server:"))
            .count();

        Ok(RouteResponse::ok(json!({ "total": total, "servers": servers })))
    }
}

/// All routes, sharing the plugin's live context slot.
pub fn routes(active: Arc<ActiveContext>) -> Vec<PluginRoute> {
    vec![
        PluginRoute::get(
            "/motd",
            Arc::new(ShowMotd {
                active: active.clone(),
            }),
        )
        .describe("Current message template with a rendered preview"),
        PluginRoute::post(
            "/broadcast",
            Arc::new(Broadcast {
                active: active.clone(),
            }),
        )
        .describe("Announce the message on a server right away")
        .admin_only(),
        PluginRoute::get("/stats", Arc::new(Stats { active }))
            .describe("Broadcast counters"),
    ]
}
