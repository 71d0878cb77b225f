//! Manifest, config schema and message templating for the MOTD plugin.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use stellar_plugin::api::permissions;
use stellar_plugin::prelude::*;

pub const PLUGIN_ID: &str = "motd";

/// Filter the host applies to a server's message of the day.
pub const MOTD_FILTER: &str = "server:motd";

/// Placeholders a message template may use.
pub const PLACEHOLDERS: [&str; 3] = ["server", "game", "player"];

pub const DEFAULT_MESSAGE: &str = "Welcome to {server}!";
pub const DEFAULT_PREFIX: &str = "[MOTD]";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_]+)\}").expect("placeholder pattern compiles"));

static PLAYER_JOINED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)([A-Za-z0-9_]{1,16}) joined the game").expect("join pattern compiles")
});

/// The plugin's manifest.
pub fn manifest() -> PluginManifest {
    ManifestBuilder::new(PLUGIN_ID, "Message of the Day", env!("CARGO_PKG_VERSION"))
        .description("Greets players and announces a message when servers start")
        .author("Stellar Team")
        .category(PluginCategory::ServerManagement)
        .permission(permissions::SERVERS_READ)
        .permission(permissions::SERVERS_COMMAND)
        .hook(PluginHookEvent::ServerAfterStart)
        .hook(PluginHookEvent::ServerConsole)
        .config_schema(config_schema())
        .build()
}

fn config_schema() -> ConfigSchema {
    ConfigSchema::object()
        .property(
            "message",
            PropertySchema::new(PropertyType::String)
                .describe("Message template; {server}, {game} and {player} are replaced")
                .length(Some(1), Some(200))
                .with_default(json!(DEFAULT_MESSAGE)),
        )
        .property(
            "prefix",
            PropertySchema::new(PropertyType::String)
                .length(None, Some(32))
                .with_default(json!(DEFAULT_PREFIX)),
        )
        .property(
            "announceOnStart",
            PropertySchema::new(PropertyType::Boolean).with_default(json!(true)),
        )
        .property(
            "greetPlayers",
            PropertySchema::new(PropertyType::Boolean).with_default(json!(false)),
        )
        .require("message")
}

/// Values substituted into a template.
#[derive(Debug, Clone, Default)]
pub struct MessageVars<'a> {
    pub server: Option<&'a str>,
    pub game: Option<&'a str>,
    pub player: Option<&'a str>,
}

/// Replaces known placeholders; unknown or unset ones are left as written.
pub fn render(template: &str, vars: &MessageVars<'_>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures<'_>| {
            let value = match &caps[1] {
                "server" => vars.server,
                "game" => vars.game,
                "player" => vars.player,
                _ => None,
            };
            value.map_or_else(|| caps[0].to_string(), str::to_string)
        })
        .into_owned()
}

/// Returns the first placeholder in `template` that isn't supported.
pub fn unknown_placeholder(template: &str) -> Option<String> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .find(|name| !PLACEHOLDERS.contains(&name.as_str()))
}

/// Extracts the player name from a "joined the game" console line.
pub fn joined_player(line: &str) -> Option<&str> {
    PLAYER_JOINED
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Full console line: prefix and rendered message.
pub fn announcement(config: &PluginConfig, vars: &MessageVars<'_>) -> String {
    let message = render(
        config.get_str("message").unwrap_or(DEFAULT_MESSAGE),
        vars,
    );
    match config.get_str("prefix").filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{prefix} {message}"),
        None => message,
    }
}
