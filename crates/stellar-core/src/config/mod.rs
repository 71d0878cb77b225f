//! Host configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! optional TOML files plus `STELLAR__*` environment variables. Each
//! sub-module represents a logical configuration section.

pub mod logging;
pub mod plugin;

use serde::{Deserialize, Serialize};

use self::logging::LoggingConfig;
use self::plugin::PluginSystemConfig;

use crate::error::AppError;

/// Root host configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    /// Deployment environment name (`"development"`, `"production"`, ...).
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Plugin runtime settings.
    #[serde(default)]
    pub plugins: PluginSystemConfig,
    /// Game servers managed by this host.
    #[serde(default)]
    pub servers: Vec<ServerDefinition>,
}

/// A game server known to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDefinition {
    /// Stable server identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Game type, e.g. `"minecraft"`.
    #[serde(default = "default_game_type")]
    pub game_type: String,
}

impl HostConfig {
    /// Load configuration from TOML files and the environment.
    ///
    /// Merges `config/default`, an environment-specific overlay
    /// `config/<env>`, and environment variables prefixed with `STELLAR__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("STELLAR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let mut host: HostConfig = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        if host.environment.is_empty() {
            host.environment = env.to_string();
        }

        Ok(host)
    }

    /// Returns whether the host runs in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_game_type() -> String {
    "*".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let host: HostConfig = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(host.environment, "development");
        assert!(!host.is_production());
        assert_eq!(host.logging.level, "info");
        assert!(host.plugins.enable_built_ins);
        assert!(host.plugins.handler_timeout_ms.is_none());
        assert!(host.servers.is_empty());
    }

    #[test]
    fn test_production_flag_is_case_insensitive() {
        let host: HostConfig =
            serde_json::from_str(r#"{"environment":"Production"}"#).expect("deserialize");
        assert!(host.is_production());
    }

    #[test]
    fn test_server_definition_game_type_default() {
        let server: ServerDefinition =
            serde_json::from_str(r#"{"id":"s1","name":"Survival"}"#).expect("deserialize");
        assert_eq!(server.game_type, "*");
    }
}
