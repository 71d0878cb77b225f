//! Scoped logger handed to plugins.

use tracing::{debug, error, info, warn};

/// Forwards plugin log lines to `tracing`, prefixed with `[Plugin:<id>]`.
#[derive(Debug, Clone)]
pub struct PluginLogger {
    plugin_id: String,
    prefix: String,
    production: bool,
}

impl PluginLogger {
    /// Creates a logger for `plugin_id`. Debug lines are dropped when
    /// `production` is set.
    pub fn new(plugin_id: &str, production: bool) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            prefix: format!("[Plugin:{plugin_id}]"),
            production,
        }
    }

    /// The `[Plugin:<id>]` prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether debug lines are emitted.
    pub fn debug_enabled(&self) -> bool {
        !self.production
    }

    /// Logs at info level.
    pub fn info(&self, message: &str) {
        info!(plugin_id = %self.plugin_id, "{} {}", self.prefix, message);
    }

    /// Logs at warn level.
    pub fn warn(&self, message: &str) {
        warn!(plugin_id = %self.plugin_id, "{} {}", self.prefix, message);
    }

    /// Logs at error level.
    pub fn error(&self, message: &str) {
        error!(plugin_id = %self.plugin_id, "{} {}", self.prefix, message);
    }

    /// Logs at debug level unless running in production.
    pub fn debug(&self, message: &str) {
        if self.debug_enabled() {
            debug!(plugin_id = %self.plugin_id, "{} {}", self.prefix, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_carries_plugin_id() {
        let logger = PluginLogger::new("motd", false);
        assert_eq!(logger.prefix(), "[Plugin:motd]");
        assert!(logger.debug_enabled());
    }

    #[test]
    fn test_production_suppresses_debug() {
        let logger = PluginLogger::new("motd", true);
        assert!(!logger.debug_enabled());
        logger.debug("not emitted");
        logger.info("still emitted");
    }
}
