//! Hook event vocabulary, priorities, and the context handed to handlers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Every lifecycle point plugins may attach hook handlers to.
///
/// Filters are not restricted to this list; they use free-form names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PluginHookEvent {
    // ── Server lifecycle ──
    #[serde(rename = "server:beforeStart")]
    ServerBeforeStart,
    #[serde(rename = "server:afterStart")]
    ServerAfterStart,
    #[serde(rename = "server:beforeStop")]
    ServerBeforeStop,
    #[serde(rename = "server:afterStop")]
    ServerAfterStop,
    #[serde(rename = "server:beforeRestart")]
    ServerBeforeRestart,
    #[serde(rename = "server:afterRestart")]
    ServerAfterRestart,
    #[serde(rename = "server:beforeInstall")]
    ServerBeforeInstall,
    #[serde(rename = "server:afterInstall")]
    ServerAfterInstall,
    #[serde(rename = "server:statusChange")]
    ServerStatusChange,
    #[serde(rename = "server:created")]
    ServerCreated,
    #[serde(rename = "server:deleted")]
    ServerDeleted,
    #[serde(rename = "server:console")]
    ServerConsole,

    // ── Files ──
    #[serde(rename = "server:file:beforeWrite")]
    FileBeforeWrite,
    #[serde(rename = "server:file:afterWrite")]
    FileAfterWrite,
    #[serde(rename = "server:file:beforeDelete")]
    FileBeforeDelete,
    #[serde(rename = "server:file:afterDelete")]
    FileAfterDelete,

    // ── Backups ──
    #[serde(rename = "server:backup:beforeCreate")]
    BackupBeforeCreate,
    #[serde(rename = "server:backup:afterCreate")]
    BackupAfterCreate,
    #[serde(rename = "server:backup:beforeRestore")]
    BackupBeforeRestore,
    #[serde(rename = "server:backup:afterRestore")]
    BackupAfterRestore,

    // ── Schedules ──
    #[serde(rename = "server:schedule:beforeExecute")]
    ScheduleBeforeExecute,
    #[serde(rename = "server:schedule:afterExecute")]
    ScheduleAfterExecute,

    // ── Users ──
    #[serde(rename = "user:login")]
    UserLogin,
    #[serde(rename = "user:created")]
    UserCreated,

    // ── Plugins ──
    #[serde(rename = "plugin:enabled")]
    PluginEnabled,
    #[serde(rename = "plugin:disabled")]
    PluginDisabled,
    #[serde(rename = "plugin:configUpdated")]
    PluginConfigUpdated,
}

impl PluginHookEvent {
    /// All events, in declaration order.
    pub const ALL: [PluginHookEvent; 27] = [
        Self::ServerBeforeStart,
        Self::ServerAfterStart,
        Self::ServerBeforeStop,
        Self::ServerAfterStop,
        Self::ServerBeforeRestart,
        Self::ServerAfterRestart,
        Self::ServerBeforeInstall,
        Self::ServerAfterInstall,
        Self::ServerStatusChange,
        Self::ServerCreated,
        Self::ServerDeleted,
        Self::ServerConsole,
        Self::FileBeforeWrite,
        Self::FileAfterWrite,
        Self::FileBeforeDelete,
        Self::FileAfterDelete,
        Self::BackupBeforeCreate,
        Self::BackupAfterCreate,
        Self::BackupBeforeRestore,
        Self::BackupAfterRestore,
        Self::ScheduleBeforeExecute,
        Self::ScheduleAfterExecute,
        Self::UserLogin,
        Self::UserCreated,
        Self::PluginEnabled,
        Self::PluginDisabled,
        Self::PluginConfigUpdated,
    ];

    /// Returns the wire name of this event.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServerBeforeStart => "server:beforeStart",
            Self::ServerAfterStart => "server:afterStart",
            Self::ServerBeforeStop => "server:beforeStop",
            Self::ServerAfterStop => "server:afterStop",
            Self::ServerBeforeRestart => "server:beforeRestart",
            Self::ServerAfterRestart => "server:afterRestart",
            Self::ServerBeforeInstall => "server:beforeInstall",
            Self::ServerAfterInstall => "server:afterInstall",
            Self::ServerStatusChange => "server:statusChange",
            Self::ServerCreated => "server:created",
            Self::ServerDeleted => "server:deleted",
            Self::ServerConsole => "server:console",
            Self::FileBeforeWrite => "server:file:beforeWrite",
            Self::FileAfterWrite => "server:file:afterWrite",
            Self::FileBeforeDelete => "server:file:beforeDelete",
            Self::FileAfterDelete => "server:file:afterDelete",
            Self::BackupBeforeCreate => "server:backup:beforeCreate",
            Self::BackupAfterCreate => "server:backup:afterCreate",
            Self::BackupBeforeRestore => "server:backup:beforeRestore",
            Self::BackupAfterRestore => "server:backup:afterRestore",
            Self::ScheduleBeforeExecute => "server:schedule:beforeExecute",
            Self::ScheduleAfterExecute => "server:schedule:afterExecute",
            Self::UserLogin => "user:login",
            Self::UserCreated => "user:created",
            Self::PluginEnabled => "plugin:enabled",
            Self::PluginDisabled => "plugin:disabled",
            Self::PluginConfigUpdated => "plugin:configUpdated",
        }
    }
}

impl fmt::Display for PluginHookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown event name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hook event '{0}'")]
pub struct UnknownHookEvent(pub String);

impl FromStr for PluginHookEvent {
    type Err = UnknownHookEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| UnknownHookEvent(s.to_string()))
    }
}

/// Execution priority of a handler or filter.
///
/// Ordering is `Critical < High < Normal < Low`; lower sorts (and runs) first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum HookPriority {
    Critical,
    High,
    #[default]
    Normal,
    Low,
}

impl HookPriority {
    /// Returns the lowercase name of this priority.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for HookPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HookPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "normal" => Ok(Self::Normal),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown hook priority '{other}'")),
        }
    }
}

/// Caller-supplied part of a hook context.
///
/// The registry adds `event` and `timestamp` when it builds the
/// [`HookContext`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookPayload {
    /// Server the event concerns, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    /// User who triggered the event, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Arbitrary event data keyed by string.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl HookPayload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server ID.
    pub fn with_server(mut self, server_id: impl Into<String>) -> Self {
        self.server_id = Some(server_id.into());
        self
    }

    /// Sets the user ID.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Inserts a data value.
    pub fn with_data(mut self, key: &str, value: Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    /// Inserts a string value.
    pub fn with_string(self, key: &str, value: &str) -> Self {
        self.with_data(key, Value::from(value))
    }
}

/// Context handed to every handler and filter of one emission.
///
/// Built fresh per `emit`/`apply_filters` call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookContext {
    /// Event or filter name being processed.
    pub event: String,
    /// Server the event concerns, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    /// User who triggered the event, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Arbitrary event data.
    pub data: Map<String, Value>,
    /// When the emission started.
    pub timestamp: DateTime<Utc>,
}

impl HookContext {
    /// Builds a context from a caller payload, stamping the current time.
    pub fn from_payload(event: impl Into<String>, payload: HookPayload) -> Self {
        Self {
            event: event.into(),
            server_id: payload.server_id,
            user_id: payload.user_id,
            data: payload.data,
            timestamp: Utc::now(),
        }
    }

    /// Gets a data value by key.
    pub fn get_data(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Gets a string data value.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// Gets an i64 data value.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(|v| v.as_i64())
    }

    /// Gets a bool data value.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(|v| v.as_bool())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_round_trip_through_from_str() {
        for event in PluginHookEvent::ALL {
            let parsed: PluginHookEvent = event.as_str().parse().expect("known event");
            assert_eq!(parsed, event);
        }
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let err = "server:exploded".parse::<PluginHookEvent>().unwrap_err();
        assert_eq!(err, UnknownHookEvent("server:exploded".to_string()));
        assert!("Server:AfterStart".parse::<PluginHookEvent>().is_err());
    }

    #[test]
    fn test_event_serde_uses_wire_name() {
        let json = serde_json::to_string(&PluginHookEvent::FileBeforeWrite).expect("serialize");
        assert_eq!(json, "\"server:file:beforeWrite\"");
        let parsed: PluginHookEvent =
            serde_json::from_str("\"plugin:configUpdated\"").expect("deserialize");
        assert_eq!(parsed, PluginHookEvent::PluginConfigUpdated);
    }

    #[test]
    fn test_priority_total_order() {
        assert!(HookPriority::Critical < HookPriority::High);
        assert!(HookPriority::High < HookPriority::Normal);
        assert!(HookPriority::Normal < HookPriority::Low);
        assert_eq!(HookPriority::default(), HookPriority::Normal);
        assert_eq!("low".parse::<HookPriority>(), Ok(HookPriority::Low));
    }

    #[test]
    fn test_context_from_payload() {
        let payload = HookPayload::new()
            .with_server("s1")
            .with_string("line", "Done (3.2s)!");
        let ctx = HookContext::from_payload("server:console", payload);
        assert_eq!(ctx.event, "server:console");
        assert_eq!(ctx.server_id.as_deref(), Some("s1"));
        assert!(ctx.user_id.is_none());
        assert_eq!(ctx.get_string("line"), Some("Done (3.2s)!"));
    }
}
