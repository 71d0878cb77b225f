//! Plugin configuration documents.
//!
//! A plugin's config is a JSON object validated against the manifest's
//! [`ConfigSchema`] whenever it is applied.

pub mod schema;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use schema::{ConfigSchema, ConfigViolation, Pattern, PropertySchema, PropertyType};

/// A plugin's configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginConfig(Map<String, Value>);

impl PluginConfig {
    /// Creates an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a config from a JSON value; non-objects yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Sets a value, returning `self` for chaining.
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    /// Sets a value.
    pub fn set(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }

    /// Gets a value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Gets a string value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Gets an i64 value.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    /// Gets an f64 value.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    /// Gets a bool value.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// Shallow merge: every top-level key in `updates` replaces ours.
    pub fn merge(&mut self, updates: &PluginConfig) {
        for (key, value) in &updates.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Returns a copy of `self` with `updates` merged in.
    pub fn merged(&self, updates: &PluginConfig) -> PluginConfig {
        let mut out = self.clone();
        out.merge(updates);
        out
    }

    /// Returns the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns the config as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the config has no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for PluginConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_merge_is_shallow() {
        let mut config = PluginConfig::new()
            .with("message", json!("hello"))
            .with("limits", json!({"max": 3, "min": 1}));
        let updates = PluginConfig::new().with("limits", json!({"max": 5}));

        config.merge(&updates);

        assert_eq!(config.get_str("message"), Some("hello"));
        assert_eq!(config.get("limits"), Some(&json!({"max": 5})));
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(PluginConfig::from_value(json!([1, 2])).is_none());
        let config = PluginConfig::from_value(json!({"enabled": true})).expect("object");
        assert_eq!(config.get_bool("enabled"), Some(true));
    }
}
