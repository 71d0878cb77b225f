//! JSON-Schema-like description of a plugin's config document.
//!
//! Only the subset plugins actually use is supported: a flat object with
//! typed properties, `required`, `enum`, numeric bounds, string length
//! bounds, `pattern`, and per-property `default`.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::PluginConfig;

/// JSON type of a config property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl PropertyType {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// A `pattern` constraint, compiled once when the schema is built or parsed.
///
/// Serializes as the plain pattern string. An invalid pattern is kept so
/// [`ConfigSchema::parse`] can report it; it never matches anything.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Pattern {
    source: String,
    compiled: Result<Regex, regex::Error>,
}

impl Pattern {
    /// Compiles `source`.
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            compiled: Regex::new(source),
        }
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Compile error, if the pattern is not a valid regex.
    pub fn error(&self) -> Option<&regex::Error> {
        self.compiled.as_ref().err()
    }

    /// Whether `text` matches. Always false for an invalid pattern.
    pub fn is_match(&self, text: &str) -> bool {
        self.compiled.as_ref().is_ok_and(|re| re.is_match(text))
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl From<String> for Pattern {
    fn from(source: String) -> Self {
        let compiled = Regex::new(&source);
        Self { source, compiled }
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.source
    }
}

/// Schema for a single config property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Pattern>,
}

impl PropertySchema {
    /// A property of type `kind` without constraints.
    pub fn new(kind: PropertyType) -> Self {
        Self {
            kind,
            description: None,
            default: None,
            allowed: None,
            minimum: None,
            maximum: None,
            min_length: None,
            max_length: None,
            pattern: None,
        }
    }

    /// Sets the human-readable description.
    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Sets the value used when the setting is absent.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Restricts the value to `values`.
    pub fn one_of(mut self, values: Vec<Value>) -> Self {
        self.allowed = Some(values);
        self
    }

    /// Numeric bounds, inclusive.
    pub fn range(mut self, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    /// String length bounds in characters, inclusive.
    pub fn length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    /// Regex the string value must match.
    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(Pattern::new(pattern));
        self
    }
}

/// Schema for a plugin's whole config document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSchema {
    #[serde(rename = "type", default = "object_type")]
    pub kind: PropertyType,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default = "default_true")]
    pub additional_properties: bool,
}

/// A single way in which a config document breaks its schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{key}: {message}")]
pub struct ConfigViolation {
    /// Offending key.
    pub key: String,
    /// What is wrong with it.
    pub message: String,
}

impl ConfigViolation {
    fn new(key: &str, message: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

impl ConfigSchema {
    /// An empty object schema accepting additional properties.
    pub fn object() -> Self {
        Self {
            kind: PropertyType::Object,
            properties: BTreeMap::new(),
            required: Vec::new(),
            additional_properties: true,
        }
    }

    /// Adds or replaces a property.
    pub fn property(mut self, key: &str, schema: PropertySchema) -> Self {
        self.properties.insert(key.to_string(), schema);
        self
    }

    /// Marks a property as required.
    pub fn require(mut self, key: &str) -> Self {
        self.required.push(key.to_string());
        self
    }

    /// Parses a schema document, checking that it is internally consistent.
    pub fn parse(raw: &Value) -> Result<Self, String> {
        let schema: ConfigSchema =
            serde_json::from_value(raw.clone()).map_err(|e| format!("invalid schema: {e}"))?;

        if schema.kind != PropertyType::Object {
            return Err("top-level schema type must be \"object\"".to_string());
        }

        for (key, property) in &schema.properties {
            if let Some(e) = property.pattern.as_ref().and_then(Pattern::error) {
                return Err(format!("property '{key}' has an invalid pattern: {e}"));
            }
            if let (Some(min), Some(max)) = (property.minimum, property.maximum) {
                if min > max {
                    return Err(format!("property '{key}' has minimum > maximum"));
                }
            }
            if let (Some(min), Some(max)) = (property.min_length, property.max_length) {
                if min > max {
                    return Err(format!("property '{key}' has minLength > maxLength"));
                }
            }
        }

        for key in &schema.required {
            if !schema.properties.contains_key(key) {
                return Err(format!("required property '{key}' is not declared"));
            }
        }

        Ok(schema)
    }

    /// Collects every property `default` into a config document.
    pub fn defaults(&self) -> PluginConfig {
        let map: Map<String, Value> = self
            .properties
            .iter()
            .filter_map(|(key, prop)| prop.default.clone().map(|v| (key.clone(), v)))
            .collect();
        PluginConfig::from(map)
    }

    /// Validates `config`, returning every violation found.
    pub fn validate(&self, config: &PluginConfig) -> Result<(), Vec<ConfigViolation>> {
        let mut violations = Vec::new();

        for key in &self.required {
            if config.get(key).is_none_or(Value::is_null) {
                violations.push(ConfigViolation::new(key, "is required"));
            }
        }

        for (key, value) in config.as_map() {
            match self.properties.get(key) {
                Some(property) => check_property(key, property, value, &mut violations),
                None if !self.additional_properties => {
                    violations.push(ConfigViolation::new(key, "is not a known setting"));
                }
                None => {}
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

fn check_property(
    key: &str,
    property: &PropertySchema,
    value: &Value,
    violations: &mut Vec<ConfigViolation>,
) {
    if value.is_null() {
        return;
    }

    if !property.kind.accepts(value) {
        violations.push(ConfigViolation::new(
            key,
            format!("expected {:?}", property.kind).to_lowercase(),
        ));
        return;
    }

    if let Some(allowed) = &property.allowed {
        if !allowed.contains(value) {
            violations.push(ConfigViolation::new(key, "is not one of the allowed values"));
        }
    }

    if let Some(number) = value.as_f64() {
        if property.minimum.is_some_and(|min| number < min) {
            violations.push(ConfigViolation::new(key, "is below the minimum"));
        }
        if property.maximum.is_some_and(|max| number > max) {
            violations.push(ConfigViolation::new(key, "is above the maximum"));
        }
    }

    if let Some(text) = value.as_str() {
        let len = text.chars().count();
        if property.min_length.is_some_and(|min| len < min) {
            violations.push(ConfigViolation::new(key, "is too short"));
        }
        if property.max_length.is_some_and(|max| len > max) {
            violations.push(ConfigViolation::new(key, "is too long"));
        }
        if let Some(pattern) = &property.pattern {
            if !pattern.is_match(text) {
                violations.push(ConfigViolation::new(key, "does not match the pattern"));
            }
        }
    }
}

fn object_type() -> PropertyType {
    PropertyType::Object
}

fn default_true() -> bool {
    true
}
