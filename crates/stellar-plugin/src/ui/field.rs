//! Form field descriptions.
//!
//! Constraints here drive the host's client-side UX only. The action handler
//! receiving the submitted data stays authoritative.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Pattern;

/// Properties shared by every field kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldBase {
    /// Key of the value in the submitted document.
    pub name: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldBase {
    pub fn new(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            description: None,
            required: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringField {
    #[serde(flatten)]
    pub base: FieldBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Pattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberField {
    #[serde(flatten)]
    pub base: FieldBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanField {
    #[serde(flatten)]
    pub base: FieldBase,
}

/// One choice of a select field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: Value,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectField {
    #[serde(flatten)]
    pub base: FieldBase,
    pub options: Vec<SelectOption>,
    #[serde(default)]
    pub multiple: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextareaField {
    #[serde(flatten)]
    pub base: FieldBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordField {
    #[serde(flatten)]
    pub base: FieldBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

/// A form field; `type` selects which constraints apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldSchema {
    String(StringField),
    Number(NumberField),
    Boolean(BooleanField),
    Select(SelectField),
    Textarea(TextareaField),
    Password(PasswordField),
}

impl FieldSchema {
    pub fn string(base: FieldBase) -> Self {
        Self::String(StringField {
            base,
            min_length: None,
            max_length: None,
            pattern: None,
            placeholder: None,
        })
    }

    pub fn number(base: FieldBase, min: Option<f64>, max: Option<f64>) -> Self {
        Self::Number(NumberField {
            base,
            min,
            max,
            step: None,
        })
    }

    pub fn boolean(base: FieldBase) -> Self {
        Self::Boolean(BooleanField { base })
    }

    pub fn select(base: FieldBase, options: &[(&str, &str)]) -> Self {
        Self::Select(SelectField {
            base,
            options: options
                .iter()
                .map(|(value, label)| SelectOption {
                    value: Value::from(*value),
                    label: label.to_string(),
                })
                .collect(),
            multiple: false,
        })
    }

    pub fn textarea(base: FieldBase, rows: u32) -> Self {
        Self::Textarea(TextareaField {
            base,
            rows: Some(rows),
            min_length: None,
            max_length: None,
            placeholder: None,
        })
    }

    pub fn base(&self) -> &FieldBase {
        match self {
            Self::String(f) => &f.base,
            Self::Number(f) => &f.base,
            Self::Boolean(f) => &f.base,
            Self::Select(f) => &f.base,
            Self::Textarea(f) => &f.base,
            Self::Password(f) => &f.base,
        }
    }

    pub fn name(&self) -> &str {
        &self.base().name
    }

    /// Wire name of the field kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::Select(_) => "select",
            Self::Textarea(_) => "textarea",
            Self::Password(_) => "password",
        }
    }

    /// Checks the declaration itself, returning every problem found.
    pub fn structural_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.name().trim().is_empty() {
            errors.push("field name must not be empty".to_string());
        }

        match self {
            Self::String(f) => {
                length_bounds(f.min_length, f.max_length, &mut errors);
                if let Some(e) = f.pattern.as_ref().and_then(Pattern::error) {
                    errors.push(format!("invalid pattern: {e}"));
                }
            }
            Self::Textarea(f) => length_bounds(f.min_length, f.max_length, &mut errors),
            Self::Password(f) => length_bounds(f.min_length, f.max_length, &mut errors),
            Self::Number(f) => {
                if let (Some(min), Some(max)) = (f.min, f.max) {
                    if min > max {
                        errors.push("min must not exceed max".to_string());
                    }
                }
                if f.step.is_some_and(|s| s <= 0.0) {
                    errors.push("step must be positive".to_string());
                }
            }
            Self::Select(f) => {
                if f.options.is_empty() {
                    errors.push("select needs at least one option".to_string());
                }
            }
            Self::Boolean(_) => {}
        }
        errors
    }

    /// Advisory check of a submitted value. Returns a message on mismatch.
    pub fn check(&self, value: &Value) -> Option<String> {
        if value.is_null() {
            return self
                .base()
                .required
                .then(|| format!("{} is required", self.base().label));
        }

        match self {
            Self::String(f) => check_text(
                value,
                f.min_length,
                f.max_length,
                f.pattern.as_ref(),
            ),
            Self::Textarea(f) => check_text(value, f.min_length, f.max_length, None),
            Self::Password(f) => check_text(value, f.min_length, f.max_length, None),
            Self::Number(f) => {
                let Some(n) = value.as_f64() else {
                    return Some("expected a number".to_string());
                };
                if f.min.is_some_and(|min| n < min) {
                    return Some("is below the minimum".to_string());
                }
                if f.max.is_some_and(|max| n > max) {
                    return Some("is above the maximum".to_string());
                }
                None
            }
            Self::Boolean(_) => (!value.is_boolean()).then(|| "expected a boolean".to_string()),
            Self::Select(f) => {
                let allowed = |v: &Value| f.options.iter().any(|o| &o.value == v);
                match (f.multiple, value) {
                    (true, Value::Array(items)) if items.iter().all(allowed) => None,
                    (true, Value::Array(_)) => Some("contains an unknown option".to_string()),
                    (true, _) => Some("expected a list of options".to_string()),
                    (false, v) if allowed(v) => None,
                    (false, _) => Some("is not one of the options".to_string()),
                }
            }
        }
    }
}

fn length_bounds(min: Option<usize>, max: Option<usize>, errors: &mut Vec<String>) {
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            errors.push("minLength must not exceed maxLength".to_string());
        }
    }
}

fn check_text(
    value: &Value,
    min: Option<usize>,
    max: Option<usize>,
    pattern: Option<&Pattern>,
) -> Option<String> {
    let Some(text) = value.as_str() else {
        return Some("expected text".to_string());
    };
    let len = text.chars().count();
    if min.is_some_and(|m| len < m) {
        return Some("is too short".to_string());
    }
    if max.is_some_and(|m| len > m) {
        return Some("is too long".to_string());
    }
    if let Some(pattern) = pattern {
        if !pattern.is_match(text) {
            return Some("does not match the expected format".to_string());
        }
    }
    None
}
