//! Declarative UI schemas.
//!
//! Each variant is plain data. The host renders it with its own generic
//! component and calls back into the plugin only through action ids.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::field::FieldSchema;

/// A column of a tabular view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableColumn {
    /// Key of the value in each row object.
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub sortable: bool,
}

impl TableColumn {
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            sortable: false,
        }
    }
}

/// A per-row button of a data table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowAction {
    pub label: String,
    pub action_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm: Option<String>,
}

/// Search a catalog and install an entry from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAndInstallSchema {
    pub search_action_id: String,
    pub install_action_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub result_columns: Vec<TableColumn>,
}

/// A form submitted to one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    pub fields: Vec<FieldSchema>,
    pub submit_action_id: String,
    /// Action returning the values the form starts from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_action_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_label: Option<String>,
}

/// Rows fetched from an action, rendered as a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTableSchema {
    pub data_action_id: String,
    pub columns: Vec<TableColumn>,
    #[serde(default)]
    pub row_actions: Vec<RowAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

/// Visual weight of an action button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonVariant {
    #[default]
    Primary,
    Secondary,
    Danger,
}

/// A single button bound to an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionButtonSchema {
    pub label: String,
    pub action_id: String,
    #[serde(default)]
    pub variant: ButtonVariant,
    /// Confirmation prompt shown before the action runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm: Option<String>,
}

/// A labelled number in a stats view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatItem {
    pub key: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Key figures fetched from an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSchema {
    pub data_action_id: String,
    pub items: Vec<StatItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval_secs: Option<u32>,
}

/// One titled part of a compound view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub schema: UiSchema,
}

/// Several schemas stacked on one surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundSchema {
    pub sections: Vec<CompoundSection>,
}

/// A declarative description of one UI surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiSchema {
    SearchAndInstall(SearchAndInstallSchema),
    Form(FormSchema),
    DataTable(DataTableSchema),
    ActionButton(ActionButtonSchema),
    Stats(StatsSchema),
    Compound(CompoundSchema),
}

impl UiSchema {
    /// Wire name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SearchAndInstall(_) => "search-and-install",
            Self::Form(_) => "form",
            Self::DataTable(_) => "data-table",
            Self::ActionButton(_) => "action-button",
            Self::Stats(_) => "stats",
            Self::Compound(_) => "compound",
        }
    }

    /// Every action id referenced, including nested sections, in declaration order.
    pub fn action_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        self.collect_action_ids(&mut ids);
        ids
    }

    fn collect_action_ids<'a>(&'a self, ids: &mut Vec<&'a str>) {
        match self {
            Self::SearchAndInstall(s) => {
                ids.push(&s.search_action_id);
                ids.push(&s.install_action_id);
            }
            Self::Form(s) => {
                if let Some(load) = &s.load_action_id {
                    ids.push(load);
                }
                ids.push(&s.submit_action_id);
            }
            Self::DataTable(s) => {
                ids.push(&s.data_action_id);
                ids.extend(s.row_actions.iter().map(|a| a.action_id.as_str()));
            }
            Self::ActionButton(s) => ids.push(&s.action_id),
            Self::Stats(s) => ids.push(&s.data_action_id),
            Self::Compound(s) => {
                for section in &s.sections {
                    section.schema.collect_action_ids(ids);
                }
            }
        }
    }

    /// Checks the schema's structure, returning every problem as
    /// `"<path>: <message>"`.
    pub fn structural_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        self.collect_errors(self.kind(), &mut errors);
        errors
    }

    fn collect_errors(&self, path: &str, errors: &mut Vec<String>) {
        for id in self.own_action_ids() {
            if id.trim().is_empty() {
                errors.push(format!("{path}: action id must not be empty"));
            }
        }

        match self {
            Self::SearchAndInstall(s) => check_columns(path, &s.result_columns, errors),
            Self::Form(s) => {
                if s.fields.is_empty() {
                    errors.push(format!("{path}: form needs at least one field"));
                }
                let mut names = HashSet::new();
                for field in &s.fields {
                    if !names.insert(field.name()) {
                        errors.push(format!("{path}: duplicate field '{}'", field.name()));
                    }
                    for e in field.structural_errors() {
                        errors.push(format!("{path}.{}: {e}", field.name()));
                    }
                }
            }
            Self::DataTable(s) => {
                if s.columns.is_empty() {
                    errors.push(format!("{path}: table needs at least one column"));
                }
                check_columns(path, &s.columns, errors);
                if s.page_size == Some(0) {
                    errors.push(format!("{path}: page size must be positive"));
                }
            }
            Self::ActionButton(s) => {
                if s.label.trim().is_empty() {
                    errors.push(format!("{path}: button label must not be empty"));
                }
            }
            Self::Stats(s) => {
                if s.items.is_empty() {
                    errors.push(format!("{path}: stats need at least one item"));
                }
                let mut keys = HashSet::new();
                for item in &s.items {
                    if !keys.insert(item.key.as_str()) {
                        errors.push(format!("{path}: duplicate stat '{}'", item.key));
                    }
                }
            }
            Self::Compound(s) => {
                if s.sections.is_empty() {
                    errors.push(format!("{path}: compound needs at least one section"));
                }
                for (i, section) in s.sections.iter().enumerate() {
                    let nested = format!("{path}.sections[{i}]");
                    section.schema.collect_errors(&nested, errors);
                }
            }
        }
    }

    fn own_action_ids(&self) -> Vec<&str> {
        match self {
            Self::Compound(_) => Vec::new(),
            other => other.action_ids(),
        }
    }
}

fn check_columns(path: &str, columns: &[TableColumn], errors: &mut Vec<String>) {
    let mut keys = HashSet::new();
    for column in columns {
        if column.key.trim().is_empty() {
            errors.push(format!("{path}: column key must not be empty"));
        } else if !keys.insert(column.key.as_str()) {
            errors.push(format!("{path}: duplicate column '{}'", column.key));
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ui::field::FieldBase;

    fn settings_form() -> UiSchema {
        UiSchema::Form(FormSchema {
            fields: vec![
                FieldSchema::string(FieldBase::new("message", "Message").required()),
                FieldSchema::number(FieldBase::new("interval", "Interval"), Some(10.0), None),
            ],
            submit_action_id: "settings".to_string(),
            load_action_id: Some("motd".to_string()),
            submit_label: None,
        })
    }

    #[test]
    fn test_wire_shape_uses_type_tag() {
        let value = serde_json::to_value(settings_form()).unwrap();
        assert_eq!(value["type"], "form");
        assert_eq!(value["submitActionId"], "settings");
        assert_eq!(value["fields"][0]["type"], "string");

        let parsed: UiSchema = serde_json::from_value(json!({
            "type": "action-button",
            "label": "Broadcast now",
            "actionId": "broadcast",
            "variant": "danger"
        }))
        .unwrap();
        assert_eq!(parsed.kind(), "action-button");
        assert_eq!(parsed.action_ids(), vec!["broadcast"]);
    }

    #[test]
    fn test_compound_collects_nested_action_ids() {
        let schema = UiSchema::Compound(CompoundSchema {
            sections: vec![
                CompoundSection {
                    title: Some("Settings".into()),
                    schema: settings_form(),
                },
                CompoundSection {
                    title: None,
                    schema: UiSchema::DataTable(DataTableSchema {
                        data_action_id: "history".into(),
                        columns: vec![TableColumn::new("at", "Sent at")],
                        row_actions: vec![RowAction {
                            label: "Resend".into(),
                            action_id: "resend".into(),
                            confirm: None,
                        }],
                        page_size: Some(20),
                    }),
                },
            ],
        });
        assert_eq!(
            schema.action_ids(),
            vec!["motd", "settings", "history", "resend"]
        );
        assert!(schema.structural_errors().is_empty());
    }

    #[test]
    fn test_structural_errors_are_collected() {
        let schema = UiSchema::Compound(CompoundSchema {
            sections: vec![
                CompoundSection {
                    title: None,
                    schema: UiSchema::DataTable(DataTableSchema {
                        data_action_id: "".into(),
                        columns: vec![TableColumn::new("a", "A"), TableColumn::new("a", "A2")],
                        row_actions: Vec::new(),
                        page_size: None,
                    }),
                },
                CompoundSection {
                    title: None,
                    schema: UiSchema::Compound(CompoundSchema { sections: vec![] }),
                },
            ],
        });
        let errors = schema.structural_errors();
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(errors[0].starts_with("compound.sections[0]"));
        assert!(errors.iter().any(|e| e.contains("duplicate column 'a'")));
        assert!(errors.iter().any(|e| e.contains("at least one section")));
    }

    #[test]
    fn test_duplicate_form_fields() {
        let schema = UiSchema::Form(FormSchema {
            fields: vec![
                FieldSchema::boolean(FieldBase::new("on", "On")),
                FieldSchema::boolean(FieldBase::new("on", "Also on")),
            ],
            submit_action_id: "save".into(),
            load_action_id: None,
            submit_label: None,
        });
        let errors = schema.structural_errors();
        assert_eq!(errors, vec!["form: duplicate field 'on'".to_string()]);
    }
}
