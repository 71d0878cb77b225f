//! Declarative plugin UI.
//!
//! A plugin fills host UI slots ("surfaces") with [`UiSchema`] data. The host
//! never runs plugin-authored UI code; it renders each schema generically and
//! routes user interaction to the plugin's routes by action id.

pub mod field;
pub mod schema;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub use field::{FieldBase, FieldSchema, SelectOption};
pub use schema::{
    ActionButtonSchema, ButtonVariant, CompoundSchema, CompoundSection, DataTableSchema,
    FormSchema, RowAction, SearchAndInstallSchema, StatItem, StatsSchema, TableColumn, UiSchema,
};

use crate::route::{PluginRoute, normalize};

/// One host UI slot filled by a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiSurface {
    /// Unique within the plugin.
    pub id: String,
    pub title: String,
    pub schema: UiSchema,
}

impl UiSurface {
    pub fn new(id: &str, title: &str, schema: UiSchema) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            schema,
        }
    }
}

/// Route path an action id resolves to: action `x` is served by `/x`.
pub fn action_path(action_id: &str) -> String {
    normalize(action_id)
}

/// Finds the route serving `action_id`, whatever its method.
pub fn resolve_action<'a>(routes: &'a [PluginRoute], action_id: &str) -> Option<&'a PluginRoute> {
    let path = action_path(action_id);
    routes.iter().find(|r| r.path == path)
}

/// Checks a plugin's surfaces against each other and its routes.
///
/// Returns every problem found: duplicate surface ids, structural schema
/// errors and action ids with no matching route.
pub fn validate_surfaces(surfaces: &[UiSurface], routes: &[PluginRoute]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut ids = HashSet::new();

    for surface in surfaces {
        if surface.id.trim().is_empty() {
            errors.push("surface id must not be empty".to_string());
        } else if !ids.insert(surface.id.as_str()) {
            errors.push(format!("duplicate surface '{}'", surface.id));
        }

        for e in surface.schema.structural_errors() {
            errors.push(format!("{}: {e}", surface.id));
        }

        for action in surface.schema.action_ids() {
            if !action.trim().is_empty() && resolve_action(routes, action).is_none() {
                errors.push(format!(
                    "{}: action '{action}' has no route at {}",
                    surface.id,
                    action_path(action)
                ));
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{RouteResponse, route_fn};

    fn button(action: &str) -> UiSchema {
        UiSchema::ActionButton(ActionButtonSchema {
            label: "Go".into(),
            action_id: action.into(),
            variant: ButtonVariant::Primary,
            confirm: None,
        })
    }

    fn routes() -> Vec<PluginRoute> {
        vec![PluginRoute::post(
            "/broadcast",
            route_fn(|_req| async { Ok(RouteResponse::default()) }),
        )]
    }

    #[test]
    fn test_action_resolves_to_route_path() {
        let routes = routes();
        assert!(resolve_action(&routes, "broadcast").is_some());
        assert!(resolve_action(&routes, "/broadcast").is_some());
        assert!(resolve_action(&routes, "missing").is_none());
    }

    #[test]
    fn test_valid_surfaces() {
        let surfaces = vec![UiSurface::new("actions", "Actions", button("broadcast"))];
        assert!(validate_surfaces(&surfaces, &routes()).is_empty());
    }

    #[test]
    fn test_unresolved_actions_and_duplicate_ids() {
        let surfaces = vec![
            UiSurface::new("actions", "Actions", button("broadcast")),
            UiSurface::new("actions", "Again", button("explode")),
        ];
        let errors = validate_surfaces(&surfaces, &routes());
        assert_eq!(errors.len(), 2, "{errors:?}");
        assert_eq!(errors[0], "duplicate surface 'actions'");
        assert!(errors[1].contains("action 'explode' has no route at /explode"));
    }
}
