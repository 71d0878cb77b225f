//! HTTP routes contributed by plugins.
//!
//! Routes are mounted under `/api/plugins/<id>/`. The host owns transport,
//! authentication and authorization; this module only describes routes,
//! matches request paths against them and carries request/response data.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use stellar_core::AppResult;

use crate::config::PluginConfig;

/// HTTP method of a plugin route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RouteMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl RouteMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RouteMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("unsupported method '{other}'")),
        }
    }
}

/// Authenticated caller, as resolved by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Request handed to a route handler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteRequest {
    #[serde(default)]
    pub body: Value,
    #[serde(default)]
    pub query: HashMap<String, String>,
    /// Values captured by `:name` path segments.
    #[serde(default)]
    pub params: HashMap<String, String>,
    #[serde(default)]
    pub user: Option<RouteUser>,
    /// The plugin's current config, injected by the manager.
    #[serde(default)]
    pub config: PluginConfig,
}

impl RouteRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_user(mut self, user: RouteUser) -> Self {
        self.user = Some(user);
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Response returned by a route handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub body: Value,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl RouteResponse {
    /// A 200 response with a JSON body.
    pub fn ok(body: Value) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }
}

impl Default for RouteResponse {
    fn default() -> Self {
        Self::ok(Value::Null)
    }
}

fn default_status() -> u16 {
    200
}

/// Handles requests for one plugin route.
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn handle(&self, request: RouteRequest) -> AppResult<RouteResponse>;
}

type BoxedRouteFn = Box<
    dyn Fn(RouteRequest) -> Pin<Box<dyn Future<Output = AppResult<RouteResponse>> + Send>>
        + Send
        + Sync,
>;

/// A route handler backed by an async closure.
pub struct ClosureRoute {
    handler: BoxedRouteFn,
}

#[async_trait]
impl RouteHandler for ClosureRoute {
    async fn handle(&self, request: RouteRequest) -> AppResult<RouteResponse> {
        (self.handler)(request).await
    }
}

/// Wraps an async closure into a shareable [`RouteHandler`].
pub fn route_fn<F, Fut>(handler: F) -> Arc<dyn RouteHandler>
where
    F: Fn(RouteRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<RouteResponse>> + Send + 'static,
{
    Arc::new(ClosureRoute {
        handler: Box::new(move |req| Box::pin(handler(req))),
    })
}

/// A route declared by a plugin.
#[derive(Clone)]
pub struct PluginRoute {
    pub method: RouteMethod,
    /// Path relative to the plugin's mount point, e.g. `/players/:name`.
    pub path: String,
    pub handler: Arc<dyn RouteHandler>,
    pub description: Option<String>,
    pub require_auth: bool,
    pub require_admin: bool,
}

impl fmt::Debug for PluginRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRoute")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("require_auth", &self.require_auth)
            .field("require_admin", &self.require_admin)
            .finish_non_exhaustive()
    }
}

impl PluginRoute {
    /// Authenticated, non-admin route.
    pub fn new(method: RouteMethod, path: &str, handler: Arc<dyn RouteHandler>) -> Self {
        Self {
            method,
            path: normalize(path),
            handler,
            description: None,
            require_auth: true,
            require_admin: false,
        }
    }

    pub fn get(path: &str, handler: Arc<dyn RouteHandler>) -> Self {
        Self::new(RouteMethod::Get, path, handler)
    }

    pub fn post(path: &str, handler: Arc<dyn RouteHandler>) -> Self {
        Self::new(RouteMethod::Post, path, handler)
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn public(mut self) -> Self {
        self.require_auth = false;
        self
    }

    pub fn admin_only(mut self) -> Self {
        self.require_auth = true;
        self.require_admin = true;
        self
    }

    /// Full path under which the host mounts this route.
    pub fn mount_path(&self, plugin_id: &str) -> String {
        format!("/api/plugins/{plugin_id}{}", self.path)
    }

    /// Matches `path` against this route's pattern, capturing `:name` segments.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let pattern = segments(&self.path);
        let actual = segments(path);
        if pattern.len() != actual.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (expected, got) in pattern.iter().zip(actual.iter()) {
            match expected.strip_prefix(':') {
                Some(name) => {
                    params.insert(name.to_string(), got.to_string());
                }
                None if expected == got => {}
                None => return None,
            }
        }
        Some(params)
    }
}

/// Route paths always start with a single `/` and carry no trailing slash.
pub fn normalize(path: &str) -> String {
    format!("/{}", segments(path).join("/"))
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn noop() -> Arc<dyn RouteHandler> {
        route_fn(|_req| async { Ok(RouteResponse::default()) })
    }

    #[test]
    fn test_defaults_require_auth_only() {
        let route = PluginRoute::get("stats", noop());
        assert_eq!(route.path, "/stats");
        assert!(route.require_auth);
        assert!(!route.require_admin);
        assert!(route.admin_only().require_admin);
    }

    #[test]
    fn test_mount_path() {
        let route = PluginRoute::post("/settings/", noop());
        assert_eq!(route.mount_path("motd"), "/api/plugins/motd/settings");
    }

    #[test]
    fn test_matches_captures_params() {
        let route = PluginRoute::get("/players/:name/kick", noop());
        let params = route.matches("players/steve/kick").expect("match");
        assert_eq!(params.get("name").map(String::as_str), Some("steve"));
        assert!(route.matches("/players/steve").is_none());
        assert!(route.matches("/players/steve/ban").is_none());
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("patch".parse::<RouteMethod>(), Ok(RouteMethod::Patch));
        assert!("TRACE".parse::<RouteMethod>().is_err());
        assert_eq!(serde_json::to_value(RouteMethod::Delete).unwrap(), json!("DELETE"));
    }

    #[test]
    fn test_response_status_defaults_to_200() {
        let response: RouteResponse = serde_json::from_value(json!({"body": {"ok": true}})).unwrap();
        assert_eq!(response.status, 200);
        assert!(response.headers.is_empty());
    }

    #[tokio::test]
    async fn test_closure_route_handles_request() {
        let handler = route_fn(|req: RouteRequest| async move {
            let name = req.param("name").unwrap_or("nobody").to_string();
            Ok(RouteResponse::ok(json!({ "hello": name })))
        });
        let mut request = RouteRequest::new();
        request.params.insert("name".into(), "alex".into());

        let response = handler.handle(request).await.unwrap();
        assert_eq!(response.body, json!({"hello": "alex"}));
    }
}
