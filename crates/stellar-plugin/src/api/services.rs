//! Capability traits the host implements for plugins.
//!
//! Every call is already scoped to the calling plugin: the host builds one
//! set of service objects per plugin through
//! [`PluginApiProvider`](super::PluginApiProvider).

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use stellar_core::AppResult;

/// Lifecycle status of a game server as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Offline,
    Starting,
    Running,
    Stopping,
    Installing,
    Unknown,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Offline => "offline",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Installing => "installing",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// A game server visible to the plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub id: String,
    pub name: String,
    pub game_type: String,
    pub status: ServerStatus,
}

/// An entry in a server's file tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Path relative to the server root, `/`-separated.
    pub path: String,
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Severity of a UI toast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for ToastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Response of an outbound HTTP call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    /// Parsed JSON body, or the raw text as a JSON string when it isn't JSON.
    pub body: Value,
}

impl HttpResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Read and control the host's game servers.
#[async_trait]
pub trait ServerApi: Send + Sync {
    async fn get(&self, server_id: &str) -> AppResult<ServerInfo>;
    async fn list(&self) -> AppResult<Vec<ServerInfo>>;
    /// Sends a console command to a running server.
    async fn send_command(&self, server_id: &str, command: &str) -> AppResult<()>;
    async fn get_status(&self, server_id: &str) -> AppResult<ServerStatus>;
}

/// Access files inside a server's root directory.
#[async_trait]
pub trait FileApi: Send + Sync {
    async fn list(&self, server_id: &str, path: &str) -> AppResult<Vec<FileEntry>>;
    async fn read(&self, server_id: &str, path: &str) -> AppResult<String>;
    /// Overwrites an existing file.
    async fn write(&self, server_id: &str, path: &str, content: &str) -> AppResult<()>;
    /// Creates a new file; fails if it already exists.
    async fn create(&self, server_id: &str, path: &str, content: &str) -> AppResult<()>;
    async fn delete(&self, server_id: &str, path: &str) -> AppResult<()>;
    /// Returns a URL the UI can download the file from.
    async fn download_url(&self, server_id: &str, path: &str) -> AppResult<String>;
}

/// Plugin-private key/value storage.
#[async_trait]
pub trait StorageApi: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> AppResult<()>;
    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> AppResult<bool>;
    async fn keys(&self) -> AppResult<Vec<String>>;
}

/// Outbound HTTP.
#[async_trait]
pub trait HttpApi: Send + Sync {
    async fn get(&self, url: &str) -> AppResult<HttpResponse>;
    async fn post(&self, url: &str, body: Value) -> AppResult<HttpResponse>;
    async fn put(&self, url: &str, body: Value) -> AppResult<HttpResponse>;
    async fn delete(&self, url: &str) -> AppResult<HttpResponse>;
}

/// User-facing notifications.
#[async_trait]
pub trait NotifyApi: Send + Sync {
    /// Shows a toast to users viewing `server_id`, or to everyone when `None`.
    async fn toast(&self, server_id: Option<&str>, message: &str, kind: ToastKind)
    -> AppResult<()>;
}
