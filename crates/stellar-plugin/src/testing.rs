//! In-memory [`PluginApi`] for plugin tests.
//!
//! Enable the `testing` feature to use it from another crate.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use stellar_core::{AppError, AppResult};

use crate::api::{
    FileApi, FileEntry, HttpApi, HttpResponse, NotifyApi, PluginApi, PluginApiProvider, ServerApi,
    ServerInfo, ServerStatus, StorageApi, ToastKind,
};
use crate::manifest::PluginManifest;

#[derive(Debug, Default)]
struct Recorded {
    servers: Vec<ServerInfo>,
    commands: Vec<(String, String)>,
    files: BTreeMap<(String, String), String>,
    storage: BTreeMap<String, Value>,
    requests: Vec<(String, String)>,
    toasts: Vec<(Option<String>, String, ToastKind)>,
}

/// Fake host services that record every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingApi {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a running server visible through `servers`.
    pub async fn add_server(&self, id: &str, game_type: &str) {
        self.inner.lock().await.servers.push(ServerInfo {
            id: id.to_string(),
            name: id.to_string(),
            game_type: game_type.to_string(),
            status: ServerStatus::Running,
        });
    }

    /// A [`PluginApi`] whose services all record into this instance.
    pub fn api(&self) -> PluginApi {
        let backend = Arc::new(self.clone());
        PluginApi {
            servers: backend.clone(),
            files: backend.clone(),
            storage: backend.clone(),
            http: backend.clone(),
            notify: backend,
        }
    }

    /// Console commands sent, as `(server_id, command)`.
    pub async fn commands(&self) -> Vec<(String, String)> {
        self.inner.lock().await.commands.clone()
    }

    /// Toasts shown, as `(server_id, message, kind)`.
    pub async fn toasts(&self) -> Vec<(Option<String>, String, ToastKind)> {
        self.inner.lock().await.toasts.clone()
    }

    /// Outbound requests, as `(method, url)`.
    pub async fn requests(&self) -> Vec<(String, String)> {
        self.inner.lock().await.requests.clone()
    }

    pub async fn stored(&self, key: &str) -> Option<Value> {
        self.inner.lock().await.storage.get(key).cloned()
    }

    async fn record_request(&self, method: &str, url: &str) -> AppResult<HttpResponse> {
        self.inner
            .lock()
            .await
            .requests
            .push((method.to_string(), url.to_string()));
        Ok(HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Value::Null,
        })
    }
}

#[async_trait]
impl ServerApi for RecordingApi {
    async fn get(&self, server_id: &str) -> AppResult<ServerInfo> {
        self.inner
            .lock()
            .await
            .servers
            .iter()
            .find(|s| s.id == server_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Server '{server_id}' not found")))
    }

    async fn list(&self) -> AppResult<Vec<ServerInfo>> {
        Ok(self.inner.lock().await.servers.clone())
    }

    async fn send_command(&self, server_id: &str, command: &str) -> AppResult<()> {
        self.inner
            .lock()
            .await
            .commands
            .push((server_id.to_string(), command.to_string()));
        Ok(())
    }

    async fn get_status(&self, server_id: &str) -> AppResult<ServerStatus> {
        ServerApi::get(self, server_id).await.map(|s| s.status)
    }
}

#[async_trait]
impl FileApi for RecordingApi {
    async fn list(&self, server_id: &str, path: &str) -> AppResult<Vec<FileEntry>> {
        let prefix = path.trim_matches('/');
        let inner = self.inner.lock().await;
        Ok(inner
            .files
            .iter()
            .filter(|((sid, p), _)| sid == server_id && p.starts_with(prefix))
            .map(|((_, p), content)| FileEntry {
                path: p.clone(),
                name: p.rsplit('/').next().unwrap_or(p).to_string(),
                is_dir: false,
                size: content.len() as u64,
                modified_at: None,
            })
            .collect())
    }

    async fn read(&self, server_id: &str, path: &str) -> AppResult<String> {
        self.inner
            .lock()
            .await
            .files
            .get(&(server_id.to_string(), path.trim_matches('/').to_string()))
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("File '{path}' not found")))
    }

    async fn write(&self, server_id: &str, path: &str, content: &str) -> AppResult<()> {
        self.inner.lock().await.files.insert(
            (server_id.to_string(), path.trim_matches('/').to_string()),
            content.to_string(),
        );
        Ok(())
    }

    async fn create(&self, server_id: &str, path: &str, content: &str) -> AppResult<()> {
        let key = (server_id.to_string(), path.trim_matches('/').to_string());
        let mut inner = self.inner.lock().await;
        if inner.files.contains_key(&key) {
            return Err(AppError::conflict(format!("File '{path}' already exists")));
        }
        inner.files.insert(key, content.to_string());
        Ok(())
    }

    async fn delete(&self, server_id: &str, path: &str) -> AppResult<()> {
        self.inner
            .lock()
            .await
            .files
            .remove(&(server_id.to_string(), path.trim_matches('/').to_string()))
            .map(|_| ())
            .ok_or_else(|| AppError::not_found(format!("File '{path}' not found")))
    }

    async fn download_url(&self, server_id: &str, path: &str) -> AppResult<String> {
        Ok(format!(
            "/api/servers/{server_id}/files/download?path={}",
            path.trim_matches('/')
        ))
    }
}

#[async_trait]
impl StorageApi for RecordingApi {
    async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        Ok(self.inner.lock().await.storage.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> AppResult<()> {
        self.inner
            .lock()
            .await
            .storage
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        Ok(self.inner.lock().await.storage.remove(key).is_some())
    }

    async fn keys(&self) -> AppResult<Vec<String>> {
        Ok(self.inner.lock().await.storage.keys().cloned().collect())
    }
}

#[async_trait]
impl HttpApi for RecordingApi {
    async fn get(&self, url: &str) -> AppResult<HttpResponse> {
        self.record_request("GET", url).await
    }

    async fn post(&self, url: &str, _body: Value) -> AppResult<HttpResponse> {
        self.record_request("POST", url).await
    }

    async fn put(&self, url: &str, _body: Value) -> AppResult<HttpResponse> {
        self.record_request("PUT", url).await
    }

    async fn delete(&self, url: &str) -> AppResult<HttpResponse> {
        self.record_request("DELETE", url).await
    }
}

#[async_trait]
impl NotifyApi for RecordingApi {
    async fn toast(
        &self,
        server_id: Option<&str>,
        message: &str,
        kind: ToastKind,
    ) -> AppResult<()> {
        self.inner.lock().await.toasts.push((
            server_id.map(str::to_string),
            message.to_string(),
            kind,
        ));
        Ok(())
    }
}

/// Hands every plugin the same [`RecordingApi`].
#[derive(Debug, Clone, Default)]
pub struct RecordingProvider {
    pub api: RecordingApi,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PluginApiProvider for RecordingProvider {
    fn api_for(&self, _manifest: &PluginManifest) -> PluginApi {
        self.api.api()
    }
}
