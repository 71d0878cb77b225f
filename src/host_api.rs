//! Host-side implementation of the plugin API.
//!
//! Every plugin gets its own set of service objects carrying its id and
//! manifest permissions. Calls outside those permissions fail with an
//! authorization error before touching anything.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

use stellar_core::config::ServerDefinition;
use stellar_core::{AppError, AppResult};
use stellar_plugin::api::{
    FileApi, FileEntry, HttpApi, HttpResponse, NotifyApi, PluginApi, PluginApiProvider, ServerApi,
    ServerInfo, ServerStatus, StorageApi, ToastKind, permissions,
};
use stellar_plugin::manifest::PluginManifest;

/// Game servers known to the host and their current status.
#[derive(Debug)]
pub struct ServerDirectory {
    servers: Vec<ServerDefinition>,
    statuses: RwLock<HashMap<String, ServerStatus>>,
}

impl ServerDirectory {
    /// All servers start offline.
    pub fn new(servers: &[ServerDefinition]) -> Self {
        Self {
            servers: servers.to_vec(),
            statuses: RwLock::new(
                servers
                    .iter()
                    .map(|s| (s.id.clone(), ServerStatus::Offline))
                    .collect(),
            ),
        }
    }

    /// Updates a server's status; unknown ids are ignored.
    pub async fn set_status(&self, server_id: &str, status: ServerStatus) {
        if let Some(current) = self.statuses.write().await.get_mut(server_id) {
            *current = status;
        }
    }

    /// One server with its current status.
    pub async fn info(&self, server_id: &str) -> AppResult<ServerInfo> {
        let definition = self
            .servers
            .iter()
            .find(|s| s.id == server_id)
            .ok_or_else(|| AppError::not_found(format!("Server '{server_id}' not found")))?;
        let status = self
            .statuses
            .read()
            .await
            .get(server_id)
            .copied()
            .unwrap_or(ServerStatus::Unknown);

        Ok(ServerInfo {
            id: definition.id.clone(),
            name: definition.name.clone(),
            game_type: definition.game_type.clone(),
            status,
        })
    }

    /// Every configured server with its current status.
    pub async fn list(&self) -> Vec<ServerInfo> {
        let statuses = self.statuses.read().await;
        self.servers
            .iter()
            .map(|s| ServerInfo {
                id: s.id.clone(),
                name: s.name.clone(),
                game_type: s.game_type.clone(),
                status: statuses.get(&s.id).copied().unwrap_or(ServerStatus::Unknown),
            })
            .collect()
    }
}

/// Builds plugin-scoped APIs over the host's shared resources.
#[derive(Debug, Clone)]
pub struct HostApiProvider {
    directory: Arc<ServerDirectory>,
    data_dir: PathBuf,
    storage: Arc<RwLock<HashMap<String, Value>>>,
    http: reqwest::Client,
}

impl HostApiProvider {
    /// Shares `directory` and serves files from `<data_dir>/servers`.
    pub fn new(directory: Arc<ServerDirectory>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            directory,
            data_dir: data_dir.into(),
            storage: Arc::new(RwLock::new(HashMap::new())),
            http: reqwest::Client::new(),
        }
    }
}

impl PluginApiProvider for HostApiProvider {
    fn api_for(&self, manifest: &PluginManifest) -> PluginApi {
        let scope = Scope {
            plugin_id: manifest.id.clone(),
            permissions: Arc::new(manifest.permissions.clone()),
        };

        PluginApi {
            servers: Arc::new(HostServers {
                scope: scope.clone(),
                directory: self.directory.clone(),
            }),
            files: Arc::new(HostFiles {
                scope: scope.clone(),
                directory: self.directory.clone(),
                root: self.data_dir.join("servers"),
            }),
            storage: Arc::new(HostStorage {
                prefix: format!("plugin:{}:", manifest.id),
                entries: self.storage.clone(),
            }),
            http: Arc::new(HostHttp {
                scope: scope.clone(),
                client: self.http.clone(),
            }),
            notify: Arc::new(HostNotify { scope }),
        }
    }
}

/// Identity and permissions of the calling plugin.
#[derive(Debug, Clone)]
struct Scope {
    plugin_id: String,
    permissions: Arc<Vec<String>>,
}

impl Scope {
    fn require(&self, permission: &str) -> AppResult<()> {
        if self.permissions.iter().any(|p| p == permission) {
            Ok(())
        } else {
            warn!(plugin_id = %self.plugin_id, permission = %permission, "Plugin permission denied");
            Err(AppError::authorization(format!(
                "Plugin '{}' lacks the '{permission}' permission",
                self.plugin_id
            )))
        }
    }
}

struct HostServers {
    scope: Scope,
    directory: Arc<ServerDirectory>,
}

#[async_trait]
impl ServerApi for HostServers {
    async fn get(&self, server_id: &str) -> AppResult<ServerInfo> {
        self.scope.require(permissions::SERVERS_READ)?;
        self.directory.info(server_id).await
    }

    async fn list(&self) -> AppResult<Vec<ServerInfo>> {
        self.scope.require(permissions::SERVERS_READ)?;
        Ok(self.directory.list().await)
    }

    async fn send_command(&self, server_id: &str, command: &str) -> AppResult<()> {
        self.scope.require(permissions::SERVERS_COMMAND)?;
        let server = self.directory.info(server_id).await?;
        if server.status != ServerStatus::Running {
            return Err(AppError::conflict(format!(
                "Server '{server_id}' is {}, not running",
                server.status
            )));
        }

        info!(
            plugin_id = %self.scope.plugin_id,
            server_id = %server_id,
            command = %command,
            "Console command"
        );
        Ok(())
    }

    async fn get_status(&self, server_id: &str) -> AppResult<ServerStatus> {
        self.scope.require(permissions::SERVERS_READ)?;
        Ok(self.directory.info(server_id).await?.status)
    }
}

struct HostFiles {
    scope: Scope,
    directory: Arc<ServerDirectory>,
    root: PathBuf,
}

impl HostFiles {
    /// Resolves `path` inside the server's root, rejecting anything that
    /// could escape it.
    async fn resolve(&self, server_id: &str, path: &str) -> AppResult<PathBuf> {
        self.directory.info(server_id).await?;

        let relative = Path::new(path.trim_start_matches('/'));
        let mut resolved = self.root.join(server_id);
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => {
                    warn!(
                        plugin_id = %self.scope.plugin_id,
                        server_id = %server_id,
                        path = %path,
                        "Rejected file path"
                    );
                    return Err(AppError::authorization(format!(
                        "Path '{path}' is outside the server directory"
                    )));
                }
            }
        }
        Ok(resolved)
    }
}

#[async_trait]
impl FileApi for HostFiles {
    async fn list(&self, server_id: &str, path: &str) -> AppResult<Vec<FileEntry>> {
        self.scope.require(permissions::FILES_READ)?;
        let dir = self.resolve(server_id, path).await?;
        let base = path.trim_matches('/');

        let mut entries = Vec::new();
        let mut reader = tokio::fs::read_dir(&dir).await.map_err(|e| {
            AppError::with_source(
                stellar_core::error::ErrorKind::NotFound,
                format!("Cannot list '{path}'"),
                e,
            )
        })?;
        while let Some(entry) = reader.next_entry().await? {
            let metadata = entry.metadata().await?;
            let name = entry.file_name().to_string_lossy().into_owned();
            entries.push(FileEntry {
                path: if base.is_empty() {
                    name.clone()
                } else {
                    format!("{base}/{name}")
                },
                name,
                is_dir: metadata.is_dir(),
                size: metadata.len(),
                modified_at: metadata.modified().ok().map(Into::into),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read(&self, server_id: &str, path: &str) -> AppResult<String> {
        self.scope.require(permissions::FILES_READ)?;
        let file = self.resolve(server_id, path).await?;
        tokio::fs::read_to_string(&file).await.map_err(|e| {
            AppError::with_source(
                stellar_core::error::ErrorKind::NotFound,
                format!("Cannot read '{path}'"),
                e,
            )
        })
    }

    async fn write(&self, server_id: &str, path: &str, content: &str) -> AppResult<()> {
        self.scope.require(permissions::FILES_WRITE)?;
        let file = self.resolve(server_id, path).await?;
        store_file(&file, path, content).await
    }

    async fn create(&self, server_id: &str, path: &str, content: &str) -> AppResult<()> {
        self.scope.require(permissions::FILES_WRITE)?;
        let file = self.resolve(server_id, path).await?;
        if tokio::fs::try_exists(&file).await? {
            return Err(AppError::conflict(format!("File '{path}' already exists")));
        }
        store_file(&file, path, content).await
    }

    async fn delete(&self, server_id: &str, path: &str) -> AppResult<()> {
        self.scope.require(permissions::FILES_WRITE)?;
        let file = self.resolve(server_id, path).await?;
        if file == self.root.join(server_id) {
            return Err(AppError::validation("Refusing to delete the server root"));
        }
        let metadata = tokio::fs::metadata(&file).await.map_err(|e| {
            AppError::with_source(
                stellar_core::error::ErrorKind::NotFound,
                format!("File '{path}' not found"),
                e,
            )
        })?;
        let removed = if metadata.is_dir() {
            tokio::fs::remove_dir_all(&file).await
        } else {
            tokio::fs::remove_file(&file).await
        };
        removed.map_err(|e| AppError::storage(format!("Cannot delete '{path}': {e}")))
    }

    async fn download_url(&self, server_id: &str, path: &str) -> AppResult<String> {
        self.scope.require(permissions::FILES_READ)?;
        self.resolve(server_id, path).await?;
        Ok(format!(
            "/api/servers/{server_id}/files/download?path={}",
            path.trim_start_matches('/')
        ))
    }
}

/// Writes `content`, creating missing parent directories.
async fn store_file(file: &Path, path: &str, content: &str) -> AppResult<()> {
    if let Some(parent) = file.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::storage(format!("Cannot create parent of '{path}': {e}")))?;
    }
    tokio::fs::write(file, content)
        .await
        .map_err(|e| AppError::storage(format!("Cannot write '{path}': {e}")))
}

/// Plugin-private view over the shared key/value map.
struct HostStorage {
    prefix: String,
    entries: Arc<RwLock<HashMap<String, Value>>>,
}

#[async_trait]
impl StorageApi for HostStorage {
    async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        let full_key = format!("{}{}", self.prefix, key);
        Ok(self.entries.read().await.get(&full_key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> AppResult<()> {
        let full_key = format!("{}{}", self.prefix, key);
        self.entries.write().await.insert(full_key, value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        let full_key = format!("{}{}", self.prefix, key);
        Ok(self.entries.write().await.remove(&full_key).is_some())
    }

    async fn keys(&self) -> AppResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .await
            .keys()
            .filter_map(|k| k.strip_prefix(&self.prefix).map(str::to_string))
            .collect();
        keys.sort();
        Ok(keys)
    }
}

struct HostHttp {
    scope: Scope,
    client: reqwest::Client,
}

impl HostHttp {
    async fn send(&self, url: &str, request: reqwest::RequestBuilder) -> AppResult<HttpResponse> {
        self.scope.require(permissions::HTTP)?;

        let response = request.send().await.map_err(|e| {
            warn!(plugin_id = %self.scope.plugin_id, url = %url, error = %e, "Outbound request failed");
            AppError::external_service(format!("Request to '{url}' failed: {e}"))
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let text = response.text().await.map_err(|e| {
            AppError::external_service(format!("Failed to read response from '{url}': {e}"))
        })?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl HttpApi for HostHttp {
    async fn get(&self, url: &str) -> AppResult<HttpResponse> {
        self.send(url, self.client.get(url)).await
    }

    async fn post(&self, url: &str, body: Value) -> AppResult<HttpResponse> {
        self.send(url, self.client.post(url).json(&body)).await
    }

    async fn put(&self, url: &str, body: Value) -> AppResult<HttpResponse> {
        self.send(url, self.client.put(url).json(&body)).await
    }

    async fn delete(&self, url: &str) -> AppResult<HttpResponse> {
        self.send(url, self.client.delete(url)).await
    }
}

struct HostNotify {
    scope: Scope,
}

#[async_trait]
impl NotifyApi for HostNotify {
    async fn toast(
        &self,
        server_id: Option<&str>,
        message: &str,
        kind: ToastKind,
    ) -> AppResult<()> {
        self.scope.require(permissions::NOTIFY)?;
        info!(
            plugin_id = %self.scope.plugin_id,
            server_id = server_id.unwrap_or("*"),
            kind = %kind,
            message = %message,
            "Toast"
        );
        Ok(())
    }
}
