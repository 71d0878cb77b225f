//! Where plugin state is persisted.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use stellar_core::AppResult;

use super::PluginState;

/// Persistence for [`PluginState`], keyed by plugin id.
#[async_trait]
pub trait PluginStateStore: Send + Sync {
    async fn load(&self, plugin_id: &str) -> AppResult<Option<PluginState>>;
    async fn save(&self, state: &PluginState) -> AppResult<()>;
    /// Returns whether a state was removed.
    async fn delete(&self, plugin_id: &str) -> AppResult<bool>;
    async fn list(&self) -> AppResult<Vec<PluginState>>;
}

/// Process-local store; state is lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    states: RwLock<HashMap<String, PluginState>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PluginStateStore for InMemoryStateStore {
    async fn load(&self, plugin_id: &str) -> AppResult<Option<PluginState>> {
        Ok(self.states.read().await.get(plugin_id).cloned())
    }

    async fn save(&self, state: &PluginState) -> AppResult<()> {
        self.states
            .write()
            .await
            .insert(state.id().to_string(), state.clone());
        Ok(())
    }

    async fn delete(&self, plugin_id: &str) -> AppResult<bool> {
        Ok(self.states.write().await.remove(plugin_id).is_some())
    }

    async fn list(&self) -> AppResult<Vec<PluginState>> {
        let mut states: Vec<PluginState> = self.states.read().await.values().cloned().collect();
        states.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(states)
    }
}
