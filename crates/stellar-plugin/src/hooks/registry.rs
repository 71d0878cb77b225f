//! Hook registry: the single event bus shared by every plugin.
//!
//! Handlers are kept per event and filters per name, each list sorted by
//! priority with registration order as the tie-break. Emission reads the
//! list once, then awaits every entry strictly in sequence; a failing entry
//! is logged and skipped so one plugin can never block its siblings.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use stellar_core::{AppError, AppResult};

use super::definitions::{HookContext, HookPayload, HookPriority, PluginHookEvent};
use super::handler::{FilterHandler, HookHandler};

/// A handler registered for an event.
#[derive(Clone)]
pub struct RegisteredHook {
    /// Plugin that registered this handler.
    pub plugin_id: String,
    /// The handler.
    pub handler: Arc<dyn HookHandler>,
    /// Execution priority.
    pub priority: HookPriority,
    seq: u64,
}

/// A filter registered under a chain name.
#[derive(Clone)]
pub struct RegisteredFilter {
    /// Plugin that registered this filter.
    pub plugin_id: String,
    /// The filter.
    pub filter: Arc<dyn FilterHandler>,
    /// Execution priority.
    pub priority: HookPriority,
    seq: u64,
}

/// Registry of hook handlers and filters.
pub struct HookRegistry {
    /// Event → handlers sorted by (priority, seq).
    hooks: RwLock<HashMap<PluginHookEvent, Vec<RegisteredHook>>>,
    /// Filter name → filters sorted by (priority, seq).
    filters: RwLock<HashMap<String, Vec<RegisteredFilter>>>,
    /// Monotonic registration counter.
    next_seq: AtomicU64,
    /// Optional upper bound on a single handler or filter invocation.
    handler_timeout: Option<Duration>,
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("next_seq", &self.next_seq.load(Ordering::Relaxed))
            .field("handler_timeout", &self.handler_timeout)
            .finish_non_exhaustive()
    }
}

impl HookRegistry {
    /// Creates a new empty hook registry without handler timeouts.
    pub fn new() -> Self {
        Self {
            hooks: RwLock::new(HashMap::new()),
            filters: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            handler_timeout: None,
        }
    }

    /// Bounds every handler and filter invocation by `timeout`.
    ///
    /// An invocation that exceeds it is treated exactly like one that failed.
    pub fn with_handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Registers an action handler for `event`.
    pub async fn on(
        &self,
        event: PluginHookEvent,
        plugin_id: &str,
        handler: Arc<dyn HookHandler>,
        priority: HookPriority,
    ) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);

        let mut hooks = self.hooks.write().await;
        let entries = hooks.entry(event).or_default();
        entries.push(RegisteredHook {
            plugin_id: plugin_id.to_string(),
            handler,
            priority,
            seq,
        });
        // Stable sort; seq keeps equal priorities in registration order.
        entries.sort_by_key(|e| (e.priority, e.seq));

        debug!(
            event = %event,
            plugin_id = %plugin_id,
            priority = %priority,
            "Hook handler registered"
        );
    }

    /// Registers a filter in the chain called `name`.
    pub async fn add_filter(
        &self,
        name: &str,
        plugin_id: &str,
        filter: Arc<dyn FilterHandler>,
        priority: HookPriority,
    ) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);

        let mut filters = self.filters.write().await;
        let entries = filters.entry(name.to_string()).or_default();
        entries.push(RegisteredFilter {
            plugin_id: plugin_id.to_string(),
            filter,
            priority,
            seq,
        });
        entries.sort_by_key(|e| (e.priority, e.seq));

        debug!(
            filter = %name,
            plugin_id = %plugin_id,
            priority = %priority,
            "Filter registered"
        );
    }

    /// Drops every handler and filter registered by `plugin_id`.
    ///
    /// Returns the number of entries removed. Calling it for a plugin with no
    /// registrations is a no-op.
    pub async fn remove_plugin(&self, plugin_id: &str) -> usize {
        let mut removed = 0;

        {
            let mut hooks = self.hooks.write().await;
            for entries in hooks.values_mut() {
                let before = entries.len();
                entries.retain(|e| e.plugin_id != plugin_id);
                removed += before - entries.len();
            }
            hooks.retain(|_, entries| !entries.is_empty());
        }

        {
            let mut filters = self.filters.write().await;
            for entries in filters.values_mut() {
                let before = entries.len();
                entries.retain(|e| e.plugin_id != plugin_id);
                removed += before - entries.len();
            }
            filters.retain(|_, entries| !entries.is_empty());
        }

        if removed > 0 {
            info!(plugin_id = %plugin_id, removed, "Plugin hooks and filters removed");
        }

        removed
    }

    /// Runs every handler registered for `event`, one after another.
    ///
    /// The handler list is read once up front; registrations made while the
    /// emission is running only affect later emissions. Handler errors and
    /// panics are logged and never abort the emission.
    pub async fn emit(&self, event: PluginHookEvent, payload: HookPayload) {
        let ctx = HookContext::from_payload(event.as_str(), payload);

        let handlers: Vec<RegisteredHook> = {
            let hooks = self.hooks.read().await;
            hooks.get(&event).cloned().unwrap_or_default()
        };

        if handlers.is_empty() {
            return;
        }

        debug!(event = %event, handler_count = handlers.len(), "Emitting hook");

        for entry in &handlers {
            if let Err(e) = self.guarded(entry.handler.handle(&ctx)).await {
                error!(
                    plugin_id = %entry.plugin_id,
                    event = %event,
                    error = %e,
                    "Hook handler failed"
                );
            }
        }
    }

    /// Threads `value` through the filter chain called `name`.
    ///
    /// With no filters registered the input is returned unchanged. Filters
    /// fail open: a stage that errors, panics, or times out is skipped and
    /// the next stage receives the value from before it. Do not rely on a
    /// filter chain to enforce policy.
    pub async fn apply_filters(&self, name: &str, value: Value, payload: HookPayload) -> Value {
        let ctx = HookContext::from_payload(name, payload);

        let filters: Vec<RegisteredFilter> = {
            let filters = self.filters.read().await;
            filters.get(name).cloned().unwrap_or_default()
        };

        if filters.is_empty() {
            return value;
        }

        debug!(filter = %name, filter_count = filters.len(), "Applying filters");

        let mut current = value;
        for entry in &filters {
            match self.guarded(entry.filter.apply(current.clone(), &ctx)).await {
                Ok(next) => current = next,
                Err(e) => {
                    error!(
                        plugin_id = %entry.plugin_id,
                        filter = %name,
                        error = %e,
                        "Filter failed, passing value through unchanged"
                    );
                }
            }
        }

        current
    }

    /// Typed convenience over [`apply_filters`](Self::apply_filters).
    ///
    /// If the chain produces something that no longer deserializes as `T`,
    /// the original value is returned.
    pub async fn apply_filters_as<T>(&self, name: &str, value: T, payload: HookPayload) -> T
    where
        T: Serialize + DeserializeOwned,
    {
        let raw = match serde_json::to_value(&value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(filter = %name, error = %e, "Filter input is not serializable");
                return value;
            }
        };

        let filtered = self.apply_filters(name, raw, payload).await;
        match serde_json::from_value(filtered) {
            Ok(out) => out,
            Err(e) => {
                warn!(
                    filter = %name,
                    error = %e,
                    "Filter chain changed the value's shape, keeping the input"
                );
                value
            }
        }
    }

    /// Returns whether any handler is registered for `event`.
    pub async fn has_hooks(&self, event: PluginHookEvent) -> bool {
        let hooks = self.hooks.read().await;
        hooks.get(&event).is_some_and(|entries| !entries.is_empty())
    }

    /// Returns whether any filter is registered under `name`.
    pub async fn has_filters(&self, name: &str) -> bool {
        let filters = self.filters.read().await;
        filters.get(name).is_some_and(|entries| !entries.is_empty())
    }

    /// Returns the number of handlers registered for `event`.
    pub async fn handler_count(&self, event: PluginHookEvent) -> usize {
        let hooks = self.hooks.read().await;
        hooks.get(&event).map(Vec::len).unwrap_or(0)
    }

    /// Debug view: event name → `"pluginId (priority)"` in execution order.
    pub async fn registered_hooks(&self) -> BTreeMap<String, Vec<String>> {
        let hooks = self.hooks.read().await;
        hooks
            .iter()
            .map(|(event, entries)| {
                let described = entries
                    .iter()
                    .map(|e| format!("{} ({})", e.plugin_id, e.priority))
                    .collect();
                (event.as_str().to_string(), described)
            })
            .collect()
    }

    /// Debug view: filter name → `"pluginId (priority)"` in execution order.
    pub async fn registered_filters(&self) -> BTreeMap<String, Vec<String>> {
        let filters = self.filters.read().await;
        filters
            .iter()
            .map(|(name, entries)| {
                let described = entries
                    .iter()
                    .map(|e| format!("{} ({})", e.plugin_id, e.priority))
                    .collect();
                (name.clone(), described)
            })
            .collect()
    }

    /// Awaits one invocation, converting panics and timeouts into errors.
    pub(crate) async fn guarded<T>(
        &self,
        fut: impl Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        let caught = AssertUnwindSafe(fut).catch_unwind();

        let outcome = match self.handler_timeout {
            Some(limit) => match tokio::time::timeout(limit, caught).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return Err(AppError::timeout(format!(
                        "handler did not finish within {}ms",
                        limit.as_millis()
                    )));
                }
            },
            None => caught.await,
        };

        outcome.unwrap_or_else(|panic| Err(AppError::plugin(panic_message(panic.as_ref()))))
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("handler panicked: {msg}")
    } else {
        "handler panicked".to_string()
    }
}
