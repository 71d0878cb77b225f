//! Handler and filter traits, plus closure adapters for quick registration.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use stellar_core::AppResult;

use super::definitions::HookContext;

/// An action handler attached to a [`PluginHookEvent`](super::PluginHookEvent).
///
/// Return values are not consumed; an `Err` is logged and the emission
/// moves on to the next handler.
#[async_trait]
pub trait HookHandler: Send + Sync {
    /// Handles one emission.
    async fn handle(&self, ctx: &HookContext) -> AppResult<()>;
}

/// A stage in a named filter chain.
///
/// Receives the running value and returns the value passed to the next
/// stage. An `Err` leaves the running value untouched.
#[async_trait]
pub trait FilterHandler: Send + Sync {
    /// Transforms `value`.
    async fn apply(&self, value: Value, ctx: &HookContext) -> AppResult<Value>;
}

type HookFn = dyn Fn(HookContext) -> Pin<Box<dyn Future<Output = AppResult<()>> + Send>>
    + Send
    + Sync;

type FilterFn = dyn Fn(Value, HookContext) -> Pin<Box<dyn Future<Output = AppResult<Value>> + Send>>
    + Send
    + Sync;

/// A closure-based hook handler.
pub struct ClosureHook {
    handler: Box<HookFn>,
}

impl std::fmt::Debug for ClosureHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureHook")
            .field("handler", &"<closure>")
            .finish()
    }
}

#[async_trait]
impl HookHandler for ClosureHook {
    async fn handle(&self, ctx: &HookContext) -> AppResult<()> {
        (self.handler)(ctx.clone()).await
    }
}

/// A closure-based filter.
pub struct ClosureFilter {
    filter: Box<FilterFn>,
}

impl std::fmt::Debug for ClosureFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureFilter")
            .field("filter", &"<closure>")
            .finish()
    }
}

#[async_trait]
impl FilterHandler for ClosureFilter {
    async fn apply(&self, value: Value, ctx: &HookContext) -> AppResult<Value> {
        (self.filter)(value, ctx.clone()).await
    }
}

/// Wraps an async closure into a shareable [`HookHandler`].
///
/// The closure receives an owned copy of the context.
pub fn hook_fn<F, Fut>(handler: F) -> Arc<dyn HookHandler>
where
    F: Fn(HookContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    Arc::new(ClosureHook {
        handler: Box::new(move |ctx| Box::pin(handler(ctx))),
    })
}

/// Wraps an async closure into a shareable [`FilterHandler`].
pub fn filter_fn<F, Fut>(filter: F) -> Arc<dyn FilterHandler>
where
    F: Fn(Value, HookContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<Value>> + Send + 'static,
{
    Arc::new(ClosureFilter {
        filter: Box::new(move |value, ctx| Box::pin(filter(value, ctx))),
    })
}
