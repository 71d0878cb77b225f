//! Hook system: event vocabulary, handler traits and the shared registry.

pub mod definitions;
pub mod handler;
pub mod registry;

pub use definitions::{HookContext, HookPayload, HookPriority, PluginHookEvent, UnknownHookEvent};
pub use handler::{FilterHandler, HookHandler, filter_fn, hook_fn};
pub use registry::{HookRegistry, RegisteredFilter, RegisteredHook};
