//! Convenience macros for plugin development.

/// Builds a `HookPayload`.
///
/// # Example
/// ```rust,ignore
/// let payload = hook_payload!(server: "s1", {
///     "line" => json!("[Server] Done (3.2s)!"),
/// });
/// ```
#[macro_export]
macro_rules! hook_payload {
    () => {
        $crate::prelude::HookPayload::new()
    };
    ({ $($key:expr => $value:expr),* $(,)? }) => {{
        let mut payload = $crate::prelude::HookPayload::new();
        $(
            payload.data.insert($key.to_string(), $value);
        )*
        payload
    }};
    (server: $server:expr) => {
        $crate::prelude::HookPayload::new().with_server($server)
    };
    (server: $server:expr, { $($key:expr => $value:expr),* $(,)? }) => {{
        let mut payload = $crate::prelude::HookPayload::new().with_server($server);
        $(
            payload.data.insert($key.to_string(), $value);
        )*
        payload
    }};
}

/// Builds a [`PluginConfig`](crate::config::PluginConfig) from key/value pairs.
///
/// # Example
/// ```rust,ignore
/// let config = plugin_config!({ "message" => json!("hi"), "interval" => json!(60) });
/// ```
#[macro_export]
macro_rules! plugin_config {
    ({ $($key:expr => $value:expr),* $(,)? }) => {{
        let mut config = $crate::prelude::PluginConfig::new();
        $(
            config.set($key, $value);
        )*
        config
    }};
}
