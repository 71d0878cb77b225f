//! Stellar host: game-server panel process with the plugin runtime.
//!
//! Loads configuration, installs the built-in plugins, brings the configured
//! servers online and keeps running until Ctrl+C or SIGTERM.

mod host_api;

use std::sync::Arc;

use serde_json::json;
use tracing_subscriber::{EnvFilter, fmt};

use stellar_core::config::HostConfig;
use stellar_core::{AppError, AppResult};
use stellar_plugin::api::ServerStatus;
use stellar_plugin::{
    HookPayload, HookRegistry, InMemoryStateStore, PluginHookEvent, PluginManager, PluginStatus,
    StellarPlugin,
};

use crate::host_api::{HostApiProvider, ServerDirectory};

/// Filter applied to a server's MOTD before it is shown.
const MOTD_FILTER: &str = "server:motd";

#[tokio::main]
async fn main() {
    let env = std::env::var("STELLAR_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match HostConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Host error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &HostConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: HostConfig) -> AppResult<()> {
    tracing::info!(
        environment = %config.environment,
        "Starting Stellar host v{}",
        env!("CARGO_PKG_VERSION")
    );

    // ── Step 1: Data directories ─────────────────────────────────
    let data_dir = std::path::PathBuf::from(&config.plugins.data_dir);
    for server in &config.servers {
        let dir = data_dir.join("servers").join(&server.id);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::internal(format!("Failed to create dir '{}': {}", dir.display(), e))
        })?;
    }

    // ── Step 2: Plugin runtime ───────────────────────────────────
    let directory = Arc::new(ServerDirectory::new(&config.servers));
    let provider = HostApiProvider::new(Arc::clone(&directory), data_dir);
    let hooks = Arc::new(HookRegistry::new().with_handler_timeout(config.plugins.handler_timeout()));
    let manager = PluginManager::new(Arc::new(InMemoryStateStore::new()), Arc::new(provider))
        .with_hook_registry(hooks)
        .with_production(config.is_production());

    // ── Step 3: Built-in plugins ─────────────────────────────────
    if config.plugins.enable_built_ins {
        install_built_in(&manager, Arc::new(plugin_motd::MotdPlugin::new())).await?;
    } else {
        tracing::info!("Built-in plugins disabled");
    }

    let started = manager.start().await?;
    tracing::info!(started = started, "Plugins started");

    // ── Step 4: Bring servers online ─────────────────────────────
    for server in &config.servers {
        let payload = || HookPayload::new().with_server(&server.id);

        directory.set_status(&server.id, ServerStatus::Starting).await;
        manager
            .hooks()
            .emit(PluginHookEvent::ServerBeforeStart, payload())
            .await;
        directory.set_status(&server.id, ServerStatus::Running).await;
        manager
            .hooks()
            .emit(PluginHookEvent::ServerAfterStart, payload())
            .await;

        let motd = manager
            .hooks()
            .apply_filters(
                MOTD_FILTER,
                json!(format!("A {} server", server.game_type)),
                payload()
                    .with_string("serverName", &server.name)
                    .with_string("gameType", &server.game_type),
            )
            .await;
        tracing::info!(server_id = %server.id, motd = %motd, "Server online");
    }

    // ── Step 5: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping servers...");

    for server in &config.servers {
        let payload = || HookPayload::new().with_server(&server.id);

        directory.set_status(&server.id, ServerStatus::Stopping).await;
        manager
            .hooks()
            .emit(PluginHookEvent::ServerBeforeStop, payload())
            .await;
        directory.set_status(&server.id, ServerStatus::Offline).await;
        manager
            .hooks()
            .emit(PluginHookEvent::ServerAfterStop, payload())
            .await;
    }

    manager.shutdown().await;
    tracing::info!("Stellar host shut down gracefully");
    Ok(())
}

/// Installs a built-in plugin, enabling it on first install.
async fn install_built_in(manager: &PluginManager, plugin: Arc<dyn StellarPlugin>) -> AppResult<()> {
    let id = plugin.manifest().id.clone();
    let state = manager.install(plugin, true).await?;
    if state.status() == PluginStatus::Installed {
        manager.enable(&id).await?;
    }
    tracing::info!(plugin_id = %id, "Built-in plugin loaded");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
