//! Stopwatch Registry - an HTTP service for concurrent stopwatch timers
//!
//! This is the main entry point for the stopwatch-registry application.

use std::sync::Arc;
use anyhow::Context;
use tokio::{net::TcpListener, sync::oneshot};
use tracing::{error, info, warn};

use stopwatch_registry::{
    api::create_router,
    config::Config,
    services::{JsonFileStore, TimerStore},
    state::{AppState, SystemClock, TimerRegistry},
    tasks::autosave_task,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("stopwatch_registry={},tower_http=info", config.log_level()))
        .init();

    info!("Starting stopwatch-registry server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, data_file={:?}, stop_policy={:?}",
          config.host, config.port, config.data_file, config.stop_policy());

    // Create the registry and application state
    let registry = TimerRegistry::new(Arc::new(SystemClock), config.stop_policy());
    let state = Arc::new(AppState::new(registry, config.port, config.host.clone()));

    // Restore persisted timers and start saving changes
    let persistence = match &config.data_file {
        Some(path) => {
            let store = JsonFileStore::new(path);
            let snapshot = store
                .load()
                .with_context(|| format!("Failed to load timers from {}", path.display()))?;
            if let Some(snapshot) = snapshot {
                state
                    .restore(snapshot)
                    .with_context(|| format!("Rejected timers from {}", path.display()))?;
            }

            let autosave_store: Arc<dyn TimerStore> = Arc::new(store);
            let autosave_state = Arc::clone(&state);
            let (shutdown_tx, shutdown_rx) = oneshot::channel();
            let autosave = tokio::spawn(async move {
                autosave_task(autosave_state, autosave_store, shutdown_rx).await;
            });
            Some((shutdown_tx, autosave))
        }
        None => {
            info!("No data file configured, timers are kept in memory only");
            None
        }
    };

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST   /timers/start     - Start a new timer");
    info!("  GET    /timers           - List all timers");
    info!("  GET    /timers/:id       - Get timer with elapsed time");
    info!("  POST   /timers/:id/stop  - Stop a running timer");
    info!("  POST   /timers/:id/reset - Restart a timer from zero");
    info!("  DELETE /timers/:id       - Delete a timer");
    info!("  GET    /status           - Service status");
    info!("  GET    /health           - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    // Autosave owns the final flush, so wait for it rather than saving here
    if let Some((shutdown_tx, autosave)) = persistence {
        if shutdown_tx.send(()).is_err() {
            warn!("Autosave task already stopped before shutdown");
        }
        if let Err(e) = autosave.await {
            error!("Autosave task failed: {}", e);
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
