//! Autosave background task

use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, oneshot};
use tracing::{debug, error, info, warn};

use crate::{
    error::{RegistryError, Result},
    services::TimerStore,
    state::AppState,
};

/// Write the current registry snapshot to the store
pub async fn flush_registry(state: &AppState, store: Arc<dyn TimerStore>) -> Result<()> {
    let snapshot = state.registry.snapshot();
    debug!("Flushing {} timers", snapshot.timers.len());

    match tokio::task::spawn_blocking(move || store.save(&snapshot)).await {
        Ok(result) => result,
        Err(e) => Err(RegistryError::Storage(format!("Save task failed: {}", e))),
    }
}

/// Background task that persists the registry after every change. When
/// `shutdown` fires it writes one final snapshot and returns, so no save of
/// its own can land after that one.
pub async fn autosave_task(
    state: Arc<AppState>,
    store: Arc<dyn TimerStore>,
    mut shutdown: oneshot::Receiver<()>,
) {
    info!("Starting autosave task");

    let mut event_rx = state.subscribe();

    loop {
        tokio::select! {
            received = event_rx.recv() => match received {
                Ok(event) => {
                    debug!("Autosave received {:?}", event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    // The snapshot below covers the skipped events too
                    warn!("Autosave lagged behind by {} events", skipped);
                }
                Err(RecvError::Closed) => {
                    info!("Registry event channel closed, stopping autosave task");
                    break;
                }
            },

            _ = &mut shutdown => {
                info!("Autosave stopping for shutdown");
                break;
            }
        }

        if let Err(e) = flush_registry(&state, Arc::clone(&store)).await {
            error!("Failed to save timers: {}", e);
        }
    }

    match flush_registry(&state, store).await {
        Ok(()) => info!("Timers saved"),
        Err(e) => error!("Failed to save timers on shutdown: {}", e),
    }
}
