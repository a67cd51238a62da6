//! Main application state shared by the HTTP handlers and background tasks

use std::{
    sync::{Mutex, PoisonError},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::Result;
use super::{
    registry::{RegistrySnapshot, TimerRegistry},
    timer::{Timer, TimerId, TimerView},
};

/// Notification published after every successful registry mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryEvent {
    Started(TimerId),
    Stopped(TimerId),
    Reset(TimerId),
    Deleted(TimerId),
}

impl RegistryEvent {
    pub fn timer_id(&self) -> TimerId {
        match *self {
            Self::Started(id) | Self::Stopped(id) | Self::Reset(id) | Self::Deleted(id) => id,
        }
    }

    /// Short action name used for last-action tracking
    pub fn action(&self) -> &'static str {
        match self {
            Self::Started(_) => "start",
            Self::Stopped(_) => "stop",
            Self::Reset(_) => "reset",
            Self::Deleted(_) => "delete",
        }
    }
}

/// Main application state wrapping the timer registry with server metadata
#[derive(Debug)]
pub struct AppState {
    pub registry: TimerRegistry,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Mutex<Option<String>>,
    pub last_action_time: Mutex<Option<DateTime<Utc>>>,
    /// Channel for registry change notifications
    pub event_tx: broadcast::Sender<RegistryEvent>,
}

impl AppState {
    pub fn new(registry: TimerRegistry, port: u16, host: String) -> Self {
        let (event_tx, _) = broadcast::channel(100);

        Self {
            registry,
            start_time: Instant::now(),
            port,
            host,
            last_action: Mutex::new(None),
            last_action_time: Mutex::new(None),
            event_tx,
        }
    }

    /// Subscribe to registry change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.event_tx.subscribe()
    }

    /// Record the action and notify listeners
    fn publish(&self, event: RegistryEvent) {
        let action = format!("{} {}", event.action(), event.timer_id());
        *self.last_action.lock().unwrap_or_else(PoisonError::into_inner) = Some(action);
        *self.last_action_time.lock().unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());

        // No receivers simply means persistence is disabled
        if let Err(e) = self.event_tx.send(event) {
            debug!("No listeners for registry event {:?}: {}", e.0, e);
        }
    }

    fn log_rejection<T>(&self, operation: &str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            warn!("{} rejected: {}", operation, e);
        }
        result
    }

    pub fn start_timer(&self, label: Option<&str>) -> Result<TimerView> {
        let view = self.log_rejection("Start", self.registry.start(label))?;
        self.publish(RegistryEvent::Started(view.timer.id));
        Ok(view)
    }

    pub fn get_timer(&self, id: TimerId) -> Result<TimerView> {
        self.log_rejection("Get", self.registry.get(id))
    }

    pub fn list_timers(&self) -> Vec<TimerView> {
        self.registry.list()
    }

    pub fn stop_timer(&self, id: TimerId) -> Result<TimerView> {
        let (view, changed) = self.log_rejection("Stop", self.registry.stop_with_change(id))?;
        // a repeated stop changes nothing, so there is nothing to announce
        if changed {
            self.publish(RegistryEvent::Stopped(id));
        }
        Ok(view)
    }

    pub fn reset_timer(&self, id: TimerId) -> Result<TimerView> {
        let view = self.log_rejection("Reset", self.registry.reset(id))?;
        self.publish(RegistryEvent::Reset(id));
        Ok(view)
    }

    pub fn delete_timer(&self, id: TimerId) -> Result<Timer> {
        let timer = self.log_rejection("Delete", self.registry.delete(id))?;
        self.publish(RegistryEvent::Deleted(id));
        Ok(timer)
    }

    /// Replace the registry contents, e.g. from a persisted snapshot on startup
    pub fn restore(&self, snapshot: RegistrySnapshot) -> Result<()> {
        self.registry.restore(snapshot)
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let last_action_time = *self.last_action_time.lock().unwrap_or_else(PoisonError::into_inner);
        (last_action, last_action_time)
    }
}
