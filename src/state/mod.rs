//! State management module
//! 
//! This module contains the timer model, the registry that owns every timer,
//! and the application state shared across the server.

pub mod app_state;
pub mod clock;
pub mod registry;
pub mod timer;

// Re-export main types
pub use app_state::{AppState, RegistryEvent};
pub use clock::{Clock, ManualClock, SystemClock};
pub use registry::{RegistrySnapshot, StopPolicy, TimerRegistry};
pub use timer::{ElapsedTime, Timer, TimerId, TimerStatus, TimerView, DEFAULT_LABEL};
