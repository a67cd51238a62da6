//! Stopwatch Registry - an HTTP service for concurrent, independently
//! addressable timers
//! 
//! Timers are started, stopped, reset, queried and deleted through a
//! shared registry that assigns ids and computes elapsed time on demand.

pub mod config;
pub mod error;
pub mod state;
pub mod api;
pub mod services;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::RegistryError;
pub use state::{AppState, TimerRegistry};
pub use api::create_router;
pub use utils::signals::shutdown_signal;
