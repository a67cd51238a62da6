//! Background tasks module
//! 
//! This module contains background tasks that run alongside the HTTP server.

pub mod autosave;

// Re-export main functions
pub use autosave::{autosave_task, flush_registry};
