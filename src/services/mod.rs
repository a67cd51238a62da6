//! External collaborator module
//! 
//! This module contains the persistence layer the registry saves its
//! snapshots to and restores them from.

pub mod store;

// Re-export main types
pub use store::{JsonFileStore, TimerStore};
