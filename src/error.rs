//! Error taxonomy shared by the registry, the store and the HTTP layer

use thiserror::Error;

use crate::state::{TimerId, TimerStatus};

/// Errors produced by timer registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The referenced timer does not exist (never created or already deleted)
    #[error("No timer found with ID: {0}")]
    NotFound(TimerId),

    /// The requested transition is not allowed from the timer's current status
    #[error("Timer {id} is already {status}")]
    InvalidState { id: TimerId, status: TimerStatus },

    /// Malformed input, rejected before any registry lookup
    #[error("{0}")]
    Validation(String),

    /// Every timer id has been handed out
    #[error("Timer ID space exhausted")]
    Exhausted,

    /// Reading or writing the persisted snapshot failed
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl RegistryError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFound",
            Self::InvalidState { .. } => "InvalidState",
            Self::Validation(_) => "ValidationError",
            Self::Exhausted => "IdSpaceExhausted",
            Self::Storage(_) => "StorageError",
        }
    }
}

impl From<std::io::Error> for RegistryError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
