//! API request and response structures

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::RegistryError,
    state::{TimerId, TimerView},
};

/// Body accepted by POST /timers/start
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub label: Option<String>,
}

/// Response carrying a single timer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerResponse {
    pub success: bool,
    pub timer: TimerView,
    pub message: String,
}

impl TimerResponse {
    pub fn new(timer: TimerView, message: &str) -> Self {
        Self {
            success: true,
            timer,
            message: message.to_string(),
        }
    }
}

/// Response for GET /timers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerListResponse {
    pub success: bool,
    pub count: usize,
    pub timers: Vec<TimerView>,
}

impl TimerListResponse {
    pub fn new(timers: Vec<TimerView>) -> Self {
        Self {
            success: true,
            count: timers.len(),
            timers,
        }
    }
}

/// Identity of a timer that no longer exists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedTimer {
    pub id: TimerId,
    pub label: String,
}

/// Response for DELETE /timers/:id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
    pub deleted_timer: DeletedTimer,
}

/// Failure envelope returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    /// Machine-readable code, e.g. `NotFound`
    pub error: String,
    pub message: String,
}

/// Registry error on its way out of a handler
#[derive(Debug)]
pub struct ApiError(pub RegistryError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
            RegistryError::Validation(_) => StatusCode::BAD_REQUEST,
            RegistryError::InvalidState { .. } => StatusCode::CONFLICT,
            RegistryError::Exhausted => StatusCode::SERVICE_UNAVAILABLE,
            RegistryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.0.code().to_string(),
            message: self.0.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Service status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub running_timers: usize,
    pub stopped_timers: usize,
    pub strict_stop: bool,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
