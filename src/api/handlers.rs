//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::{debug, warn};

use crate::{
    error::RegistryError,
    state::{AppState, StopPolicy, TimerId},
};
use super::responses::{
    ApiError, DeleteResponse, DeletedTimer, HealthResponse, StartRequest, StatusResponse,
    TimerListResponse, TimerResponse,
};

/// Validate the `:id` path segment before touching the registry
fn parse_id(raw: &str) -> Result<TimerId, ApiError> {
    raw.parse::<TimerId>().map_err(|e| {
        warn!("Rejected timer id {:?}", raw);
        ApiError(e)
    })
}

/// An empty body means "no label"; anything else must be a StartRequest
fn parse_start_request(body: &[u8]) -> Result<StartRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(StartRequest::default());
    }

    serde_json::from_slice(body).map_err(|e| {
        warn!("Rejected start request body: {}", e);
        ApiError(RegistryError::Validation(format!("Invalid request body: {}", e)))
    })
}

/// Handle POST /timers/start - Start a new timer
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<TimerResponse>), ApiError> {
    let request = parse_start_request(&body)?;
    let timer = state.start_timer(request.label.as_deref())?;

    Ok((
        StatusCode::CREATED,
        Json(TimerResponse::new(timer, "Timer started successfully.")),
    ))
}

/// Handle GET /timers - List all timers in creation order
pub async fn list_handler(State(state): State<Arc<AppState>>) -> Json<TimerListResponse> {
    let timers = state.list_timers();
    debug!("Listing {} timers", timers.len());
    Json(TimerListResponse::new(timers))
}

/// Handle GET /timers/:id - Timer details with current elapsed time
pub async fn get_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TimerResponse>, ApiError> {
    let timer = state.get_timer(parse_id(&id)?)?;
    Ok(Json(TimerResponse::new(timer, "Timer retrieved successfully.")))
}

/// Handle POST /timers/:id/stop - Stop a running timer
pub async fn stop_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TimerResponse>, ApiError> {
    let timer = state.stop_timer(parse_id(&id)?)?;
    Ok(Json(TimerResponse::new(timer, "Timer stopped successfully.")))
}

/// Handle POST /timers/:id/reset - Restart a timer from zero
pub async fn reset_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TimerResponse>, ApiError> {
    let timer = state.reset_timer(parse_id(&id)?)?;
    Ok(Json(TimerResponse::new(timer, "Timer reset successfully.")))
}

/// Handle DELETE /timers/:id - Remove a timer permanently
pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let timer = state.delete_timer(parse_id(&id)?)?;
    Ok(Json(DeleteResponse {
        success: true,
        message: "Timer deleted successfully.".to_string(),
        deleted_timer: DeletedTimer {
            id: timer.id,
            label: timer.label,
        },
    }))
}

/// Handle GET /status - Return current service status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (running_timers, stopped_timers) = state.registry.counts();
    let (last_action, last_action_time) = state.get_last_action();

    Json(StatusResponse {
        running_timers,
        stopped_timers,
        strict_stop: state.registry.stop_policy() == StopPolicy::Strict,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
