//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use crate::{
    state::{AppState, SettingsPatch, SurfaceKind},
    sync::Replica,
};
use super::responses::{
    AdjustRequest, ApiResponse, HealthResponse, MessageRequest, StartRequest, StatusResponse, TimeTravelRequest,
    TimeTravelResponse,
};

/// Resolve a surface name from the path, 404 when unknown
fn parse_surface(name: &str) -> Result<SurfaceKind, StatusCode> {
    name.parse().map_err(|e| {
        warn!("{}", e);
        StatusCode::NOT_FOUND
    })
}

/// Apply a mutation to a surface and respond with its updated view
fn mutate<F>(
    state: &AppState,
    surface: &str,
    action: &str,
    message: String,
    operation: F,
) -> Result<Json<ApiResponse>, StatusCode>
where
    F: FnOnce(&mut Replica),
{
    let kind = parse_surface(surface)?;

    if let Err(e) = state.with_surface(kind, action, operation) {
        error!("Failed to {} on {} surface: {}", action, kind, e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    match state.surface_view(kind) {
        Ok(view) => {
            info!("{} endpoint called on {} surface", action, kind);
            Ok(Json(ApiResponse::ok(message, view)))
        }
        Err(e) => {
            error!("Failed to read {} surface: {}", kind, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /surfaces/:surface - Current view of one surface
pub async fn surface_handler(
    State(state): State<Arc<AppState>>,
    Path(surface): Path<String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    let kind = parse_surface(&surface)?;
    match state.surface_view(kind) {
        Ok(view) => Ok(Json(ApiResponse::ok(format!("{} surface", kind), view))),
        Err(e) => {
            error!("Failed to read {} surface: {}", kind, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /surfaces/:surface/start - Begin a new countdown
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    Path(surface): Path<String>,
    Json(request): Json<StartRequest>,
) -> Result<Json<ApiResponse>, StatusCode> {
    // The engine tolerates non-positive durations, but callers are expected to validate
    if request.duration_ms <= 0 {
        warn!("Rejected start with non-positive duration {}ms", request.duration_ms);
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    mutate(
        &state,
        &surface,
        "start",
        format!("Countdown started for {}ms", request.duration_ms),
        |replica| {
            replica.start(request.duration_ms);
        },
    )
}

/// Handle POST /surfaces/:surface/pause
pub async fn pause_handler(
    State(state): State<Arc<AppState>>,
    Path(surface): Path<String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    mutate(&state, &surface, "pause", "Countdown paused".to_string(), |replica| {
        replica.pause();
    })
}

/// Handle POST /surfaces/:surface/resume
pub async fn resume_handler(
    State(state): State<Arc<AppState>>,
    Path(surface): Path<String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    mutate(&state, &surface, "resume", "Countdown resumed".to_string(), |replica| {
        replica.resume();
    })
}

/// Handle POST /surfaces/:surface/pause-resume - Toggle between running and paused
pub async fn pause_resume_handler(
    State(state): State<Arc<AppState>>,
    Path(surface): Path<String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    mutate(&state, &surface, "pause-resume", "Countdown toggled".to_string(), |replica| {
        replica.pause_resume();
    })
}

/// Handle POST /surfaces/:surface/reset
pub async fn reset_handler(
    State(state): State<Arc<AppState>>,
    Path(surface): Path<String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    mutate(&state, &surface, "reset", "Countdown reset".to_string(), |replica| {
        replica.reset();
    })
}

/// Handle POST /surfaces/:surface/adjust - Add or remove time
pub async fn adjust_handler(
    State(state): State<Arc<AppState>>,
    Path(surface): Path<String>,
    Json(request): Json<AdjustRequest>,
) -> Result<Json<ApiResponse>, StatusCode> {
    mutate(
        &state,
        &surface,
        "adjust",
        format!("Countdown adjusted by {}ms", request.delta_ms),
        |replica| {
            replica.adjust_time(request.delta_ms);
        },
    )
}

/// Handle POST /surfaces/:surface/time-travel - Finish the countdown at a time of day
pub async fn time_travel_handler(
    State(state): State<Arc<AppState>>,
    Path(surface): Path<String>,
    Json(request): Json<TimeTravelRequest>,
) -> Result<(StatusCode, Json<TimeTravelResponse>), StatusCode> {
    let kind = parse_surface(&surface)?;
    let bounds = request.bounds(state.session.bounds());

    let result = state
        .with_surface(kind, "time-travel", |replica| {
            replica.activate_time_travel(&request.target, bounds)
        })
        .map_err(|e| {
            error!("Failed to activate time-travel on {} surface: {}", kind, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    match result {
        Ok(activation) => {
            info!("Time-travel endpoint called on {} surface - {:.3}x speed", kind, activation.speed);
            Ok((StatusCode::OK, Json(TimeTravelResponse::activated(activation))))
        }
        Err(e) => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(TimeTravelResponse::rejected(&e)),
        )),
    }
}

/// Handle DELETE /surfaces/:surface/time-travel - Return to normal speed
pub async fn cancel_time_travel_handler(
    State(state): State<Arc<AppState>>,
    Path(surface): Path<String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    mutate(&state, &surface, "time-travel-off", "Time-travel cancelled".to_string(), |replica| {
        replica.deactivate_time_travel();
    })
}

/// Handle PUT /surfaces/:surface/settings - Update display mode, message or negative-time policy
pub async fn settings_handler(
    State(state): State<Arc<AppState>>,
    Path(surface): Path<String>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<ApiResponse>, StatusCode> {
    mutate(&state, &surface, "settings", "Settings updated".to_string(), |replica| {
        replica.update_settings(patch);
    })
}

/// Handle POST /surfaces/:surface/message - Show a message on the display
pub async fn show_message_handler(
    State(state): State<Arc<AppState>>,
    Path(surface): Path<String>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<ApiResponse>, StatusCode> {
    mutate(&state, &surface, "message", "Message shown".to_string(), |replica| {
        replica.show_message(request.message);
    })
}

/// Handle DELETE /surfaces/:surface/message
pub async fn hide_message_handler(
    State(state): State<Arc<AppState>>,
    Path(surface): Path<String>,
) -> Result<Json<ApiResponse>, StatusCode> {
    mutate(&state, &surface, "message-off", "Message hidden".to_string(), |replica| {
        replica.hide_message();
    })
}

/// Handle GET /status - Return every surface's view
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, StatusCode> {
    let surfaces = match state.surface_views() {
        Ok(views) => views,
        Err(e) => {
            error!("Failed to read surfaces: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        surfaces,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
