//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    engine::{Activation, SpeedBounds, TimeTravelError},
    state::SurfaceView,
};

/// Body of POST /surfaces/:surface/start
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub duration_ms: i64,
}

/// Body of POST /surfaces/:surface/adjust
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustRequest {
    pub delta_ms: i64,
}

/// Body of POST /surfaces/:surface/message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

/// Body of POST /surfaces/:surface/time-travel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeTravelRequest {
    /// Target time of day, `HH:MM`
    pub target: String,
    pub min_speed: Option<f64>,
    pub max_speed: Option<f64>,
}

impl TimeTravelRequest {
    /// Bounds requested by the caller, filled in from the session defaults
    pub fn bounds(&self, defaults: SpeedBounds) -> Option<SpeedBounds> {
        if self.min_speed.is_none() && self.max_speed.is_none() {
            return None;
        }
        Some(SpeedBounds {
            min_speed: self.min_speed.unwrap_or(defaults.min_speed),
            max_speed: self.max_speed.unwrap_or(defaults.max_speed),
        })
    }
}

/// Response of every surface mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub surface: SurfaceView,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: String, message: String, surface: SurfaceView) -> Self {
        Self {
            status,
            message,
            timestamp: Utc::now(),
            surface,
        }
    }

    /// Create a success response
    pub fn ok(message: String, surface: SurfaceView) -> Self {
        Self::new("ok".to_string(), message, surface)
    }
}

/// Discriminated result of a time-travel activation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeTravelResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_time_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl TimeTravelResponse {
    pub fn activated(activation: Activation) -> Self {
        Self {
            ok: true,
            speed: Some(activation.speed),
            target_time_ms: Some(activation.target_time_ms),
            error: None,
            kind: None,
        }
    }

    pub fn rejected(error: &TimeTravelError) -> Self {
        Self {
            ok: false,
            speed: None,
            target_time_ms: None,
            error: Some(error.to_string()),
            kind: Some(error.kind().to_string()),
        }
    }
}

/// Status response covering every surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub surfaces: Vec<SurfaceView>,
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
