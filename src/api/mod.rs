//! HTTP API module
//!
//! Each surface (setup, display, moderator) is addressed by name under `/surfaces/:surface`.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/surfaces/:surface", get(surface_handler))
        .route("/surfaces/:surface/start", post(start_handler))
        .route("/surfaces/:surface/pause", post(pause_handler))
        .route("/surfaces/:surface/resume", post(resume_handler))
        .route("/surfaces/:surface/pause-resume", post(pause_resume_handler))
        .route("/surfaces/:surface/reset", post(reset_handler))
        .route("/surfaces/:surface/adjust", post(adjust_handler))
        .route(
            "/surfaces/:surface/time-travel",
            post(time_travel_handler).delete(cancel_time_travel_handler),
        )
        .route("/surfaces/:surface/settings", put(settings_handler))
        .route(
            "/surfaces/:surface/message",
            post(show_message_handler).delete(hide_message_handler),
        )
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use chrono::DateTime;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{
        clock::ManualClock,
        engine::SpeedBounds,
        state::SurfaceKind,
        sync::{Session, SharedStore},
    };

    fn test_state() -> Arc<AppState> {
        let clock = Arc::new(ManualClock::new(
            DateTime::parse_from_rfc3339("2024-03-01T10:14:30+00:00").unwrap(),
        ));
        let session = Arc::new(Session::new(SharedStore::in_memory(), clock, SpeedBounds::default()));
        Arc::new(AppState::new(session, 20554, "127.0.0.1".to_string(), Duration::from_millis(16)))
    }

    async fn send(state: &Arc<AppState>, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = create_router(Arc::clone(state)).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let state = test_state();
        let (status, body) = send(&state, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        state.shutdown();
    }

    #[tokio::test]
    async fn start_returns_running_view() {
        let state = test_state();
        let (status, body) = send(
            &state,
            Method::POST,
            "/surfaces/moderator/start",
            Some(json!({ "durationMs": 60000 })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["surface"]["surface"], "moderator");
        assert_eq!(body["surface"]["timer"]["status"], "running");
        assert_eq!(body["surface"]["timer"]["remainingMs"], 60000);

        let (last_action, _) = state.get_last_action();
        assert_eq!(last_action.as_deref(), Some("moderator:start"));
        state.shutdown();
    }

    #[tokio::test]
    async fn unknown_surface_is_not_found() {
        let state = test_state();
        let (status, _) = send(&state, Method::POST, "/surfaces/projector/pause", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        state.shutdown();
    }

    #[tokio::test]
    async fn non_positive_start_is_rejected() {
        let state = test_state();
        let (status, _) = send(
            &state,
            Method::POST,
            "/surfaces/setup/start",
            Some(json!({ "durationMs": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        state.shutdown();
    }

    #[tokio::test]
    async fn time_travel_activation_and_rejection() {
        let state = test_state();
        send(
            &state,
            Method::POST,
            "/surfaces/moderator/start",
            Some(json!({ "durationMs": 60000 })),
        )
        .await;

        let (status, body) = send(
            &state,
            Method::POST,
            "/surfaces/moderator/time-travel",
            Some(json!({ "target": "10:15" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["speed"], 2.0);

        let (status, body) = send(
            &state,
            Method::POST,
            "/surfaces/moderator/time-travel",
            Some(json!({ "target": "25:00" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["ok"], false);
        assert_eq!(body["kind"], "invalidFormat");

        let (status, body) = send(
            &state,
            Method::POST,
            "/surfaces/moderator/time-travel",
            Some(json!({ "target": "10:16", "minSpeed": 3.0, "maxSpeed": 1.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "invalidBounds");

        let (status, body) = send(&state, Method::DELETE, "/surfaces/moderator/time-travel", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["surface"]["timeTravel"]["isActive"], false);
        state.shutdown();
    }

    #[tokio::test]
    async fn settings_patch_and_message() {
        let state = test_state();
        let (status, body) = send(
            &state,
            Method::PUT,
            "/surfaces/setup/settings",
            Some(json!({ "displayMode": "both", "allowNegative": false })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["surface"]["settings"]["displayMode"], "both");
        assert_eq!(body["surface"]["settings"]["allowNegative"], false);

        let (status, body) = send(
            &state,
            Method::POST,
            "/surfaces/moderator/message",
            Some(json!({ "message": "Five minutes left" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["surface"]["settings"]["message"], "Five minutes left");
        assert_eq!(body["surface"]["settings"]["messageVisible"], true);

        let (_, body) = send(&state, Method::DELETE, "/surfaces/moderator/message", None).await;
        assert_eq!(body["surface"]["settings"]["messageVisible"], false);
        state.shutdown();
    }

    #[tokio::test]
    async fn status_lists_every_surface() {
        let state = test_state();
        let (status, body) = send(&state, Method::GET, "/status", None).await;
        assert_eq!(status, StatusCode::OK);

        let surfaces = body["surfaces"].as_array().unwrap();
        assert_eq!(surfaces.len(), SurfaceKind::ALL.len());
        assert_eq!(body["port"], 20554);
        state.shutdown();
    }
}
