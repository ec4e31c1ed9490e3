//! REST API serving a running [`UnifiedDetector`]'s statistics snapshot.
//!
//! A read-only view over live detector state: no persistence layer, no
//! flow store, just whatever the shared `UnifiedDetector` currently knows
//! plus a handful of control endpoints mirroring its own control methods.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::detector::UnifiedDetector;
use crate::report::DetectionReport;
use crate::types::DetectionMethod;

#[derive(Clone)]
pub struct ApiState {
    pub detector: Arc<UnifiedDetector>,
}

/// Errors a handler can fail with. Kept small and literal: this surface has
/// far fewer failure modes than a database-backed one.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub fn router(detector: Arc<UnifiedDetector>) -> Router {
    let state = ApiState { detector };
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/stats", get(stats))
        .route("/api/v1/cache/clear", post(clear_cache))
        .route("/api/v1/detectors/:method", post(set_detector_enabled))
        .route("/api/v1/config/threshold", post(set_threshold))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

async fn stats(State(state): State<ApiState>) -> Json<DetectionReport> {
    let generated_at = chrono::Utc::now().to_rfc3339();
    Json(DetectionReport::snapshot(&state.detector, generated_at))
}

async fn clear_cache(State(state): State<ApiState>) -> StatusCode {
    state.detector.clear_cache();
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
struct EnabledBody {
    enabled: bool,
}

async fn set_detector_enabled(
    State(state): State<ApiState>,
    Path(method): Path<String>,
    Json(body): Json<EnabledBody>,
) -> Result<StatusCode, ApiError> {
    let method = match method.as_str() {
        "dpi" => DetectionMethod::Dpi,
        "port" => DetectionMethod::Port,
        "heuristic" => DetectionMethod::Heuristic,
        other => {
            return Err(ApiError::BadRequest(format!(
                "unknown detector family: {other}"
            )))
        }
    };
    state.detector.set_detector_enabled(method, body.enabled);
    info!(method = %method, enabled = body.enabled, "detector family toggled via API");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ThresholdBody {
    threshold: f32,
}

async fn set_threshold(
    State(state): State<ApiState>,
    Json(body): Json<ThresholdBody>,
) -> Result<StatusCode, ApiError> {
    if !(0.0..=1.0).contains(&body.threshold) {
        return Err(ApiError::BadRequest(
            "threshold must be in [0,1]".to_string(),
        ));
    }
    state.detector.set_confidence_threshold(body.threshold);
    Ok(StatusCode::NO_CONTENT)
}

/// Binds and serves the router until the process is terminated.
pub async fn start_server(detector: Arc<UnifiedDetector>, listen_addr: &str) -> Result<(), std::io::Error> {
    let app = router(detector);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!(addr = listen_addr, "REST API listening");
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let detector = Arc::new(UnifiedDetector::new(Config::default()));
        let app = router(detector);
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
