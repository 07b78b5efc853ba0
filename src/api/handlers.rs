use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::model::{VisitEvent, VisitorAggregate};
use crate::stats::VisitRecorder;

pub struct AppState {
    pub recorder: VisitRecorder,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

fn internal_error(details: String) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Internal server error".to_string(),
            details: Some(details),
        }),
    )
}

/// Read the current visitor statistics
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<VisitorAggregate>, (StatusCode, Json<ErrorResponse>)> {
    match state.recorder.snapshot().await {
        Ok(stats) => Ok(Json(stats)),
        Err(e) => {
            tracing::error!("Failed to read visitor stats: {e:#}");
            Err(internal_error(e.to_string()))
        }
    }
}

/// Record one visit and return the post-merge statistics
pub async fn track_visit(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VisitEvent>, JsonRejection>,
) -> Result<Json<VisitorAggregate>, (StatusCode, Json<ErrorResponse>)> {
    // A body with missing fields degrades to the unknown sentinel; only
    // a body that does not parse at all is an error.
    let Json(event) = payload.map_err(|rejection| {
        tracing::warn!("Rejected visit body: {rejection}");
        internal_error(rejection.to_string())
    })?;

    match state.recorder.record(&event).await {
        Ok(stats) => Ok(Json(stats)),
        Err(e) => {
            tracing::error!("Failed to record visit: {e:#}");
            Err(internal_error(e.to_string()))
        }
    }
}

/// CORS preflight: success, no body. The cors layer attaches the
/// access-control headers.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Any method other than GET/POST/OPTIONS on the tracking route
pub async fn method_not_allowed() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse {
            error: "Method not allowed".to_string(),
            details: None,
        }),
    )
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}
