use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::stats::VisitRecorder;

use super::handlers::{
    get_stats, health_check, method_not_allowed, preflight, track_visit, AppState,
};

pub fn create_router(recorder: VisitRecorder) -> Router {
    let state = Arc::new(AppState { recorder });

    // The tracking endpoint is called cross-origin from the static site,
    // so every response carries permissive CORS headers.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/track-visit",
            get(get_stats)
                .post(track_visit)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .layer(cors)
        .with_state(state)
}
