//! Client fallback chain tests: tier degradation and the 30-minute
//! session dedup, exercised against mock geolocation/counter endpoints
//! and a real tracking server.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tally::api::create_router;
use tally::client::{Tier, VisitTracker, REVISIT_WINDOW_MS};
use tally::config::ClientConfig;
use tally::stats::VisitRecorder;
use tally::store::MemoryStore;

/// Port 9 (discard) is reliably connection-refused on loopback.
const DEAD_ENDPOINT: &str = "http://127.0.0.1:9";

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Mock for the external collaborators: geolocation plus counter API.
async fn spawn_mock_apis() -> String {
    let router = Router::new()
        .route(
            "/json",
            get(|| async { Json(json!({"country_name": "Canada", "country_code": "CA"})) }),
        )
        .route(
            "/hit/{namespace}/{key}",
            get(|| async { Json(json!({"value": 7})) }),
        )
        .route(
            "/get/{namespace}/{key}",
            get(|| async { Json(json!({"value": 7})) }),
        );
    spawn(router).await
}

async fn spawn_tracking_server() -> String {
    let recorder = VisitRecorder::new(Arc::new(MemoryStore::new()));
    spawn(create_router(recorder)).await
}

fn client_config(track_base: &str, api_base: &str, state_dir: &std::path::Path) -> ClientConfig {
    ClientConfig {
        track_endpoint: format!("{track_base}/api/track-visit"),
        geo_api_url: format!("{api_base}/json"),
        counter_api_url: api_base.to_string(),
        counter_namespace: "tally".to_string(),
        counter_key: "total-visitors".to_string(),
        state_dir: state_dir.to_string_lossy().into_owned(),
    }
}

#[tokio::test]
async fn remote_tier_records_and_session_suppresses_repeats() {
    let server = spawn_tracking_server().await;
    let apis = spawn_mock_apis().await;
    let dir = tempfile::tempdir().unwrap();
    let tracker = VisitTracker::new(&client_config(&server, &apis, dir.path())).unwrap();

    let first = tracker.visit(0).await;
    assert_eq!(first.tier, Tier::Remote);
    assert!(first.recorded);
    assert_eq!(first.stats.total_visitors, 1);
    assert_eq!(first.stats.countries["CA"].name, "Canada");

    // Within the window: suppressed, pure read, no double count.
    let repeat = tracker.visit(1_000).await;
    assert!(!repeat.recorded);
    assert_eq!(repeat.stats.total_visitors, 1);

    // After the window: a second increment.
    let later = tracker.visit(REVISIT_WINDOW_MS + 1).await;
    assert!(later.recorded);
    assert_eq!(later.stats.total_visitors, 2);
    assert_eq!(later.stats.countries["CA"].count, 2);
}

#[tokio::test]
async fn geo_failure_reaches_remote_tier_as_the_sentinel() {
    let server = spawn_tracking_server().await;
    let dir = tempfile::tempdir().unwrap();
    // Geolocation and counter API unreachable, tracking server alive.
    let tracker = VisitTracker::new(&client_config(&server, DEAD_ENDPOINT, dir.path())).unwrap();

    let outcome = tracker.visit(0).await;
    assert_eq!(outcome.tier, Tier::Remote);
    assert!(outcome.recorded);
    assert_eq!(outcome.stats.total_visitors, 1);

    // Counted under the sentinel, never a locale-derived code: the
    // locale inference is reserved for the local-only tier.
    assert_eq!(outcome.stats.countries.len(), 1);
    assert_eq!(outcome.stats.countries["XX"].name, "Unknown");
    assert_eq!(outcome.stats.countries["XX"].count, 1);
}

#[tokio::test]
async fn counter_api_tier_carries_total_and_local_countries() {
    let apis = spawn_mock_apis().await;
    let dir = tempfile::tempdir().unwrap();
    let tracker = VisitTracker::new(&client_config(DEAD_ENDPOINT, &apis, dir.path())).unwrap();

    let outcome = tracker.visit(0).await;
    assert_eq!(outcome.tier, Tier::CounterApi);
    assert!(outcome.recorded);
    assert_eq!(outcome.stats.total_visitors, 7);
    assert_eq!(outcome.stats.countries["CA"].count, 1);

    // The country breakdown in this mode is client-local.
    let local: serde_json::Value = serde_json::from_slice(
        &tokio::fs::read(dir.path().join("local-stats.json"))
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(local["countries"]["CA"]["count"], 1);
    assert_eq!(local["totalVisitors"], 0);
}

#[tokio::test]
async fn local_tier_always_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let tracker =
        VisitTracker::new(&client_config(DEAD_ENDPOINT, DEAD_ENDPOINT, dir.path())).unwrap();

    let outcome = tracker.visit(0).await;
    assert_eq!(outcome.tier, Tier::LocalOnly);
    assert!(outcome.recorded);
    assert_eq!(outcome.stats.total_visitors, 1);

    // Geolocation was unreachable too: exactly one country entry, named
    // by the unknown sentinel (code may come from the process locale).
    assert_eq!(outcome.stats.countries.len(), 1);
    let entry = outcome.stats.countries.values().next().unwrap();
    assert_eq!(entry.name, "Unknown");
    assert_eq!(entry.count, 1);

    // The marker still suppresses the next visit.
    let repeat = tracker.visit(1_000).await;
    assert!(!repeat.recorded);
    assert_eq!(repeat.stats.total_visitors, 1);
}
