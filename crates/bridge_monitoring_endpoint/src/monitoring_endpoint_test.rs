use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bridge_time::test_utils::FakeClock;
use bridge_transfer_recorder::TransferRecorder;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::monitoring_endpoint::{
    MonitoringEndpoint,
    MonitoringEndpointConfig,
    INTERNAL_STATE_PATH,
};

fn endpoint(clock: Arc<FakeClock>) -> MonitoringEndpoint {
    let recorder = Arc::new(Mutex::new(TransferRecorder::new(Duration::from_secs(5))));
    MonitoringEndpoint::new(
        MonitoringEndpointConfig::default(),
        recorder,
        clock,
        json!({"home_rpc_url": "http://localhost:8545"}),
    )
}

#[tokio::test]
async fn welcome_page_is_served_at_the_root() {
    let clock = Arc::new(FakeClock::new(Instant::now()));
    let app = endpoint(clock).app();

    let response =
        app.oneshot(Request::builder().uri("/").body(Body::empty()).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8(body.to_vec()).unwrap().contains("debugging"));
}

#[tokio::test]
async fn internal_state_reports_config_process_and_recorder() {
    let clock = Arc::new(FakeClock::new(Instant::now()));
    let app = endpoint(clock.clone()).app();
    clock.advance(Duration::from_secs(30));

    let response = app
        .oneshot(Request::builder().uri(INTERNAL_STATE_PATH).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let state: Value = serde_json::from_slice(&body).unwrap();

    let bridge = &state["bridge"];
    assert_eq!(bridge["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(bridge["config"]["home_rpc_url"], "http://localhost:8545");
    assert_eq!(bridge["process"]["uptime_seconds"], 30);
    assert_eq!(bridge["recorder"]["transfers"], 0);
    assert_eq!(bridge["recorder"]["is_in_sync"], false);
}
