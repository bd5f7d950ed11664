use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use bridge_time::time::SharedClock;
use bridge_transfer_recorder::TransferRecorder;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;
use validator::Validate;

#[cfg(test)]
#[path = "monitoring_endpoint_test.rs"]
mod monitoring_endpoint_test;

pub const INTERNAL_STATE_PATH: &str = "/bridge/internal-state";

const WELCOME_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>bridge-validator</title>
</head>

<body>
<header>
<h1>Welcome to the bridge validator</h1>
</header>

<p>
You have reached the bridge validator's debug server. This is only meant for
debugging.
</p>

<p>
If you see this in a production setup, please remove the
<code>[monitoring_endpoint]</code> section from your config file.
</p>

</body>
</html>
"#;

#[derive(Debug, Error)]
pub enum MonitoringEndpointRunError {
    #[error(transparent)]
    ServerStartupError(#[from] std::io::Error),
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
pub struct MonitoringEndpointConfig {
    pub ip: IpAddr,
    pub port: u16,
}

impl Default for MonitoringEndpointConfig {
    fn default() -> Self {
        Self { ip: IpAddr::V4(Ipv4Addr::LOCALHOST), port: 8640 }
    }
}

#[derive(Clone)]
struct AppState {
    recorder: Arc<Mutex<TransferRecorder>>,
    clock: SharedClock,
    /// The non-secret subset of the daemon configuration.
    public_config: Arc<Value>,
    started_at: Instant,
}

pub struct MonitoringEndpoint {
    config: MonitoringEndpointConfig,
    app_state: AppState,
}

impl MonitoringEndpoint {
    pub fn new(
        config: MonitoringEndpointConfig,
        recorder: Arc<Mutex<TransferRecorder>>,
        clock: SharedClock,
        public_config: Value,
    ) -> Self {
        let started_at = clock.now();
        let app_state =
            AppState { recorder, clock, public_config: Arc::new(public_config), started_at };
        Self { config, app_state }
    }

    pub async fn run(self) -> Result<(), MonitoringEndpointRunError> {
        let MonitoringEndpointConfig { ip, port } = self.config;
        let addr = SocketAddr::new(ip, port);
        let app = self.app();
        info!("Monitoring endpoint running on http://{addr}");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        Ok(axum::serve(listener, app).await?)
    }

    fn app(&self) -> Router {
        Router::new()
            .route("/", get(welcome))
            .route(INTERNAL_STATE_PATH, get(internal_state))
            .with_state(self.app_state.clone())
    }
}

async fn welcome() -> Html<&'static str> {
    Html(WELCOME_PAGE)
}

async fn internal_state(State(state): State<AppState>) -> Json<Value> {
    let now = state.clock.now();
    let recorder_summary = state.recorder.lock().unwrap().state_summary(now);
    Json(json!({
        "bridge": {
            "version": env!("CARGO_PKG_VERSION"),
            "config": *state.public_config,
            "process": {
                "pid": std::process::id(),
                "uptime_seconds": now.saturating_duration_since(state.started_at).as_secs(),
            },
            "recorder": recorder_summary,
        }
    }))
}
