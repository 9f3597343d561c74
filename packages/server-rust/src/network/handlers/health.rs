//! Version, favicon and backend health endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use super::AppState;

/// Backend health as reported under the `easystore` key.
#[derive(Debug, Serialize)]
pub struct BackendHealth {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Reports the build version.
pub async fn version_handler() -> Json<Value> {
    Json(json!({ "build": env!("CARGO_PKG_VERSION") }))
}

/// Answers browser favicon requests without logging a 404.
pub async fn favicon_handler() -> StatusCode {
    StatusCode::OK
}

/// Probes the backend.
///
/// Always returns 200: the `healthy` flag carries the verdict, so monitoring
/// can tell "service up, backend down" apart from "service down".
pub async fn healthcheck_handler(State(state): State<AppState>) -> Json<Value> {
    let health = match state.gateway.check().await {
        Ok(()) => BackendHealth {
            healthy: true,
            message: None,
        },
        Err(err) => {
            error!("backend health check failed: {err}");
            BackendHealth {
                healthy: false,
                message: Some(err.to_string()),
            }
        }
    };
    Json(json!({ "easystore": health }))
}
