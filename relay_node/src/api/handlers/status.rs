use crate::api::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub account: String,
    pub stored_readings: usize,
    pub confirmed_readings: usize,
}

/// Liveness probe.
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        status: "ok".to_string(),
        message: "Telemetry relay running".to_string(),
    })
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        account: state.account.clone(),
        stored_readings: state.relay.stored_count(),
        confirmed_readings: state.relay.confirmed_count(),
    })
}
