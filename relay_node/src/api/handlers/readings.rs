use crate::api::{ApiError, ApiResult, AppState};
use crate::relay::RelayOutcome;
use crate::telemetry::{ConfirmedReading, Reading};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use log::error;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct RelayResponse {
    pub status: String,
    pub tx_hash: String,
    pub block: u64,
    pub cid: String,
    /// False when the raw record could not be pinned
    pub pinned: bool,
}

impl From<RelayOutcome> for RelayResponse {
    fn from(outcome: RelayOutcome) -> Self {
        Self {
            status: "ok".to_string(),
            tx_hash: outcome.receipt.tx_hash,
            block: outcome.receipt.block,
            cid: outcome.cid,
            pinned: outcome.pinned,
        }
    }
}

/// Accept a reading from a device and relay it.
///
/// The relay work runs on a tracked task so a dropped connection cannot
/// cancel a transaction that was already broadcast.
pub async fn submit_reading(
    State(state): State<AppState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> ApiResult<Json<RelayResponse>> {
    let Json(payload) = payload?;

    let relay = state.relay.clone();
    let outcome = state
        .tasks
        .spawn(async move { relay.handle(&payload).await })
        .await
        .map_err(|e| {
            error!("Relay task aborted: {}", e);
            ApiError::internal_server_error("relay task aborted")
        })??;

    Ok(Json(RelayResponse::from(outcome)))
}

/// Every accepted reading, in arrival order.
pub async fn list_readings(State(state): State<AppState>) -> Json<Vec<Reading>> {
    Json(state.relay.readings())
}

/// Readings confirmed on-chain.
pub async fn list_confirmed(State(state): State<AppState>) -> Json<Vec<ConfirmedReading>> {
    Json(state.relay.confirmed())
}
