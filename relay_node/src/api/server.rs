use crate::api::handlers::{readings, status};
use crate::relay::RelayService;
use anyhow::Result;
use axum::{
    http::Method,
    routing::get,
    Router,
};
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tower_http::cors::{Any, CorsLayer};

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RelayService>,
    /// Relay account address, for display only
    pub account: String,
    /// In-flight relay tasks, drained on shutdown
    pub tasks: TaskTracker,
}

impl AppState {
    pub fn new(relay: Arc<RelayService>, account: String) -> Self {
        Self {
            relay,
            account,
            tasks: TaskTracker::new(),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status::root))
        .route("/health", get(status::health_check))
        .route(
            "/api/lecturas",
            get(readings::list_readings).post(readings::submit_reading),
        )
        .route("/api/lecturas/confirmadas", get(readings::list_confirmed))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve until Ctrl-C, then wait for in-flight submissions to finish.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let tasks = state.tasks.clone();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Telemetry relay listening on http://{}", addr);
    info!("  GET  /                         - Liveness probe");
    info!("  GET  /health                   - Relay status");
    info!("  POST /api/lecturas             - Submit a reading");
    info!("  GET  /api/lecturas             - Accepted readings");
    info!("  GET  /api/lecturas/confirmadas - Confirmed readings");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tasks.close();
    if !tasks.is_empty() {
        info!("Waiting for {} in-flight submissions", tasks.len());
    }
    tasks.wait().await;
    info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
