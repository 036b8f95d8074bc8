use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::client::ClientHandle;
use crate::constants::api::SERVICE_NAME;
use crate::error::MonitorResult;
use crate::services::view::SnapshotView;

pub struct AppState {
    pub client: ClientHandle,
    pub view: SnapshotView,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/snapshot", get(snapshot))
        .route("/wake", post(wake))
        .route("/refresh", post(refresh))
        .with_state(state)
}

pub async fn run_server(state: Arc<AppState>, addr: &str) -> MonitorResult<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("🌐 Status API listening on {}", addr);
    serve(listener, state).await
}

pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> MonitorResult<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
    }))
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let view = state.view.state().await;
    Json(json!({
        "connection": view.connection,
        "revision": view.snapshot.revision,
        "last_update": view.last_update(),
        "server_errors": view.server_errors,
        "last_server_error": view.last_server_error,
    }))
}

async fn snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let view = state.view.state().await;
    Json(view.snapshot.as_ref().clone())
}

async fn wake(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.client.wake() {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({"status": "wake_requested"}))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "error", "message": e.to_string()})),
        ),
    }
}

async fn refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.client.request_status() {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({"status": "refresh_requested"}))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "error", "message": e.to_string()})),
        ),
    }
}
