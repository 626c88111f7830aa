//! Health check handlers.

use axum::Json;
use axum::extract::State;

use crate::dto::response::{DetailedHealthResponse, HealthResponse, MessageResponse};
use crate::state::AppState;

const SERVICE_NAME: &str = "devicehub";

/// GET /
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "DeviceHub session service is running".to_string(),
    })
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/health/detailed
pub async fn health_detailed(State(state): State<AppState>) -> Json<DetailedHealthResponse> {
    let store_ok = state.sessions.store_healthy().await;

    Json(DetailedHealthResponse {
        status: if store_ok { "healthy" } else { "degraded" }.to_string(),
        database: if store_ok { "connected" } else { "unreachable" }.to_string(),
        live_connections: state.registry.connection_count(),
        max_devices: state.sessions.max_devices(),
    })
}
