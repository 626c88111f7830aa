//! Device listing and status.

use axum::Json;
use axum::extract::{Path, State};

use crate::dto::response::{ActiveDevicesResponse, DeviceResponse, DeviceStatusResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/devices/active
pub async fn active(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ActiveDevicesResponse>, ApiError> {
    let devices = state
        .sessions
        .list_active(auth.user_id())
        .await?
        .into_iter()
        .map(DeviceResponse::from)
        .collect();

    Ok(Json(ActiveDevicesResponse { devices }))
}

/// GET /api/devices/check/{device_id}
pub async fn check(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceStatusResponse>, ApiError> {
    let is_active = state.sessions.is_active(&device_id).await?;
    Ok(Json(DeviceStatusResponse {
        device_id,
        is_active,
    }))
}
