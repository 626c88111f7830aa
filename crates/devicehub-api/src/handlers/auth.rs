//! Device login, force logout and logout.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use tracing::debug;
use validator::Validate;

use devicehub_auth::session::{ForceLogoutOutcome, LoginOutcome, LogoutOutcome};
use devicehub_core::error::AppError;

use crate::dto::request::{ForceLogoutRequest, LoginRequest, LogoutQuery};
use crate::dto::response::{DeviceResponse, ForceLogoutResponse, LoginResponse, StatusResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// Pushed to a device evicted from another of the user's devices.
const FORCE_LOGOUT_MESSAGE: &str = "You have been logged out by another device";

/// Pushed to a channel whose device id was claimed by another account.
const TAKEOVER_MESSAGE: &str = "This device was signed in to another account";

fn validate<T: Validate>(req: &T) -> Result<(), ApiError> {
    req.validate()
        .map_err(|e| ApiError(AppError::validation(e.to_string())))
}

/// POST /api/auth/login
///
/// Both outcomes return 200; a refused login carries the active device list
/// so the client can offer one to evict.
pub async fn login(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    validate(&req)?;

    let outcome = state
        .sessions
        .login(auth.user_id(), &req.device_info, req.device_id)
        .await?;

    let response = match outcome {
        LoginOutcome::Admitted {
            device_id,
            active_devices,
            reactivated,
        } => {
            // A channel left open by the device's previous owner is evicted.
            if let Some(handle) = state.registry.foreign_connection(&device_id, auth.user_id()) {
                debug!(
                    device_id = %device_id,
                    previous_user = %handle.user_id,
                    "Evicting live channel of previous device owner"
                );
                let registry = Arc::clone(&state.registry);
                tokio::spawn(async move {
                    registry.logout_connection(handle, TAKEOVER_MESSAGE).await;
                });
            }

            LoginResponse {
                success: true,
                device_id,
                message: if reactivated {
                    "Device reactivated successfully".to_string()
                } else {
                    "Device logged in successfully".to_string()
                },
                active_devices,
                devices: None,
            }
        }
        LoginOutcome::LimitExceeded {
            device_id,
            max_devices,
            active_devices,
        } => LoginResponse {
            success: false,
            device_id,
            message: format!("Maximum {max_devices} devices allowed"),
            active_devices: active_devices.len(),
            devices: Some(active_devices.into_iter().map(DeviceResponse::from).collect()),
        },
    };

    Ok(Json(response))
}

/// POST /api/auth/force-logout
///
/// Success is reported as soon as the session is deactivated; the live
/// notification and channel teardown run in the background.
pub async fn force_logout(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ForceLogoutRequest>,
) -> Result<Json<ForceLogoutResponse>, ApiError> {
    validate(&req)?;

    let outcome = state
        .sessions
        .force_logout(auth.user_id(), &req.target_device_id)
        .await?;

    let response = match outcome {
        ForceLogoutOutcome::LoggedOut { device_id } => {
            debug!(
                device_id = %device_id,
                requested_by = ?req.current_device_id,
                "Scheduling force logout notification"
            );
            let registry = Arc::clone(&state.registry);
            let target = device_id.clone();
            tokio::spawn(async move {
                registry
                    .send_logout_notification(&target, FORCE_LOGOUT_MESSAGE)
                    .await;
            });

            ForceLogoutResponse {
                success: true,
                message: "Device logged out successfully".to_string(),
                logged_out_device: Some(device_id),
            }
        }
        ForceLogoutOutcome::TargetNotFound => ForceLogoutResponse {
            success: false,
            message: "Target device not found or already logged out".to_string(),
            logged_out_device: None,
        },
    };

    Ok(Json(response))
}

/// POST /api/auth/logout?device_id=
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<LogoutQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    validate(&query)?;

    let outcome = state
        .sessions
        .logout_owned(auth.user_id(), &query.device_id)
        .await?;

    let response = match outcome {
        LogoutOutcome::LoggedOut => {
            state
                .registry
                .disconnect_owned(&query.device_id, auth.user_id());
            StatusResponse {
                success: true,
                message: "Device logged out successfully".to_string(),
            }
        }
        LogoutOutcome::NotFound => StatusResponse {
            success: false,
            message: "Device not found".to_string(),
        },
    };

    Ok(Json(response))
}
