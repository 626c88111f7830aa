//! Request DTOs.

use serde::Deserialize;
use validator::Validate;

/// POST /api/auth/login
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    /// Browser / platform label.
    #[validate(length(max = 512, message = "device_info must be at most 512 characters"))]
    pub device_info: String,
    /// Previously issued device id; omitted on a device's first login.
    #[serde(default)]
    #[validate(length(max = 128, message = "device_id must be at most 128 characters"))]
    pub device_id: Option<String>,
}

/// POST /api/auth/force-logout
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForceLogoutRequest {
    #[validate(length(min = 1, max = 128, message = "target_device_id is required"))]
    pub target_device_id: String,
    /// The acting device; informational only, it need not be logged in.
    #[serde(default)]
    pub current_device_id: Option<String>,
}

/// POST /api/auth/logout?device_id=
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LogoutQuery {
    #[validate(length(min = 1, max = 128, message = "device_id is required"))]
    pub device_id: String,
}

/// GET /ws/{device_id}?token=
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelQuery {
    #[serde(default)]
    pub token: Option<String>,
}
