//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use devicehub_entity::device::DeviceSummary;

/// Login result. `devices` is only present when the limit was reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub device_id: String,
    pub message: String,
    /// Number of active devices for the user.
    pub active_devices: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devices: Option<Vec<DeviceResponse>>,
}

/// Force logout result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceLogoutResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logged_out_device: Option<String>,
}

/// Terse `{success, message}` status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

/// One active device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceResponse {
    pub device_id: String,
    pub device_info: String,
    pub login_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl From<DeviceSummary> for DeviceResponse {
    fn from(summary: DeviceSummary) -> Self {
        Self {
            device_id: summary.device_id,
            device_info: summary.device_info,
            login_time: summary.login_time,
            last_activity: summary.last_activity,
        }
    }
}

/// GET /api/devices/active
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveDevicesResponse {
    pub devices: Vec<DeviceResponse>,
}

/// GET /api/devices/check/{device_id}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceStatusResponse {
    pub device_id: String,
    pub is_active: bool,
}

/// GET /api/user/profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub sub: String,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub picture: String,
}

/// GET /
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// GET /api/health/detailed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedHealthResponse {
    pub status: String,
    pub database: String,
    pub live_connections: usize,
    pub max_devices: usize,
}
