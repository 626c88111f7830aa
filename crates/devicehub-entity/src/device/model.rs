//! Device session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One device's login state for one user.
///
/// Rows are never deleted; logging out flips `is_active` and a later login
/// from the same `device_id` reactivates the row in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DeviceSession {
    /// Surrogate key assigned by the store.
    pub id: i64,
    /// Subject identifier from the identity provider.
    pub user_id: String,
    /// Globally unique device token.
    pub device_id: String,
    /// Normalized device label.
    pub device_info: String,
    /// When the device last logged in.
    pub login_time: DateTime<Utc>,
    /// Last heartbeat or login.
    pub last_activity: DateTime<Utc>,
    /// Whether the device counts against the user's limit.
    pub is_active: bool,
}

impl DeviceSession {
    /// Whether this row is active and owned by `user_id`.
    pub fn is_active_for(&self, user_id: &str) -> bool {
        self.is_active && self.user_id == user_id
    }

    /// Project the fields shown to clients.
    pub fn summary(&self) -> DeviceSummary {
        DeviceSummary {
            device_id: self.device_id.clone(),
            device_info: self.device_info.clone(),
            login_time: self.login_time,
            last_activity: self.last_activity,
        }
    }
}

/// Values written when a device is admitted (created or reactivated).
#[derive(Debug, Clone)]
pub struct NewDeviceSession {
    /// Owning user.
    pub user_id: String,
    /// Device token.
    pub device_id: String,
    /// Normalized device label.
    pub device_info: String,
    /// Login instant; also used as the initial `last_activity`.
    pub login_time: DateTime<Utc>,
}

/// Client-facing view of an active device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub device_id: String,
    pub device_info: String,
    pub login_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}
