//! Device session store contract.
//!
//! The store holds no policy: it answers queries and applies single-row
//! updates. Limit enforcement lives in the session manager.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use devicehub_core::result::AppResult;
use devicehub_entity::device::{DeviceSession, NewDeviceSession};

/// Durable record of device sessions.
#[async_trait]
pub trait DeviceSessionStore: Send + Sync + 'static {
    /// Look up a row by device id regardless of state or owner.
    async fn find_by_device_id(&self, device_id: &str) -> AppResult<Option<DeviceSession>>;

    /// Active rows for a user, most recent login first.
    async fn find_active_by_user(&self, user_id: &str) -> AppResult<Vec<DeviceSession>>;

    /// Number of active rows for a user.
    async fn count_active_by_user(&self, user_id: &str) -> AppResult<usize>;

    /// Create an active row. Returns `None` if the device id already exists.
    async fn insert(&self, session: &NewDeviceSession) -> AppResult<Option<DeviceSession>>;

    /// Overwrite owner, label and timestamps of an existing row and mark it
    /// active. Returns `false` if no row has that device id.
    async fn reactivate(&self, session: &NewDeviceSession) -> AppResult<bool>;

    /// Deactivate a row only if it is active and owned by `user_id`.
    async fn deactivate_owned(&self, device_id: &str, user_id: &str) -> AppResult<bool>;

    /// Deactivate a row if it is active.
    async fn deactivate(&self, device_id: &str) -> AppResult<bool>;

    /// Set `last_activity` on an active row.
    async fn touch_activity(&self, device_id: &str, at: DateTime<Utc>) -> AppResult<bool>;

    /// Check the backing store is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
