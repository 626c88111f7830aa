//! Device session manager: the admission/eviction state machine.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use devicehub_core::error::AppError;
use devicehub_core::result::AppResult;
use devicehub_database::store::DeviceSessionStore;
use devicehub_entity::device::{DeviceSession, DeviceSummary, NewDeviceSession, normalize_device_info};

use super::lock::UserLocks;
use super::outcome::{ForceLogoutOutcome, LoginOutcome, LogoutOutcome};

/// Attempts before a login racing on the same new device id gives up.
const MAX_ADMIT_ATTEMPTS: usize = 3;

/// Enforces the per-user active device limit.
///
/// Every operation that can add an active row for a user runs under that
/// user's lock, so the count check and the write are atomic with respect to
/// other logins in this process. Device id uniqueness across users is left
/// to the store.
pub struct DeviceSessionManager {
    store: Arc<dyn DeviceSessionStore>,
    max_devices: usize,
    locks: UserLocks,
}

impl std::fmt::Debug for DeviceSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSessionManager")
            .field("max_devices", &self.max_devices)
            .field("locked_users", &self.locks.len())
            .finish()
    }
}

impl DeviceSessionManager {
    /// Creates a manager over `store` allowing `max_devices` active devices
    /// per user.
    pub fn new(store: Arc<dyn DeviceSessionStore>, max_devices: usize) -> Self {
        Self {
            store,
            max_devices,
            locks: UserLocks::new(),
        }
    }

    pub fn max_devices(&self) -> usize {
        self.max_devices
    }

    /// Admit a device for `user_id`, creating or reactivating its row.
    ///
    /// A missing or blank `device_id` gets a freshly generated one.
    pub async fn login(
        &self,
        user_id: &str,
        device_info: &str,
        device_id: Option<String>,
    ) -> AppResult<LoginOutcome> {
        let device_id = device_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let _guard = self.locks.acquire(user_id).await;

        let session = NewDeviceSession {
            user_id: user_id.to_string(),
            device_id,
            device_info: normalize_device_info(device_info),
            login_time: Utc::now(),
        };

        for _ in 0..MAX_ADMIT_ATTEMPTS {
            let existing = self.store.find_by_device_id(&session.device_id).await?;
            if let Some(outcome) = self.admit(&session, existing).await? {
                return Ok(outcome);
            }
            debug!(
                device_id = %session.device_id,
                "Device id claimed concurrently, retrying admission"
            );
        }

        Err(AppError::conflict(format!(
            "Device '{}' is being registered concurrently",
            session.device_id
        )))
    }

    /// One admission pass. `Ok(None)` means a concurrent insert won the
    /// device id and the caller should re-read it.
    async fn admit(
        &self,
        session: &NewDeviceSession,
        existing: Option<DeviceSession>,
    ) -> AppResult<Option<LoginOutcome>> {
        let user_id = session.user_id.as_str();

        // Re-login on a device this user already holds never counts twice.
        if let Some(row) = existing.as_ref().filter(|row| row.is_active_for(user_id)) {
            if !self.store.reactivate(session).await? {
                return Ok(None);
            }
            let active_devices = self.store.count_active_by_user(user_id).await?;
            info!(
                user_id = %user_id,
                device_id = %row.device_id,
                active_devices,
                "Device session refreshed"
            );
            return Ok(Some(LoginOutcome::Admitted {
                device_id: session.device_id.clone(),
                active_devices,
                reactivated: true,
            }));
        }

        let active = self.store.count_active_by_user(user_id).await?;
        if active >= self.max_devices {
            return self.limit_exceeded(session).await.map(Some);
        }

        match existing {
            Some(_) => {
                // Inactive, or active under another user and now taken over.
                if !self.store.reactivate(session).await? {
                    return Ok(None);
                }
            }
            None => {
                if self.store.insert(session).await?.is_none() {
                    return Ok(None);
                }
            }
        }

        let active_devices = self.store.count_active_by_user(user_id).await?;
        let reactivated = existing.is_some();
        info!(
            user_id = %user_id,
            device_id = %session.device_id,
            active_devices,
            reactivated,
            "Device session admitted"
        );
        Ok(Some(LoginOutcome::Admitted {
            device_id: session.device_id.clone(),
            active_devices,
            reactivated,
        }))
    }

    async fn limit_exceeded(&self, session: &NewDeviceSession) -> AppResult<LoginOutcome> {
        let active_devices: Vec<DeviceSummary> = self
            .store
            .find_active_by_user(&session.user_id)
            .await?
            .iter()
            .map(DeviceSession::summary)
            .collect();

        info!(
            user_id = %session.user_id,
            device_id = %session.device_id,
            active = active_devices.len(),
            max_devices = self.max_devices,
            "Device limit reached"
        );

        Ok(LoginOutcome::LimitExceeded {
            device_id: session.device_id.clone(),
            max_devices: self.max_devices,
            active_devices,
        })
    }

    /// Deactivate `target_device_id` if it is active and belongs to
    /// `user_id`. The caller is responsible for notifying the device.
    pub async fn force_logout(
        &self,
        user_id: &str,
        target_device_id: &str,
    ) -> AppResult<ForceLogoutOutcome> {
        let _guard = self.locks.acquire(user_id).await;

        if !self
            .store
            .deactivate_owned(target_device_id, user_id)
            .await?
        {
            debug!(
                user_id = %user_id,
                device_id = %target_device_id,
                "Force logout target not found"
            );
            return Ok(ForceLogoutOutcome::TargetNotFound);
        }

        info!(user_id = %user_id, device_id = %target_device_id, "Device force logged out");
        Ok(ForceLogoutOutcome::LoggedOut {
            device_id: target_device_id.to_string(),
        })
    }

    /// Deactivate a device. Ownership must be checked by the caller.
    pub async fn logout(&self, device_id: &str) -> AppResult<LogoutOutcome> {
        if self.store.deactivate(device_id).await? {
            info!(device_id = %device_id, "Device logged out");
            Ok(LogoutOutcome::LoggedOut)
        } else {
            Ok(LogoutOutcome::NotFound)
        }
    }

    /// Deactivate `device_id` only while it is active and owned by
    /// `user_id`. Ownership and the write are one conditional update.
    pub async fn logout_owned(&self, user_id: &str, device_id: &str) -> AppResult<LogoutOutcome> {
        if self.store.deactivate_owned(device_id, user_id).await? {
            info!(user_id = %user_id, device_id = %device_id, "Device logged out");
            Ok(LogoutOutcome::LoggedOut)
        } else {
            Ok(LogoutOutcome::NotFound)
        }
    }

    /// Whether `device_id` currently holds an active session.
    pub async fn is_active(&self, device_id: &str) -> AppResult<bool> {
        Ok(self
            .store
            .find_by_device_id(device_id)
            .await?
            .is_some_and(|row| row.is_active))
    }

    /// Bump `last_activity` for an active device. Never fails; store errors
    /// are logged and dropped.
    pub async fn record_activity(&self, device_id: &str) {
        match self.store.touch_activity(device_id, Utc::now()).await {
            Ok(true) => debug!(device_id = %device_id, "Device activity recorded"),
            Ok(false) => debug!(device_id = %device_id, "Activity for inactive device ignored"),
            Err(e) => warn!(device_id = %device_id, error = %e, "Failed to record device activity"),
        }
    }

    /// Active devices for a user, most recent login first.
    pub async fn list_active(&self, user_id: &str) -> AppResult<Vec<DeviceSummary>> {
        Ok(self
            .store
            .find_active_by_user(user_id)
            .await?
            .iter()
            .map(DeviceSession::summary)
            .collect())
    }

    /// Raw row for a device, active or not.
    pub async fn session(&self, device_id: &str) -> AppResult<Option<DeviceSession>> {
        self.store.find_by_device_id(device_id).await
    }

    /// Check the backing store is reachable.
    pub async fn store_healthy(&self) -> bool {
        self.store.health_check().await.unwrap_or(false)
    }
}
