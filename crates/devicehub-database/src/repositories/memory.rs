//! In-memory device session store using a Tokio mutex.
//!
//! Suitable for tests and single-node development only; nothing survives a
//! restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use devicehub_core::result::AppResult;
use devicehub_entity::device::{DeviceSession, NewDeviceSession};

use crate::store::DeviceSessionStore;

#[derive(Debug, Default)]
struct InnerState {
    next_id: i64,
    /// Device id → row.
    rows: HashMap<String, DeviceSession>,
}

/// In-memory [`DeviceSessionStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryDeviceSessionStore {
    state: Arc<Mutex<InnerState>>,
}

impl MemoryDeviceSessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row for a user, active or not. Used by tests to inspect state.
    pub async fn all_for_user(&self, user_id: &str) -> Vec<DeviceSession> {
        let state = self.state.lock().await;
        let mut rows: Vec<DeviceSession> = state
            .rows
            .values()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.id);
        rows
    }
}

#[async_trait]
impl DeviceSessionStore for MemoryDeviceSessionStore {
    async fn find_by_device_id(&self, device_id: &str) -> AppResult<Option<DeviceSession>> {
        Ok(self.state.lock().await.rows.get(device_id).cloned())
    }

    async fn find_active_by_user(&self, user_id: &str) -> AppResult<Vec<DeviceSession>> {
        let state = self.state.lock().await;
        let mut rows: Vec<DeviceSession> = state
            .rows
            .values()
            .filter(|row| row.is_active_for(user_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.login_time
                .cmp(&a.login_time)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(rows)
    }

    async fn count_active_by_user(&self, user_id: &str) -> AppResult<usize> {
        let state = self.state.lock().await;
        Ok(state
            .rows
            .values()
            .filter(|row| row.is_active_for(user_id))
            .count())
    }

    async fn insert(&self, session: &NewDeviceSession) -> AppResult<Option<DeviceSession>> {
        let mut state = self.state.lock().await;
        if state.rows.contains_key(&session.device_id) {
            return Ok(None);
        }

        state.next_id += 1;
        let row = DeviceSession {
            id: state.next_id,
            user_id: session.user_id.clone(),
            device_id: session.device_id.clone(),
            device_info: session.device_info.clone(),
            login_time: session.login_time,
            last_activity: session.login_time,
            is_active: true,
        };
        state.rows.insert(row.device_id.clone(), row.clone());
        Ok(Some(row))
    }

    async fn reactivate(&self, session: &NewDeviceSession) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let Some(row) = state.rows.get_mut(&session.device_id) else {
            return Ok(false);
        };
        row.user_id = session.user_id.clone();
        row.device_info = session.device_info.clone();
        row.login_time = session.login_time;
        row.last_activity = session.login_time;
        row.is_active = true;
        Ok(true)
    }

    async fn deactivate_owned(&self, device_id: &str, user_id: &str) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        match state.rows.get_mut(device_id) {
            Some(row) if row.is_active_for(user_id) => {
                row.is_active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn deactivate(&self, device_id: &str) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        match state.rows.get_mut(device_id) {
            Some(row) if row.is_active => {
                row.is_active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn touch_activity(&self, device_id: &str, at: DateTime<Utc>) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        match state.rows.get_mut(device_id) {
            Some(row) if row.is_active => {
                row.last_activity = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
