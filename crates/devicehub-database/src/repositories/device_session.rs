//! PostgreSQL device session repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use devicehub_core::error::{AppError, ErrorKind};
use devicehub_core::result::AppResult;
use devicehub_entity::device::{DeviceSession, NewDeviceSession};

use crate::store::DeviceSessionStore;

const COLUMNS: &str = "id, user_id, device_id, device_info, login_time, last_activity, is_active";

/// Repository for the `device_sessions` table.
#[derive(Debug, Clone)]
pub struct DeviceSessionRepository {
    pool: PgPool,
}

impl DeviceSessionRepository {
    /// Create a new device session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceSessionStore for DeviceSessionRepository {
    async fn find_by_device_id(&self, device_id: &str) -> AppResult<Option<DeviceSession>> {
        sqlx::query_as::<_, DeviceSession>(&format!(
            "SELECT {COLUMNS} FROM device_sessions WHERE device_id = $1"
        ))
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find device", e))
    }

    async fn find_active_by_user(&self, user_id: &str) -> AppResult<Vec<DeviceSession>> {
        sqlx::query_as::<_, DeviceSession>(&format!(
            "SELECT {COLUMNS} FROM device_sessions WHERE user_id = $1 AND is_active \
             ORDER BY login_time DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list active devices", e)
        })
    }

    async fn count_active_by_user(&self, user_id: &str) -> AppResult<usize> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM device_sessions WHERE user_id = $1 AND is_active",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count active devices", e)
        })?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn insert(&self, session: &NewDeviceSession) -> AppResult<Option<DeviceSession>> {
        sqlx::query_as::<_, DeviceSession>(&format!(
            "INSERT INTO device_sessions \
             (user_id, device_id, device_info, login_time, last_activity, is_active) \
             VALUES ($1, $2, $3, $4, $4, TRUE) \
             ON CONFLICT (device_id) DO NOTHING \
             RETURNING {COLUMNS}"
        ))
        .bind(&session.user_id)
        .bind(&session.device_id)
        .bind(&session.device_info)
        .bind(session.login_time)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create device", e))
    }

    async fn reactivate(&self, session: &NewDeviceSession) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE device_sessions \
             SET user_id = $2, device_info = $3, login_time = $4, last_activity = $4, \
                 is_active = TRUE \
             WHERE device_id = $1",
        )
        .bind(&session.device_id)
        .bind(&session.user_id)
        .bind(&session.device_info)
        .bind(session.login_time)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to reactivate device", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_owned(&self, device_id: &str, user_id: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE device_sessions SET is_active = FALSE \
             WHERE device_id = $1 AND user_id = $2 AND is_active",
        )
        .bind(device_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to deactivate device", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn deactivate(&self, device_id: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE device_sessions SET is_active = FALSE WHERE device_id = $1 AND is_active",
        )
        .bind(device_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to deactivate device", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn touch_activity(&self, device_id: &str, at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE device_sessions SET last_activity = $2 WHERE device_id = $1 AND is_active",
        )
        .bind(device_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to record device activity", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))
    }
}
