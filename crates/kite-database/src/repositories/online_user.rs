//! Online-user projection repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use kite_core::error::{AppError, ErrorKind};
use kite_core::result::AppResult;
use kite_entity::audit::NewOnlineUser;

/// Repository for `sys_online_user`, keyed by session handle.
#[derive(Debug, Clone)]
pub struct OnlineUserRepository {
    pool: PgPool,
}

impl OnlineUserRepository {
    /// Create a new online user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Project a freshly issued session as online.
    pub async fn upsert(&self, entry: &NewOnlineUser) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO sys_online_user \
             (session_id, user_id, username, ip_address, login_time, last_access_time, expire_time, status, update_time) \
             VALUES ($1, $2, $3, $4, $5, $5, $6, 1, NOW()) \
             ON CONFLICT (session_id) DO UPDATE SET \
             last_access_time = EXCLUDED.last_access_time, expire_time = EXCLUDED.expire_time, \
             status = 1, update_time = NOW()",
        )
        .bind(&entry.session_id)
        .bind(entry.user_id)
        .bind(&entry.username)
        .bind(&entry.ip_address)
        .bind(entry.login_time)
        .bind(entry.expire_time)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to upsert online user", e)
        })?;
        Ok(())
    }

    /// Move a projected session onto its rotated handle.
    pub async fn rotate(
        &self,
        old_session_id: &str,
        new_session_id: &str,
        expire_time: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE sys_online_user SET session_id = $2, expire_time = $3, \
             last_access_time = NOW(), status = 1, update_time = NOW() \
             WHERE session_id = $1",
        )
        .bind(old_session_id)
        .bind(new_session_id)
        .bind(expire_time)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to rotate online user", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark one session offline. Returns `false` if it was not online.
    pub async fn mark_offline(&self, session_id: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE sys_online_user SET status = 0, update_time = NOW() \
             WHERE session_id = $1 AND status = 1",
        )
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark online user offline", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark every session whose expiry has passed as offline.
    pub async fn mark_expired_offline(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE sys_online_user SET status = 0, update_time = NOW() \
             WHERE status = 1 AND expire_time <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to sweep expired sessions", e)
        })?;
        Ok(result.rows_affected())
    }

}
