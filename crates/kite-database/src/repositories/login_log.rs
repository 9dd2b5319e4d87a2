//! Login history repository implementation.

use sqlx::PgPool;

use kite_core::error::{AppError, ErrorKind};
use kite_core::result::AppResult;
use kite_core::types::LoginLogId;
use kite_entity::audit::NewLoginLog;

/// Append-only repository for `sys_login_log`.
#[derive(Debug, Clone)]
pub struct LoginLogRepository {
    pool: PgPool,
}

impl LoginLogRepository {
    /// Create a new login log repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one entry.
    pub async fn insert(&self, entry: &NewLoginLog) -> AppResult<LoginLogId> {
        sqlx::query_scalar::<_, LoginLogId>(
            "INSERT INTO sys_login_log \
             (user_id, username, ip_address, login_type, status, message, login_time) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(entry.user_id)
        .bind(&entry.username)
        .bind(&entry.ip_address)
        .bind(entry.login_type.code())
        .bind(entry.status)
        .bind(&entry.message)
        .bind(entry.login_time)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert login log", e))
    }

}
