//! Principal repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use kite_core::error::{AppError, ErrorKind};
use kite_core::result::AppResult;
use kite_core::types::{LoginType, UserId};
use kite_entity::user::Principal;

/// Repository for principal lookups and login bookkeeping on `sys_user`.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a principal by primary key.
    pub async fn find_by_id(&self, id: UserId) -> AppResult<Option<Principal>> {
        sqlx::query_as::<_, Principal>("SELECT * FROM sys_user WHERE id = $1 AND is_deleted = FALSE")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user by id", e))
    }

    /// Find a principal by its exact login name.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<Principal>> {
        sqlx::query_as::<_, Principal>(
            "SELECT * FROM sys_user WHERE username = $1 AND is_deleted = FALSE",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find user by username", e)
        })
    }

    /// Find a principal by mobile number.
    pub async fn find_by_phone(&self, phone: &str) -> AppResult<Option<Principal>> {
        sqlx::query_as::<_, Principal>(
            "SELECT * FROM sys_user WHERE phone = $1 AND is_deleted = FALSE ORDER BY id LIMIT 1",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user by phone", e))
    }

    /// Find the principal linked to an external account of a delegated provider.
    pub async fn find_by_external_id(
        &self,
        provider: LoginType,
        external_id: &str,
    ) -> AppResult<Option<Principal>> {
        let sql = match provider {
            LoginType::DingTalk => {
                "SELECT * FROM sys_user WHERE dingtalk_id = $1 AND is_deleted = FALSE LIMIT 1"
            }
            LoginType::WeChat => {
                "SELECT * FROM sys_user WHERE wechat_id = $1 AND is_deleted = FALSE LIMIT 1"
            }
            LoginType::Password | LoginType::SmsCode => {
                return Err(AppError::validation(format!(
                    "Login type '{provider}' has no external account column"
                )));
            }
        };

        sqlx::query_as::<_, Principal>(sql)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find user by external id", e)
            })
    }

    /// Record a successful login.
    pub async fn update_last_login(
        &self,
        id: UserId,
        ip_address: Option<&str>,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE sys_user SET last_login_time = $2, last_login_ip = $3, update_time = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .bind(ip_address)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update last login", e)
        })?;
        Ok(())
    }
}
