//! Role repository implementation.

use sqlx::PgPool;

use kite_core::error::{AppError, ErrorKind};
use kite_core::result::AppResult;
use kite_core::types::{RoleId, UserId};
use kite_entity::role::Role;

/// Repository for `sys_role` and the `sys_user_role` link table.
#[derive(Debug, Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    /// Create a new role repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a role by primary key.
    pub async fn find_by_id(&self, id: RoleId) -> AppResult<Option<Role>> {
        sqlx::query_as::<_, Role>("SELECT * FROM sys_role WHERE id = $1 AND is_deleted = FALSE")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find role", e))
    }

    /// Enabled, non-deleted roles held by a principal, in display order.
    pub async fn find_active_by_user(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        sqlx::query_as::<_, Role>(
            "SELECT r.* FROM sys_role r \
             JOIN sys_user_role ur ON ur.role_id = r.id \
             WHERE ur.user_id = $1 AND r.status = 1 AND r.is_deleted = FALSE \
             ORDER BY r.sort, r.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find roles for user", e)
        })
    }
}
