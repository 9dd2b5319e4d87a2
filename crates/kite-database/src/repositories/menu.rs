//! Menu repository implementation.

use sqlx::PgPool;

use kite_core::error::{AppError, ErrorKind};
use kite_core::result::AppResult;
use kite_core::types::{MenuId, RoleId};
use kite_entity::menu::{MenuNode, NewMenu};

/// Repository for `sys_menu` and the `sys_role_menu` link table.
#[derive(Debug, Clone)]
pub struct MenuRepository {
    pool: PgPool,
}

impl MenuRepository {
    /// Create a new menu repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a menu node by primary key.
    pub async fn find_by_id(&self, id: MenuId) -> AppResult<Option<MenuNode>> {
        sqlx::query_as::<_, MenuNode>("SELECT * FROM sys_menu WHERE id = $1 AND is_deleted = FALSE")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find menu", e))
    }

    /// Every non-deleted node regardless of status.
    pub async fn find_all(&self) -> AppResult<Vec<MenuNode>> {
        sqlx::query_as::<_, MenuNode>(
            "SELECT * FROM sys_menu WHERE is_deleted = FALSE ORDER BY sort, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list menus", e))
    }

    /// Enabled nodes granted to any of the given roles, each node once.
    pub async fn find_enabled_by_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<MenuNode>> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = role_ids.iter().map(|id| id.get()).collect();

        sqlx::query_as::<_, MenuNode>(
            "SELECT m.* FROM sys_menu m \
             WHERE m.status = 1 AND m.is_deleted = FALSE \
             AND EXISTS (SELECT 1 FROM sys_role_menu rm WHERE rm.menu_id = m.id AND rm.role_id = ANY($1)) \
             ORDER BY m.sort, m.id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find menus for roles", e)
        })
    }

    /// Whether a non-deleted node other than `exclude` already uses `menu_code`.
    pub async fn code_exists(&self, menu_code: &str, exclude: Option<MenuId>) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM sys_menu \
             WHERE menu_code = $1 AND is_deleted = FALSE AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(menu_code)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to check menu code", e))
    }

    /// Number of non-deleted children of a node.
    pub async fn count_children(&self, id: MenuId) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sys_menu WHERE parent_id = $1 AND is_deleted = FALSE",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count children", e))
    }

    /// Number of roles granting a node.
    pub async fn count_role_links(&self, id: MenuId) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sys_role_menu WHERE menu_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count role links", e)
            })
    }

    /// Insert a node and return the stored row.
    pub async fn insert(&self, menu: &NewMenu) -> AppResult<MenuNode> {
        sqlx::query_as::<_, MenuNode>(
            "INSERT INTO sys_menu \
             (parent_id, menu_name, menu_code, menu_type, path, component, icon, sort, is_visible, permissions) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
        )
        .bind(menu.parent_id)
        .bind(&menu.menu_name)
        .bind(&menu.menu_code)
        .bind(menu.menu_type)
        .bind(&menu.path)
        .bind(&menu.component)
        .bind(&menu.icon)
        .bind(menu.sort)
        .bind(menu.is_visible)
        .bind(&menu.permissions)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert menu", e))
    }

    /// Overwrite a node's editable fields and return the stored row.
    pub async fn update(&self, menu: &MenuNode) -> AppResult<MenuNode> {
        sqlx::query_as::<_, MenuNode>(
            "UPDATE sys_menu SET parent_id = $2, menu_name = $3, menu_code = $4, menu_type = $5, \
             path = $6, component = $7, icon = $8, sort = $9, is_visible = $10, status = $11, \
             permissions = $12, update_time = NOW() \
             WHERE id = $1 AND is_deleted = FALSE RETURNING *",
        )
        .bind(menu.id)
        .bind(menu.parent_id)
        .bind(&menu.menu_name)
        .bind(&menu.menu_code)
        .bind(menu.menu_type)
        .bind(&menu.path)
        .bind(&menu.component)
        .bind(&menu.icon)
        .bind(menu.sort)
        .bind(menu.is_visible)
        .bind(menu.status)
        .bind(&menu.permissions)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update menu", e))?
        .ok_or_else(|| AppError::not_found(format!("Menu {} not found", menu.id)))
    }

    /// Mark a node deleted. Returns `false` if it was already gone.
    pub async fn soft_delete(&self, id: MenuId) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE sys_menu SET is_deleted = TRUE, update_time = NOW() \
             WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete menu", e))?;
        Ok(result.rows_affected() > 0)
    }

    /// Menu ids granted to a role.
    pub async fn find_ids_by_role(&self, role_id: RoleId) -> AppResult<Vec<MenuId>> {
        sqlx::query_scalar::<_, MenuId>(
            "SELECT menu_id FROM sys_role_menu WHERE role_id = $1 ORDER BY menu_id",
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find role menu ids", e)
        })
    }

    /// Replace a role's grants in one transaction.
    pub async fn replace_role_menus(&self, role_id: RoleId, menu_ids: &[MenuId]) -> AppResult<()> {
        let map_err =
            |e: sqlx::Error| AppError::with_source(ErrorKind::Database, "Failed to assign role menus", e);

        let mut tx = self.pool.begin().await.map_err(map_err)?;

        sqlx::query("DELETE FROM sys_role_menu WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;

        if !menu_ids.is_empty() {
            let ids: Vec<i64> = menu_ids.iter().map(|id| id.get()).collect();
            sqlx::query(
                "INSERT INTO sys_role_menu (role_id, menu_id) \
                 SELECT $1, UNNEST($2::BIGINT[]) ON CONFLICT DO NOTHING",
            )
            .bind(role_id)
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
        }

        tx.commit().await.map_err(map_err)?;
        Ok(())
    }
}
