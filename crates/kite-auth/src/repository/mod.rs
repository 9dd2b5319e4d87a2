//! Storage ports used by the authentication core.
//!
//! Production wiring implements these for the PostgreSQL repositories in
//! `kite-database`; [`memory::InMemoryDirectory`] backs tests and
//! single-node demos.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use kite_core::result::AppResult;
use kite_core::types::{LoginType, MenuId, RoleId, UserId};
use kite_entity::menu::{MenuNode, NewMenu};
use kite_entity::role::Role;
use kite_entity::user::Principal;

pub use memory::InMemoryDirectory;

/// Lookup of principals by the identifiers each credential type carries.
#[async_trait]
pub trait PrincipalRepository: Send + Sync + std::fmt::Debug {
    /// Find a non-deleted principal by id.
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<Principal>>;

    /// Find a non-deleted principal by exact username.
    async fn find_by_username(&self, username: &str) -> AppResult<Option<Principal>>;

    /// Find a non-deleted principal by phone number.
    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<Principal>>;

    /// Find the principal linked to an external account.
    async fn find_by_external_id(
        &self,
        provider: LoginType,
        external_id: &str,
    ) -> AppResult<Option<Principal>>;

    /// Record the time and address of a successful login.
    async fn record_login(
        &self,
        id: UserId,
        ip_address: Option<&str>,
        at: DateTime<Utc>,
    ) -> AppResult<()>;
}

/// Read access to role grants.
#[async_trait]
pub trait RoleRepository: Send + Sync + std::fmt::Debug {
    /// Enabled, non-deleted roles held by a principal.
    async fn find_active_by_user(&self, user_id: UserId) -> AppResult<Vec<Role>>;
}

/// Menu hierarchy storage and role grants.
#[async_trait]
pub trait MenuRepository: Send + Sync + std::fmt::Debug {
    /// Find a non-deleted node.
    async fn find_by_id(&self, id: MenuId) -> AppResult<Option<MenuNode>>;

    /// Every non-deleted node regardless of status.
    async fn find_all(&self) -> AppResult<Vec<MenuNode>>;

    /// Enabled nodes granted to any of the roles. Duplicates are allowed.
    async fn find_enabled_by_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<MenuNode>>;

    /// Whether a non-deleted node other than `exclude` uses `menu_code`.
    async fn code_exists(&self, menu_code: &str, exclude: Option<MenuId>) -> AppResult<bool>;

    /// Number of non-deleted children.
    async fn count_children(&self, id: MenuId) -> AppResult<i64>;

    /// Number of roles granting the node.
    async fn count_role_links(&self, id: MenuId) -> AppResult<i64>;

    /// Store a new node.
    async fn insert(&self, menu: &NewMenu) -> AppResult<MenuNode>;

    /// Overwrite a node's editable fields.
    async fn update(&self, menu: &MenuNode) -> AppResult<MenuNode>;

    /// Soft-delete a node.
    async fn soft_delete(&self, id: MenuId) -> AppResult<bool>;

    /// Menu ids granted to a role.
    async fn find_ids_by_role(&self, role_id: RoleId) -> AppResult<Vec<MenuId>>;

    /// Replace all of a role's grants.
    async fn replace_role_menus(&self, role_id: RoleId, menu_ids: &[MenuId]) -> AppResult<()>;
}
