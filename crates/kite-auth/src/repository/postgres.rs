//! Port implementations for the PostgreSQL repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use kite_core::result::AppResult;
use kite_core::types::{LoginType, MenuId, RoleId, UserId};
use kite_database::repositories as pg;
use kite_entity::menu::{MenuNode, NewMenu};
use kite_entity::role::Role;
use kite_entity::user::Principal;

use super::{MenuRepository, PrincipalRepository, RoleRepository};

#[async_trait]
impl PrincipalRepository for pg::UserRepository {
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<Principal>> {
        pg::UserRepository::find_by_id(self, id).await
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<Principal>> {
        pg::UserRepository::find_by_username(self, username).await
    }

    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<Principal>> {
        pg::UserRepository::find_by_phone(self, phone).await
    }

    async fn find_by_external_id(
        &self,
        provider: LoginType,
        external_id: &str,
    ) -> AppResult<Option<Principal>> {
        pg::UserRepository::find_by_external_id(self, provider, external_id).await
    }

    async fn record_login(
        &self,
        id: UserId,
        ip_address: Option<&str>,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.update_last_login(id, ip_address, at).await
    }
}

#[async_trait]
impl RoleRepository for pg::RoleRepository {
    async fn find_active_by_user(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        pg::RoleRepository::find_active_by_user(self, user_id).await
    }
}

#[async_trait]
impl MenuRepository for pg::MenuRepository {
    async fn find_by_id(&self, id: MenuId) -> AppResult<Option<MenuNode>> {
        pg::MenuRepository::find_by_id(self, id).await
    }

    async fn find_all(&self) -> AppResult<Vec<MenuNode>> {
        pg::MenuRepository::find_all(self).await
    }

    async fn find_enabled_by_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<MenuNode>> {
        pg::MenuRepository::find_enabled_by_roles(self, role_ids).await
    }

    async fn code_exists(&self, menu_code: &str, exclude: Option<MenuId>) -> AppResult<bool> {
        pg::MenuRepository::code_exists(self, menu_code, exclude).await
    }

    async fn count_children(&self, id: MenuId) -> AppResult<i64> {
        pg::MenuRepository::count_children(self, id).await
    }

    async fn count_role_links(&self, id: MenuId) -> AppResult<i64> {
        pg::MenuRepository::count_role_links(self, id).await
    }

    async fn insert(&self, menu: &NewMenu) -> AppResult<MenuNode> {
        pg::MenuRepository::insert(self, menu).await
    }

    async fn update(&self, menu: &MenuNode) -> AppResult<MenuNode> {
        pg::MenuRepository::update(self, menu).await
    }

    async fn soft_delete(&self, id: MenuId) -> AppResult<bool> {
        pg::MenuRepository::soft_delete(self, id).await
    }

    async fn find_ids_by_role(&self, role_id: RoleId) -> AppResult<Vec<MenuId>> {
        pg::MenuRepository::find_ids_by_role(self, role_id).await
    }

    async fn replace_role_menus(&self, role_id: RoleId, menu_ids: &[MenuId]) -> AppResult<()> {
        pg::MenuRepository::replace_role_menus(self, role_id, menu_ids).await
    }
}
