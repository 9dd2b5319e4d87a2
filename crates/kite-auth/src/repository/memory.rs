//! In-memory principal, role and menu storage.
//!
//! Suitable for tests and single-node demos only. The setters write straight
//! into the tables without any hierarchy validation, which lets tests seed
//! states the menu graph would refuse.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use kite_core::error::AppError;
use kite_core::result::AppResult;
use kite_core::types::{LoginType, MenuId, RoleId, UserId};
use kite_entity::EnableStatus;
use kite_entity::menu::{MenuNode, NewMenu};
use kite_entity::role::Role;
use kite_entity::user::Principal;

use super::{MenuRepository, PrincipalRepository, RoleRepository};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, Principal>,
    roles: BTreeMap<RoleId, Role>,
    user_roles: BTreeSet<(UserId, RoleId)>,
    menus: BTreeMap<MenuId, MenuNode>,
    role_menus: BTreeSet<(RoleId, MenuId)>,
    next_menu_id: i64,
}

/// Shared in-memory tables implementing every repository port.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a principal.
    pub async fn put_principal(&self, principal: Principal) {
        self.tables.write().await.users.insert(principal.id, principal);
    }

    /// Change a principal's status.
    pub async fn set_principal_status(&self, id: UserId, status: EnableStatus) {
        if let Some(user) = self.tables.write().await.users.get_mut(&id) {
            user.status = status;
        }
    }

    /// Insert or replace a role.
    pub async fn put_role(&self, role: Role) {
        self.tables.write().await.roles.insert(role.id, role);
    }

    /// Change a role's status.
    pub async fn set_role_status(&self, id: RoleId, status: EnableStatus) {
        if let Some(role) = self.tables.write().await.roles.get_mut(&id) {
            role.status = status;
        }
    }

    /// Grant a role to a principal.
    pub async fn grant_role(&self, user_id: UserId, role_id: RoleId) {
        self.tables.write().await.user_roles.insert((user_id, role_id));
    }

    /// Insert or replace a menu node as-is.
    pub async fn put_menu(&self, menu: MenuNode) {
        let mut tables = self.tables.write().await;
        tables.next_menu_id = tables.next_menu_id.max(menu.id.get());
        tables.menus.insert(menu.id, menu);
    }

    /// Grant a menu node to a role.
    pub async fn grant_menu(&self, role_id: RoleId, menu_id: MenuId) {
        self.tables.write().await.role_menus.insert((role_id, menu_id));
    }

    /// Snapshot of every non-deleted node, for assertions.
    pub async fn menus(&self) -> Vec<MenuNode> {
        self.find_all().await.unwrap_or_default()
    }
}

fn live<'a>(users: impl Iterator<Item = &'a Principal>) -> impl Iterator<Item = &'a Principal> {
    users.filter(|u| !u.is_deleted)
}

#[async_trait]
impl PrincipalRepository for InMemoryDirectory {
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<Principal>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).filter(|u| !u.is_deleted).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<Principal>> {
        let tables = self.tables.read().await;
        Ok(live(tables.users.values())
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<Principal>> {
        let tables = self.tables.read().await;
        Ok(live(tables.users.values())
            .find(|u| u.phone.as_deref() == Some(phone))
            .cloned())
    }

    async fn find_by_external_id(
        &self,
        provider: LoginType,
        external_id: &str,
    ) -> AppResult<Option<Principal>> {
        let tables = self.tables.read().await;
        Ok(live(tables.users.values())
            .find(|u| u.external_id(provider) == Some(external_id))
            .cloned())
    }

    async fn record_login(
        &self,
        id: UserId,
        ip_address: Option<&str>,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        user.last_login_time = Some(at);
        user.last_login_ip = ip_address.map(String::from);
        user.update_time = at;
        Ok(())
    }
}

#[async_trait]
impl RoleRepository for InMemoryDirectory {
    async fn find_active_by_user(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        let tables = self.tables.read().await;
        let mut roles: Vec<Role> = tables
            .user_roles
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .filter_map(|(_, rid)| tables.roles.get(rid))
            .filter(|r| r.is_active())
            .cloned()
            .collect();
        roles.sort_by_key(|r| (r.sort, r.id));
        Ok(roles)
    }
}

#[async_trait]
impl MenuRepository for InMemoryDirectory {
    async fn find_by_id(&self, id: MenuId) -> AppResult<Option<MenuNode>> {
        let tables = self.tables.read().await;
        Ok(tables.menus.get(&id).filter(|m| !m.is_deleted).cloned())
    }

    async fn find_all(&self) -> AppResult<Vec<MenuNode>> {
        let tables = self.tables.read().await;
        Ok(tables
            .menus
            .values()
            .filter(|m| !m.is_deleted)
            .cloned()
            .collect())
    }

    async fn find_enabled_by_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<MenuNode>> {
        let tables = self.tables.read().await;
        Ok(tables
            .role_menus
            .iter()
            .filter(|(rid, _)| role_ids.contains(rid))
            .filter_map(|(_, mid)| tables.menus.get(mid))
            .filter(|m| m.is_active())
            .cloned()
            .collect())
    }

    async fn code_exists(&self, menu_code: &str, exclude: Option<MenuId>) -> AppResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .menus
            .values()
            .any(|m| !m.is_deleted && m.menu_code == menu_code && Some(m.id) != exclude))
    }

    async fn count_children(&self, id: MenuId) -> AppResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .menus
            .values()
            .filter(|m| !m.is_deleted && m.parent_id == id)
            .count() as i64)
    }

    async fn count_role_links(&self, id: MenuId) -> AppResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.role_menus.iter().filter(|(_, mid)| *mid == id).count() as i64)
    }

    async fn insert(&self, menu: &NewMenu) -> AppResult<MenuNode> {
        let mut tables = self.tables.write().await;
        tables.next_menu_id += 1;
        let now = Utc::now();
        let node = MenuNode {
            id: MenuId(tables.next_menu_id),
            parent_id: menu.parent_id,
            menu_name: menu.menu_name.clone(),
            menu_code: menu.menu_code.clone(),
            menu_type: menu.menu_type,
            path: menu.path.clone(),
            component: menu.component.clone(),
            icon: menu.icon.clone(),
            sort: menu.sort,
            is_visible: menu.is_visible,
            status: EnableStatus::Enabled,
            permissions: menu.permissions.clone(),
            is_deleted: false,
            create_time: now,
            update_time: now,
        };
        tables.menus.insert(node.id, node.clone());
        Ok(node)
    }

    async fn update(&self, menu: &MenuNode) -> AppResult<MenuNode> {
        let mut tables = self.tables.write().await;
        match tables.menus.get_mut(&menu.id).filter(|m| !m.is_deleted) {
            Some(stored) => {
                *stored = menu.clone();
                Ok(menu.clone())
            }
            None => Err(AppError::not_found(format!("Menu {} not found", menu.id))),
        }
    }

    async fn soft_delete(&self, id: MenuId) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.menus.get_mut(&id).filter(|m| !m.is_deleted) {
            Some(stored) => {
                stored.is_deleted = true;
                stored.update_time = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_ids_by_role(&self, role_id: RoleId) -> AppResult<Vec<MenuId>> {
        let tables = self.tables.read().await;
        Ok(tables
            .role_menus
            .iter()
            .filter(|(rid, _)| *rid == role_id)
            .map(|(_, mid)| *mid)
            .collect())
    }

    async fn replace_role_menus(&self, role_id: RoleId, menu_ids: &[MenuId]) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.role_menus.retain(|(rid, _)| *rid != role_id);
        tables
            .role_menus
            .extend(menu_ids.iter().map(|mid| (role_id, *mid)));
        Ok(())
    }
}
