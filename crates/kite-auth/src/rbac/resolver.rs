//! Effective permissions: roles, then menus, then permission strings.
//!
//! Nothing is cached. Every call reads the repositories, so a role or menu
//! change is visible on the next query without a fresh login.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use kite_core::types::{MenuId, RoleId, UserId};
use kite_entity::menu::MenuNode;
use kite_entity::role::{DataScope, Role};

use super::tree::{MenuTreeNode, build_tree};
use crate::error::AuthResult;
use crate::repository::{MenuRepository, RoleRepository};

/// The parts of a role a client needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleSummary {
    /// Role identifier.
    pub id: RoleId,
    /// Stable machine-readable code.
    pub role_code: String,
    /// Human-readable name.
    pub role_name: String,
    /// Row-level visibility the role grants.
    pub data_scope: DataScope,
}

impl From<&Role> for RoleSummary {
    fn from(role: &Role) -> Self {
        Self {
            id: role.id,
            role_code: role.role_code.clone(),
            role_name: role.role_name.clone(),
            data_scope: role.data_scope,
        }
    }
}

/// Everything a user may see and do, computed from their active roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserPermissions {
    /// Active roles, ordered by sort then id.
    pub roles: Vec<RoleSummary>,
    /// Enabled menus granted to those roles.
    pub menu_tree: Vec<MenuTreeNode>,
    /// Flattened permission strings.
    pub permissions: BTreeSet<String>,
}

impl UserPermissions {
    /// Whether the user holds a permission string.
    pub fn has(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

/// Computes effective permissions and menu trees.
#[derive(Debug, Clone)]
pub struct PermissionResolver {
    roles: Arc<dyn RoleRepository>,
    menus: Arc<dyn MenuRepository>,
}

impl PermissionResolver {
    /// Creates a resolver over the role and menu repositories.
    pub fn new(roles: Arc<dyn RoleRepository>, menus: Arc<dyn MenuRepository>) -> Self {
        Self { roles, menus }
    }

    /// Roles, menu tree and permission set of a user.
    pub async fn resolve(&self, user_id: UserId) -> AuthResult<UserPermissions> {
        let (roles, menus) = self.granted(user_id).await?;
        let permissions = flatten_permissions(&menus);
        let menu_tree = build_tree(menus)?;

        debug!(
            user_id = %user_id,
            roles = roles.len(),
            permissions = permissions.len(),
            "Resolved permissions"
        );

        Ok(UserPermissions {
            roles: roles.iter().map(RoleSummary::from).collect(),
            menu_tree,
            permissions,
        })
    }

    /// Navigation tree of a user: granted, enabled and visible nodes only.
    ///
    /// A hidden node hides its whole subtree.
    pub async fn menu_tree(&self, user_id: UserId) -> AuthResult<Vec<MenuTreeNode>> {
        let (_, menus) = self.granted(user_id).await?;
        build_tree(menus.into_iter().filter(|m| m.is_visible))
    }

    /// Whether a user currently holds a permission string.
    pub async fn check_permission(&self, user_id: UserId, permission: &str) -> AuthResult<bool> {
        let (_, menus) = self.granted(user_id).await?;
        Ok(menus
            .iter()
            .any(|m| m.permission_tokens().any(|token| token == permission)))
    }

    /// The full hierarchy including disabled nodes, for administration.
    pub async fn all_menus(&self) -> AuthResult<Vec<MenuTreeNode>> {
        build_tree(self.menus.find_all().await?)
    }

    /// Menu ids granted to a role, ascending.
    pub async fn role_menu_ids(&self, role_id: RoleId) -> AuthResult<Vec<MenuId>> {
        let mut ids = self.menus.find_ids_by_role(role_id).await?;
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn granted(&self, user_id: UserId) -> AuthResult<(Vec<Role>, Vec<MenuNode>)> {
        let roles = self.roles.find_active_by_user(user_id).await?;
        if roles.is_empty() {
            return Ok((roles, Vec::new()));
        }

        let role_ids: Vec<RoleId> = roles.iter().map(|r| r.id).collect();
        let mut seen = BTreeSet::new();
        let menus = self
            .menus
            .find_enabled_by_roles(&role_ids)
            .await?
            .into_iter()
            .filter(|m| m.is_active() && seen.insert(m.id))
            .collect();
        Ok((roles, menus))
    }
}

/// Union of the permission tokens of every node.
pub fn flatten_permissions(menus: &[MenuNode]) -> BTreeSet<String> {
    menus
        .iter()
        .flat_map(MenuNode::permission_tokens)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use kite_entity::EnableStatus;
    use kite_entity::menu::MenuType;

    use super::*;
    use crate::rbac::tree::tests::node;
    use crate::repository::InMemoryDirectory;

    fn role(id: i64, code: &str) -> Role {
        let now = Utc::now();
        Role {
            id: RoleId(id),
            role_code: code.to_string(),
            role_name: code.to_uppercase(),
            sort: id as i32,
            data_scope: DataScope::All,
            status: EnableStatus::Enabled,
            remark: None,
            is_deleted: false,
            create_time: now,
            update_time: now,
        }
    }

    fn with_perms(mut menu: MenuNode, perms: &str) -> MenuNode {
        menu.permissions = Some(perms.to_string());
        menu
    }

    async fn fixture() -> (PermissionResolver, InMemoryDirectory) {
        let dir = InMemoryDirectory::new();
        dir.put_role(role(1, "editor")).await;
        dir.put_role(role(2, "auditor")).await;
        dir.grant_role(UserId(1), RoleId(1)).await;
        dir.grant_role(UserId(1), RoleId(2)).await;

        dir.put_menu(with_perms(node(10, 0, MenuType::Menu, 0), "doc:view")).await;
        dir.put_menu(with_perms(node(11, 10, MenuType::Button, 0), "doc:edit,doc:delete"))
            .await;
        let mut hidden = with_perms(node(12, 10, MenuType::Button, 1), "doc:export");
        hidden.is_visible = false;
        dir.put_menu(hidden).await;
        let mut disabled = with_perms(node(13, 10, MenuType::Button, 2), "doc:purge");
        disabled.status = EnableStatus::Disabled;
        dir.put_menu(disabled).await;

        for menu in [10, 11, 12, 13] {
            dir.grant_menu(RoleId(1), MenuId(menu)).await;
        }
        dir.grant_menu(RoleId(2), MenuId(10)).await;

        let shared = Arc::new(dir.clone());
        (PermissionResolver::new(shared.clone(), shared), dir)
    }

    #[tokio::test]
    async fn test_resolve_merges_roles() {
        let (resolver, _) = fixture().await;
        let resolved = resolver.resolve(UserId(1)).await.unwrap();

        let codes: Vec<&str> = resolved.roles.iter().map(|r| r.role_code.as_str()).collect();
        assert_eq!(codes, vec!["editor", "auditor"]);
        assert_eq!(
            resolved.permissions.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["doc:delete", "doc:edit", "doc:export", "doc:view"]
        );
        assert_eq!(resolved.menu_tree.len(), 1);
        assert_eq!(resolved.menu_tree[0].node_count(), 3);
    }

    #[tokio::test]
    async fn test_user_without_roles_gets_nothing() {
        let (resolver, _) = fixture().await;
        assert_eq!(resolver.resolve(UserId(2)).await.unwrap(), UserPermissions::default());
        assert!(!resolver.check_permission(UserId(2), "doc:view").await.unwrap());
    }

    #[tokio::test]
    async fn test_menu_tree_hides_invisible_nodes() {
        let (resolver, _) = fixture().await;
        let tree = resolver.menu_tree(UserId(1)).await.unwrap();
        let children: Vec<i64> = tree[0].children.iter().map(|c| c.id.get()).collect();
        assert_eq!(children, vec![11]);
    }

    #[tokio::test]
    async fn test_check_permission_follows_role_status() {
        let (resolver, dir) = fixture().await;
        assert!(resolver.check_permission(UserId(1), "doc:edit").await.unwrap());
        assert!(!resolver.check_permission(UserId(1), "doc:purge").await.unwrap());

        dir.set_role_status(RoleId(1), EnableStatus::Disabled).await;
        assert!(!resolver.check_permission(UserId(1), "doc:edit").await.unwrap());
        assert!(resolver.check_permission(UserId(1), "doc:view").await.unwrap());
    }

    #[tokio::test]
    async fn test_admin_views() {
        let (resolver, _) = fixture().await;
        let all = resolver.all_menus().await.unwrap();
        assert_eq!(all[0].node_count(), 4);

        let ids = resolver.role_menu_ids(RoleId(1)).await.unwrap();
        assert_eq!(ids, vec![MenuId(10), MenuId(11), MenuId(12), MenuId(13)]);
    }
}
