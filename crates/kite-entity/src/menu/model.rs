//! Menu node entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use kite_core::types::MenuId;

use super::menu_type::MenuType;
use crate::status::EnableStatus;

/// A node of the navigation/permission hierarchy (`sys_menu`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MenuNode {
    /// Unique node identifier.
    pub id: MenuId,
    /// Parent node, [`MenuId::ROOT`] for top-level nodes.
    pub parent_id: MenuId,
    /// Display name.
    pub menu_name: String,
    /// Unique machine code.
    pub menu_code: String,
    /// Node kind.
    pub menu_type: MenuType,
    /// Route path.
    pub path: Option<String>,
    /// Front-end component reference.
    pub component: Option<String>,
    /// Icon name.
    pub icon: Option<String>,
    /// Display order among siblings.
    pub sort: i32,
    /// Hidden nodes still grant permissions but are left out of navigation.
    pub is_visible: bool,
    /// Disabled nodes grant nothing.
    pub status: EnableStatus,
    /// Comma-joined permission tokens, e.g. `"sys:user:add,sys:user:edit"`.
    pub permissions: Option<String>,
    /// Soft-delete marker.
    pub is_deleted: bool,
    /// When the node was created.
    pub create_time: DateTime<Utc>,
    /// When the node was last updated.
    pub update_time: DateTime<Utc>,
}

impl MenuNode {
    /// Iterate the node's permission tokens, trimmed, skipping empty ones.
    pub fn permission_tokens(&self) -> impl Iterator<Item = &str> {
        self.permissions
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    /// Whether the node contributes to permission resolution.
    pub fn is_active(&self) -> bool {
        self.status.is_enabled() && !self.is_deleted
    }
}

/// Data required to create a menu node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMenu {
    /// Parent node, [`MenuId::ROOT`] for a top-level node.
    pub parent_id: MenuId,
    /// Display name.
    pub menu_name: String,
    /// Unique machine code.
    pub menu_code: String,
    /// Node kind.
    pub menu_type: MenuType,
    /// Route path.
    pub path: Option<String>,
    /// Front-end component reference.
    pub component: Option<String>,
    /// Icon name.
    pub icon: Option<String>,
    /// Display order among siblings.
    pub sort: i32,
    /// Show in navigation.
    pub is_visible: bool,
    /// Comma-joined permission tokens.
    pub permissions: Option<String>,
}

/// Full replacement of a menu node's editable fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuUpdate {
    /// New parent node.
    pub parent_id: MenuId,
    /// Display name.
    pub menu_name: String,
    /// Unique machine code.
    pub menu_code: String,
    /// Node kind.
    pub menu_type: MenuType,
    /// Route path.
    pub path: Option<String>,
    /// Front-end component reference.
    pub component: Option<String>,
    /// Icon name.
    pub icon: Option<String>,
    /// Display order among siblings.
    pub sort: i32,
    /// Show in navigation.
    pub is_visible: bool,
    /// Node status.
    pub status: EnableStatus,
    /// Comma-joined permission tokens.
    pub permissions: Option<String>,
}

impl MenuUpdate {
    /// Apply the update onto an existing node, keeping its identity and timestamps.
    pub fn apply_to(&self, node: &MenuNode) -> MenuNode {
        MenuNode {
            id: node.id,
            parent_id: self.parent_id,
            menu_name: self.menu_name.clone(),
            menu_code: self.menu_code.clone(),
            menu_type: self.menu_type,
            path: self.path.clone(),
            component: self.component.clone(),
            icon: self.icon.clone(),
            sort: self.sort,
            is_visible: self.is_visible,
            status: self.status,
            permissions: self.permissions.clone(),
            is_deleted: node.is_deleted,
            create_time: node.create_time,
            update_time: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_tokens_are_trimmed() {
        let now = Utc::now();
        let node = MenuNode {
            id: MenuId(5),
            parent_id: MenuId::ROOT,
            menu_name: "Users".to_string(),
            menu_code: "sys_user".to_string(),
            menu_type: MenuType::Button,
            path: None,
            component: None,
            icon: None,
            sort: 0,
            is_visible: true,
            status: EnableStatus::Enabled,
            permissions: Some(" sys:user:add, ,sys:user:edit ,".to_string()),
            is_deleted: false,
            create_time: now,
            update_time: now,
        };
        let tokens: Vec<&str> = node.permission_tokens().collect();
        assert_eq!(tokens, vec!["sys:user:add", "sys:user:edit"]);
    }
}
