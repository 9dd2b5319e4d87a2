//! Menu hierarchy domain events.

use serde::{Deserialize, Serialize};

use crate::types::{MenuId, RoleId};

/// Events related to menu nodes and role grants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MenuEvent {
    /// A menu node was created.
    Created {
        /// The new node.
        menu_id: MenuId,
        /// Its parent (0 for top level).
        parent_id: MenuId,
        /// Its unique code.
        menu_code: String,
    },
    /// A menu node was updated.
    Updated {
        /// The node.
        menu_id: MenuId,
        /// The parent after the update.
        parent_id: MenuId,
    },
    /// A menu node was soft-deleted.
    Deleted {
        /// The node.
        menu_id: MenuId,
    },
    /// A role's menu grants were replaced.
    RoleMenusAssigned {
        /// The role.
        role_id: RoleId,
        /// Number of menus now granted.
        menu_count: usize,
    },
}
