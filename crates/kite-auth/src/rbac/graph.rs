//! Validated mutations of the menu hierarchy.
//!
//! Every write goes through here. Mutations hold a process-wide edit lock so
//! two concurrent reparentings cannot each pass validation against a state
//! the other is about to change. The repository is written only after all
//! checks pass; a rejected edit leaves the hierarchy untouched.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use kite_core::events::{DomainEvent, MenuEvent};
use kite_core::traits::EventSink;
use kite_core::types::{MenuId, RoleId};
use kite_entity::menu::{MenuNode, MenuType, MenuUpdate, NewMenu};

use crate::error::{AuthError, AuthResult};
use crate::repository::MenuRepository;

/// Guards the menu hierarchy's invariants on create, update and delete.
#[derive(Debug, Clone)]
pub struct MenuGraph {
    menus: Arc<dyn MenuRepository>,
    events: Arc<dyn EventSink>,
    edit_lock: Arc<Mutex<()>>,
}

impl MenuGraph {
    /// Creates a graph over the menu repository.
    pub fn new(menus: Arc<dyn MenuRepository>, events: Arc<dyn EventSink>) -> Self {
        Self {
            menus,
            events,
            edit_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Check that `node_id` (or a new node, when `None`) of the given kind may
    /// sit under `new_parent_id`.
    pub async fn validate_parent_assignment(
        &self,
        node_id: Option<MenuId>,
        new_parent_id: MenuId,
        kind: MenuType,
    ) -> AuthResult<()> {
        let all = self.menus.find_all().await?;
        check_placement(&index(&all), node_id, new_parent_id, kind)
    }

    /// Create a node after checking its code and placement.
    pub async fn create(&self, menu: NewMenu) -> AuthResult<MenuNode> {
        let _guard = self.edit_lock.lock().await;

        if self.menus.code_exists(&menu.menu_code, None).await? {
            return Err(AuthError::DuplicateCode(menu.menu_code));
        }
        let all = self.menus.find_all().await?;
        check_placement(&index(&all), None, menu.parent_id, menu.menu_type)?;

        let created = self.menus.insert(&menu).await?;
        info!(menu_id = %created.id, parent_id = %created.parent_id, code = %created.menu_code, "Menu created");

        self.publish(MenuEvent::Created {
            menu_id: created.id,
            parent_id: created.parent_id,
            menu_code: created.menu_code.clone(),
        })
        .await;
        Ok(created)
    }

    /// Replace a node's editable fields.
    ///
    /// A kind change is checked against the node's existing children as well
    /// as against its parent.
    pub async fn update(&self, id: MenuId, update: MenuUpdate) -> AuthResult<MenuNode> {
        let _guard = self.edit_lock.lock().await;

        let existing = self
            .menus
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("Menu {id}")))?;

        if self.menus.code_exists(&update.menu_code, Some(id)).await? {
            return Err(AuthError::DuplicateCode(update.menu_code));
        }

        let all = self.menus.find_all().await?;
        let nodes = index(&all);
        check_placement(&nodes, Some(id), update.parent_id, update.menu_type)?;

        if update.menu_type != existing.menu_type {
            if let Some(child) = all
                .iter()
                .filter(|m| m.parent_id == id && m.id != id)
                .find(|m| !update.menu_type.accepts_child(m.menu_type))
            {
                return Err(AuthError::InvalidKindNesting {
                    parent: update.menu_type.to_string(),
                    child: child.menu_type.to_string(),
                });
            }
        }

        let updated = self.menus.update(&update.apply_to(&existing)).await?;
        info!(menu_id = %id, parent_id = %updated.parent_id, "Menu updated");

        self.publish(MenuEvent::Updated {
            menu_id: id,
            parent_id: updated.parent_id,
        })
        .await;
        Ok(updated)
    }

    /// Soft-delete a leaf node that no role references.
    pub async fn delete(&self, id: MenuId) -> AuthResult<()> {
        let _guard = self.edit_lock.lock().await;

        if self.menus.find_by_id(id).await?.is_none() {
            return Err(AuthError::NotFound(format!("Menu {id}")));
        }
        if self.menus.count_children(id).await? > 0 {
            return Err(AuthError::HasChildren);
        }
        if self.menus.count_role_links(id).await? > 0 {
            return Err(AuthError::InUse);
        }

        if !self.menus.soft_delete(id).await? {
            return Err(AuthError::NotFound(format!("Menu {id}")));
        }
        info!(menu_id = %id, "Menu deleted");

        self.publish(MenuEvent::Deleted { menu_id: id }).await;
        Ok(())
    }

    /// Replace every menu grant of a role.
    pub async fn assign_role_menus(&self, role_id: RoleId, menu_ids: &[MenuId]) -> AuthResult<()> {
        let _guard = self.edit_lock.lock().await;

        let wanted: BTreeSet<MenuId> = menu_ids.iter().copied().collect();
        let existing: HashSet<MenuId> = self
            .menus
            .find_all()
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();
        if let Some(missing) = wanted.iter().find(|id| !existing.contains(id)) {
            return Err(AuthError::NotFound(format!("Menu {missing}")));
        }

        let ids: Vec<MenuId> = wanted.into_iter().collect();
        self.menus.replace_role_menus(role_id, &ids).await?;
        info!(role_id = %role_id, count = ids.len(), "Role menus assigned");

        self.publish(MenuEvent::RoleMenusAssigned {
            role_id,
            menu_count: ids.len(),
        })
        .await;
        Ok(())
    }

    async fn publish(&self, event: MenuEvent) {
        if let Err(e) = self.events.publish(DomainEvent::menu(None, event)).await {
            warn!(error = %e, "Failed to publish menu event");
        }
    }
}

fn index(all: &[MenuNode]) -> HashMap<MenuId, &MenuNode> {
    all.iter().map(|m| (m.id, m)).collect()
}

/// Placement rules against a snapshot of the hierarchy.
///
/// The ancestor walk visits each node at most once, so a cycle already
/// present in stored data still terminates.
fn check_placement(
    nodes: &HashMap<MenuId, &MenuNode>,
    node_id: Option<MenuId>,
    new_parent_id: MenuId,
    kind: MenuType,
) -> AuthResult<()> {
    if new_parent_id.is_root() {
        return Ok(());
    }
    if node_id == Some(new_parent_id) {
        return Err(AuthError::CycleDetected);
    }

    let parent = nodes
        .get(&new_parent_id)
        .ok_or(AuthError::ParentNotFound(new_parent_id.get()))?;

    if let Some(node_id) = node_id {
        let mut visited = HashSet::new();
        let mut current = new_parent_id;
        while !current.is_root() && visited.insert(current) {
            if current == node_id {
                return Err(AuthError::CycleDetected);
            }
            match nodes.get(&current) {
                Some(node) => current = node.parent_id,
                None => break,
            }
        }
    }

    if !parent.menu_type.accepts_child(kind) {
        return Err(AuthError::InvalidKindNesting {
            parent: parent.menu_type.to_string(),
            child: kind.to_string(),
        });
    }
    Ok(())
}
