//! Menu tree assembly.
//!
//! Nodes are indexed into an arena first, checked for parent cycles, then
//! assembled top-down. A node whose parent is absent from the input is
//! dropped together with its subtree.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use kite_core::types::MenuId;
use kite_entity::menu::{MenuNode, MenuType};

use crate::error::{AuthError, AuthResult};

/// One node of a rendered menu tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuTreeNode {
    /// Menu identifier.
    pub id: MenuId,
    /// Parent menu, or the root sentinel for top-level entries.
    pub parent_id: MenuId,
    /// Label shown in navigation.
    pub menu_name: String,
    /// Stable machine-readable code.
    pub menu_code: String,
    /// Directory, page or button.
    pub menu_type: MenuType,
    /// Route path, when routable.
    pub path: Option<String>,
    /// Frontend component to mount, when routable.
    pub component: Option<String>,
    /// Icon name, when set.
    pub icon: Option<String>,
    /// Ordering among siblings; lower first.
    pub sort: i32,
    /// Whether the entry shows in navigation.
    pub is_visible: bool,
    /// Comma-separated permission tokens this entry grants.
    pub permissions: Option<String>,
    /// Child entries in sibling order.
    pub children: Vec<MenuTreeNode>,
}

impl MenuTreeNode {
    fn leaf(node: &MenuNode) -> Self {
        Self {
            id: node.id,
            parent_id: node.parent_id,
            menu_name: node.menu_name.clone(),
            menu_code: node.menu_code.clone(),
            menu_type: node.menu_type,
            path: node.path.clone(),
            component: node.component.clone(),
            icon: node.icon.clone(),
            sort: node.sort,
            is_visible: node.is_visible,
            permissions: node.permissions.clone(),
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(MenuTreeNode::node_count).sum::<usize>()
    }
}

/// Build a forest from a flat node list.
///
/// Duplicate ids keep the first occurrence. Roots and every child list are
/// ordered by `sort`, then id. A parent cycle anywhere in the input is an
/// [`AuthError::InternalConsistency`].
pub fn build_tree(nodes: impl IntoIterator<Item = MenuNode>) -> AuthResult<Vec<MenuTreeNode>> {
    let mut arena: BTreeMap<MenuId, MenuNode> = BTreeMap::new();
    for node in nodes {
        arena.entry(node.id).or_insert(node);
    }
    ensure_acyclic(&arena)?;

    let mut roots: Vec<&MenuNode> = Vec::new();
    let mut children: HashMap<MenuId, Vec<&MenuNode>> = HashMap::new();
    for node in arena.values() {
        if node.parent_id.is_root() {
            roots.push(node);
        } else if arena.contains_key(&node.parent_id) {
            children.entry(node.parent_id).or_default().push(node);
        } else {
            debug!(menu_id = %node.id, parent_id = %node.parent_id, "Dropping menu with absent parent");
        }
    }

    sort_siblings(&mut roots);
    for siblings in children.values_mut() {
        sort_siblings(siblings);
    }

    let limit = arena.len();
    roots
        .into_iter()
        .map(|root| assemble(root, &children, 1, limit))
        .collect()
}

fn sort_siblings(nodes: &mut [&MenuNode]) {
    nodes.sort_by_key(|n| (n.sort, n.id));
}

fn assemble(
    node: &MenuNode,
    children: &HashMap<MenuId, Vec<&MenuNode>>,
    depth: usize,
    limit: usize,
) -> AuthResult<MenuTreeNode> {
    if depth > limit {
        return Err(AuthError::InternalConsistency(format!(
            "Menu tree under {} is deeper than its node count",
            node.id
        )));
    }

    let mut out = MenuTreeNode::leaf(node);
    if let Some(kids) = children.get(&node.id) {
        out.children = kids
            .iter()
            .map(|child| assemble(child, children, depth + 1, limit))
            .collect::<AuthResult<_>>()?;
    }
    Ok(out)
}

/// Walk every parent chain once; revisiting a node on the current chain is a cycle.
fn ensure_acyclic(arena: &BTreeMap<MenuId, MenuNode>) -> AuthResult<()> {
    let mut settled: HashSet<MenuId> = HashSet::with_capacity(arena.len());

    for start in arena.keys() {
        let mut chain: HashSet<MenuId> = HashSet::new();
        let mut current = *start;
        loop {
            if settled.contains(&current) {
                break;
            }
            if !chain.insert(current) {
                return Err(AuthError::InternalConsistency(format!(
                    "Menu {current} is its own ancestor"
                )));
            }
            match arena.get(&current) {
                Some(node) if !node.parent_id.is_root() => current = node.parent_id,
                _ => break,
            }
        }
        settled.extend(chain);
    }
    Ok(())
}
