//! Menu hierarchy edits through the menu graph.

mod common;

use std::collections::HashMap;

use kite_auth::error::AuthError;
use kite_auth::rbac::build_tree;
use kite_auth::repository::MenuRepository;
use kite_core::types::MenuId;
use kite_entity::EnableStatus;
use kite_entity::menu::{MenuNode, MenuType, MenuUpdate};

use common::{TestKite, menu};

fn reparent(node: &MenuNode, parent: MenuId) -> MenuUpdate {
    MenuUpdate {
        parent_id: parent,
        menu_name: node.menu_name.clone(),
        menu_code: node.menu_code.clone(),
        menu_type: node.menu_type,
        path: node.path.clone(),
        component: node.component.clone(),
        icon: node.icon.clone(),
        sort: node.sort,
        is_visible: node.is_visible,
        status: EnableStatus::Enabled,
        permissions: node.permissions.clone(),
    }
}

async fn parents(kite: &TestKite) -> HashMap<MenuId, MenuId> {
    kite.directory
        .menus()
        .await
        .into_iter()
        .map(|m| (m.id, m.parent_id))
        .collect()
}

#[tokio::test]
async fn test_moving_a_node_under_its_descendant_fails() {
    let kite = TestKite::new().await;
    kite.directory.put_menu(menu(5, 0, MenuType::Directory, None)).await;
    kite.directory.put_menu(menu(8, 5, MenuType::Directory, None)).await;
    let before = parents(&kite).await;

    let five = kite.directory.find_by_id(MenuId(5)).await.unwrap().unwrap();
    let result = kite.graph.update(MenuId(5), reparent(&five, MenuId(8))).await;

    assert!(matches!(result, Err(AuthError::CycleDetected)));
    assert_eq!(parents(&kite).await, before);
    assert_eq!(
        kite.directory.find_by_id(MenuId(5)).await.unwrap().unwrap().parent_id,
        MenuId::ROOT
    );
}

#[tokio::test]
async fn test_reparenting_sequence_stays_acyclic() {
    let kite = TestKite::new().await;
    for id in 100..112 {
        kite.directory
            .put_menu(menu(id, 0, MenuType::Directory, None))
            .await;
    }

    // Linear congruential sequence, so the run is reproducible.
    let mut seed: u64 = 0x2545_f491;
    let mut next = move |bound: i64| {
        seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        ((seed >> 33) as i64) % bound
    };

    let mut rejected = 0;
    for _ in 0..200 {
        let node_id = MenuId(100 + next(12));
        let parent_id = match next(13) {
            12 => MenuId::ROOT,
            offset => MenuId(100 + offset),
        };

        let before = parents(&kite).await;
        let node = kite.directory.find_by_id(node_id).await.unwrap().unwrap();
        match kite.graph.update(node_id, reparent(&node, parent_id)).await {
            Ok(_) => {}
            Err(AuthError::CycleDetected) => {
                rejected += 1;
                assert_eq!(parents(&kite).await, before);
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }

        let all = kite.directory.find_all().await.unwrap();
        let forest = build_tree(all).expect("hierarchy must stay acyclic");
        let reachable: usize = forest.iter().map(|n| n.node_count()).sum();
        assert_eq!(reachable, 12 + 2);
    }
    assert!(rejected > 0);
}

#[tokio::test]
async fn test_rejected_create_writes_nothing() {
    let kite = TestKite::new().await;
    let before = kite.directory.menus().await.len();

    let result = kite
        .graph
        .create(kite_entity::menu::NewMenu {
            parent_id: MenuId(11),
            menu_name: "Nested".to_string(),
            menu_code: "nested".to_string(),
            menu_type: MenuType::Button,
            path: None,
            component: None,
            icon: None,
            sort: 0,
            is_visible: true,
            permissions: None,
        })
        .await;

    assert!(matches!(result, Err(AuthError::InvalidKindNesting { .. })));
    assert_eq!(kite.directory.menus().await.len(), before);
}

#[tokio::test]
async fn test_granted_menu_cannot_be_deleted() {
    let kite = TestKite::new().await;
    assert!(matches!(
        kite.graph.delete(MenuId(10)).await,
        Err(AuthError::HasChildren)
    ));
    assert!(matches!(
        kite.graph.delete(MenuId(11)).await,
        Err(AuthError::InUse)
    ));

    kite.graph
        .assign_role_menus(common::EDITOR, &[MenuId(10)])
        .await
        .unwrap();
    kite.graph.delete(MenuId(11)).await.unwrap();

    let resolved = kite
        .orchestrator
        .get_user_permissions(common::ALICE)
        .await
        .unwrap();
    assert!(!resolved.has("doc:delete"));
}
