//! Shared fixtures for kite-auth integration tests.
//!
//! Everything runs in process: the in-memory directory stands in for
//! PostgreSQL and the moka-backed cache for Redis.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use kite_auth::credential::{CredentialValidator, LoginRequest, SmsSender};
use kite_auth::orchestrator::{AuthOrchestrator, SignInRequest};
use kite_auth::password::PasswordHasher;
use kite_auth::rbac::{MenuGraph, PermissionResolver};
use kite_auth::repository::InMemoryDirectory;
use kite_auth::session::SessionStore;
use kite_auth::token::TokenIssuer;
use kite_cache::provider::CacheManager;
use kite_core::config::{AuthConfig, SmsConfig};
use kite_core::error::AppError;
use kite_core::events::{AuthEvent, DomainEvent, EventPayload};
use kite_core::result::AppResult;
use kite_core::traits::EventSink;
use kite_core::types::{MenuId, RoleId, UserId};
use kite_entity::EnableStatus;
use kite_entity::menu::{MenuNode, MenuType};
use kite_entity::role::{DataScope, Role};
use kite_entity::user::Principal;

pub const ALICE: UserId = UserId(1);
pub const ALICE_PASSWORD: &str = "correct-horse";
pub const ALICE_PHONE: &str = "13800000001";
pub const EDITOR: RoleId = RoleId(1);

/// Event sink that keeps every event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingEventSink {
    pub fn auth_events(&self) -> Vec<AuthEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match &e.payload {
                EventPayload::Auth(auth) => Some(auth.clone()),
                EventPayload::Menu(_) => None,
            })
            .collect()
    }

    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn publish(&self, event: DomainEvent) -> AppResult<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Event sink whose backing store is always down.
#[derive(Debug, Default)]
pub struct BrokenEventSink;

#[async_trait]
impl EventSink for BrokenEventSink {
    async fn publish(&self, _event: DomainEvent) -> AppResult<()> {
        Err(AppError::database("connection refused"))
    }
}

/// SMS sender that keeps the codes instead of sending them.
#[derive(Debug, Default)]
pub struct Outbox {
    sent: Mutex<Vec<(String, String)>>,
}

impl Outbox {
    pub fn last_code_for(&self, phone: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == phone)
            .map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl SmsSender for Outbox {
    async fn send(&self, phone: &str, code: &str) -> AppResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((phone.to_string(), code.to_string()));
        Ok(())
    }
}

/// A fully wired authentication core over in-memory storage.
pub struct TestKite {
    pub directory: InMemoryDirectory,
    pub cache: Arc<CacheManager>,
    pub events: Arc<RecordingEventSink>,
    pub outbox: Arc<Outbox>,
    pub sessions: Arc<SessionStore>,
    pub resolver: Arc<PermissionResolver>,
    pub graph: MenuGraph,
    pub orchestrator: Arc<AuthOrchestrator>,
}

impl TestKite {
    /// Wire everything with a recording event sink.
    pub async fn new() -> Self {
        let events = Arc::new(RecordingEventSink::default());
        Self::with_sink(events.clone(), events).await
    }

    /// Wire everything, delivering events to `sink`.
    pub async fn with_sink(events: Arc<RecordingEventSink>, sink: Arc<dyn EventSink>) -> Self {
        let directory = InMemoryDirectory::new();
        let shared = Arc::new(directory.clone());
        let cache = Arc::new(CacheManager::in_memory());
        let outbox = Arc::new(Outbox::default());

        let validator = Arc::new(CredentialValidator::new(
            shared.clone(),
            cache.clone(),
            outbox.clone(),
            &SmsConfig::default(),
        ));
        let issuer = Arc::new(TokenIssuer::new(&auth_config()).unwrap());
        let sessions = Arc::new(SessionStore::new(cache.clone()));
        let resolver = Arc::new(PermissionResolver::new(shared.clone(), shared.clone()));
        let graph = MenuGraph::new(shared.clone(), sink.clone());
        let orchestrator = Arc::new(AuthOrchestrator::new(
            validator,
            issuer,
            sessions.clone(),
            resolver.clone(),
            shared,
            sink,
        ));

        let kite = Self {
            directory,
            cache,
            events,
            outbox,
            sessions,
            resolver,
            graph,
            orchestrator,
        };
        kite.seed().await;
        kite
    }

    /// Alice holds "editor", which grants menu 10 ("doc:edit") and its
    /// button 11 ("doc:delete").
    async fn seed(&self) {
        self.directory.put_principal(alice()).await;
        self.directory.put_role(role(EDITOR, "editor")).await;
        self.directory.grant_role(ALICE, EDITOR).await;

        self.directory
            .put_menu(menu(10, 0, MenuType::Menu, Some("doc:edit")))
            .await;
        self.directory
            .put_menu(menu(11, 10, MenuType::Button, Some("doc:delete")))
            .await;
        self.directory.grant_menu(EDITOR, MenuId(10)).await;
        self.directory.grant_menu(EDITOR, MenuId(11)).await;
    }
}

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "integration-test-secret-0123456789abcdef".to_string(),
        ..AuthConfig::default()
    }
}

pub fn alice() -> Principal {
    let now = Utc::now();
    Principal {
        id: ALICE,
        username: "alice".to_string(),
        password_hash: PasswordHasher::new()
            .hash_password(ALICE_PASSWORD)
            .expect("hash"),
        phone: Some(ALICE_PHONE.to_string()),
        email: Some("alice@example.com".to_string()),
        real_name: Some("Alice".to_string()),
        dingtalk_id: None,
        wechat_id: None,
        status: EnableStatus::Enabled,
        last_login_time: None,
        last_login_ip: None,
        is_deleted: false,
        create_time: now,
        update_time: now,
    }
}

pub fn role(id: RoleId, code: &str) -> Role {
    let now = Utc::now();
    Role {
        id,
        role_code: code.to_string(),
        role_name: code.to_string(),
        sort: id.get() as i32,
        data_scope: DataScope::All,
        status: EnableStatus::Enabled,
        remark: None,
        is_deleted: false,
        create_time: now,
        update_time: now,
    }
}

pub fn menu(id: i64, parent: i64, kind: MenuType, permissions: Option<&str>) -> MenuNode {
    let now = Utc::now();
    MenuNode {
        id: MenuId(id),
        parent_id: MenuId(parent),
        menu_name: format!("Menu {id}"),
        menu_code: format!("menu_{id}"),
        menu_type: kind,
        path: None,
        component: None,
        icon: None,
        sort: 0,
        is_visible: true,
        status: EnableStatus::Enabled,
        permissions: permissions.map(String::from),
        is_deleted: false,
        create_time: now,
        update_time: now,
    }
}

pub fn password_login(username: &str, password: &str) -> SignInRequest {
    SignInRequest {
        credentials: LoginRequest::Password {
            username: username.to_string(),
            password: password.to_string(),
        },
        remember_me: false,
        client_ip: Some("10.0.0.7".to_string()),
    }
}
