//! Domain events emitted by Kite operations.
//!
//! Events are handed to an [`EventSink`](crate::traits::EventSink) and
//! consumed by the login log and online-user projections.

pub mod auth;
pub mod menu;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::UserId;

pub use auth::AuthEvent;
pub use menu::MenuEvent;

/// Wrapper for all domain events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The user who caused the event (if applicable).
    pub actor_id: Option<UserId>,
    /// The event payload.
    pub payload: EventPayload,
}

/// Union of all domain event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event")]
pub enum EventPayload {
    /// A sign-in, session, or sign-out event.
    Auth(AuthEvent),
    /// A menu hierarchy or role grant change.
    Menu(MenuEvent),
}

impl DomainEvent {
    /// Create a new domain event.
    pub fn new(actor_id: Option<UserId>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor_id,
            payload,
        }
    }

    /// Create an authentication event.
    pub fn auth(actor_id: Option<UserId>, event: AuthEvent) -> Self {
        Self::new(actor_id, EventPayload::Auth(event))
    }

    /// Create a menu event.
    pub fn menu(actor_id: Option<UserId>, event: MenuEvent) -> Self {
        Self::new(actor_id, EventPayload::Menu(event))
    }
}
