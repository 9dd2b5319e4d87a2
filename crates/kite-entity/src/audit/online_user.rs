//! Online session projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kite_core::types::UserId;

/// Data required to project a new session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOnlineUser {
    /// Session handle.
    pub session_id: String,
    /// Owner of the session.
    pub user_id: UserId,
    /// Owner's login name.
    pub username: String,
    /// Client address.
    pub ip_address: Option<String>,
    /// When the session was created.
    pub login_time: DateTime<Utc>,
    /// When the session stops being refreshable.
    pub expire_time: DateTime<Utc>,
}
