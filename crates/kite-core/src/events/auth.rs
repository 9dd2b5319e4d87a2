//! Authentication and session domain events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{LoginType, UserId};

/// Events related to sign-in and session lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuthEvent {
    /// Credentials were accepted and a session was created.
    LoginSucceeded {
        /// The authenticated user.
        user_id: UserId,
        /// The username.
        username: String,
        /// The externally visible session handle.
        session_id: String,
        /// The credential channel used.
        login_type: LoginType,
        /// Client IP address, when known.
        ip_address: Option<String>,
        /// When the session was created.
        login_time: DateTime<Utc>,
        /// When the session expires unless refreshed.
        expire_time: DateTime<Utc>,
    },
    /// A sign-in attempt was rejected.
    LoginFailed {
        /// The user, when the attempt got far enough to identify one.
        user_id: Option<UserId>,
        /// The username or phone number the caller supplied.
        username: Option<String>,
        /// The credential channel used.
        login_type: LoginType,
        /// Client IP address, when known.
        ip_address: Option<String>,
        /// Why the attempt failed.
        reason: String,
    },
    /// A refresh token was exchanged for a new one.
    SessionRotated {
        /// The session owner.
        user_id: UserId,
        /// The handle of the consumed session.
        old_session_id: String,
        /// The handle of the replacement session.
        new_session_id: String,
        /// When the replacement session expires.
        expire_time: DateTime<Utc>,
    },
    /// A user ended one of their own sessions.
    LoggedOut {
        /// The session owner.
        user_id: UserId,
        /// The username.
        username: String,
        /// The ended session handle.
        session_id: String,
        /// Client IP address, when known.
        ip_address: Option<String>,
    },
    /// An administrator ended somebody's session.
    ForcedLogout {
        /// The user whose session was ended.
        user_id: UserId,
        /// Their username.
        username: String,
        /// The ended session handle.
        session_id: String,
        /// The administrator who ended it.
        terminated_by: UserId,
    },
}

impl AuthEvent {
    /// The session handle this event refers to, if any.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::LoginSucceeded { session_id, .. }
            | Self::LoggedOut { session_id, .. }
            | Self::ForcedLogout { session_id, .. } => Some(session_id),
            Self::SessionRotated { new_session_id, .. } => Some(new_session_id),
            Self::LoginFailed { .. } => None,
        }
    }
}
