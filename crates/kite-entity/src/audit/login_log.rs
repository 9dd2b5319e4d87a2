//! Login history entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kite_core::types::{LoginType, UserId};

/// Result of a login attempt, stored as a `SMALLINT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
#[serde(rename_all = "lowercase")]
pub enum LoginOutcome {
    /// The attempt was rejected.
    Failure = 0,
    /// The attempt produced a session.
    Success = 1,
}

/// Data required to append a login history entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLoginLog {
    /// The principal, when known.
    pub user_id: Option<UserId>,
    /// The submitted username or phone hint.
    pub username: Option<String>,
    /// Client address.
    pub ip_address: Option<String>,
    /// How the client tried to log in.
    pub login_type: LoginType,
    /// Attempt result.
    pub status: LoginOutcome,
    /// Failure reason or a success note.
    pub message: Option<String>,
    /// When the attempt happened.
    pub login_time: DateTime<Utc>,
}
