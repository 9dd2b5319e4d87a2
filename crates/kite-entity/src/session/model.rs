//! Session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kite_core::types::UserId;

/// Lifecycle state of a cached session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// The refresh token may still be exchanged.
    Active,
    /// The session was ended and must not be honoured.
    Revoked,
}

/// A live login session, held only in the cache.
///
/// `session_id` is the lowercase hex SHA-256 digest of the refresh token, so
/// the handle can be listed to administrators without leaking the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Online-session handle.
    pub session_id: String,
    /// Owner of the session.
    pub user_id: UserId,
    /// Owner's login name at the time of issue.
    pub username: String,
    /// When the session was first created by sign-in.
    pub issued_at: DateTime<Utc>,
    /// When the session was last used (issue or rotation).
    pub last_access_time: DateTime<Utc>,
    /// Absolute expiry of the refresh token.
    pub expires_at: DateTime<Utc>,
    /// Client address at sign-in.
    pub client_ip: Option<String>,
    /// Whether the long-lived access token lifetime was requested.
    pub remember_me: bool,
    /// Lifecycle state.
    pub status: SessionStatus,
}

impl Session {
    /// Check whether the session can still be used at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::Active && self.expires_at > now
    }

    /// Time left before expiry at `now`, or `None` once expired.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        (self.expires_at - now).to_std().ok().filter(|d| !d.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_in: Duration) -> Session {
        let now = Utc::now();
        Session {
            session_id: "abc".to_string(),
            user_id: UserId(3),
            username: "carol".to_string(),
            issued_at: now,
            last_access_time: now,
            expires_at: now + expires_in,
            client_ip: None,
            remember_me: false,
            status: SessionStatus::Active,
        }
    }

    #[test]
    fn test_expired_session_is_inactive() {
        let now = Utc::now();
        let s = session(Duration::seconds(-1));
        assert!(!s.is_active_at(now));
        assert!(s.remaining_at(now).is_none());
    }

    #[test]
    fn test_revoked_session_is_inactive() {
        let now = Utc::now();
        let mut s = session(Duration::hours(1));
        assert!(s.is_active_at(now));
        s.status = SessionStatus::Revoked;
        assert!(!s.is_active_at(now));
        assert!(s.remaining_at(now).is_some());
    }
}
