//! Cache key builders for all Kite cache entries.
//!
//! Centralising key construction prevents typos and makes it easy
//! to find every key the application uses. Backend-level prefixes
//! (such as the Redis `key_prefix`) are applied by the provider.

use kite_core::types::UserId;

// ── Session keys ───────────────────────────────────────────

/// Cache key for one session record.
pub fn session(user_id: UserId, session_id: &str) -> String {
    format!("session:{user_id}:{session_id}")
}

/// Cache key mapping a session handle back to its owner.
pub fn session_owner(session_id: &str) -> String {
    format!("session:owner:{session_id}")
}

/// Cache key of the per-user hash of live session handles.
pub fn session_index(user_id: UserId) -> String {
    format!("session:index:{user_id}")
}

// ── One-time code keys ─────────────────────────────────────

/// Cache key holding the pending SMS code for a phone number.
pub fn sms_code(phone: &str) -> String {
    format!("sms:code:{phone}")
}

/// Cache key marking that a code was recently sent to a phone number.
pub fn sms_resend(phone: &str) -> String {
    format!("sms:resend:{phone}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_keys() {
        assert_eq!(session(UserId(7), "abc"), "session:7:abc");
        assert_eq!(session_owner("abc"), "session:owner:abc");
        assert_eq!(session_index(UserId(7)), "session:index:7");
    }

    #[test]
    fn test_sms_keys() {
        assert_eq!(sms_code("13800000000"), "sms:code:13800000000");
        assert_eq!(sms_resend("13800000000"), "sms:resend:13800000000");
    }
}
