//! Audit projection: turns authentication events into durable rows.
//!
//! Login attempts append to `sys_login_log`; session lifecycle events keep
//! `sys_online_user` in step with the cached session registry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use kite_core::events::{AuthEvent, DomainEvent, EventPayload};
use kite_core::result::AppResult;
use kite_core::traits::EventSink;
use kite_entity::audit::{LoginOutcome, NewLoginLog, NewOnlineUser};

use crate::repositories::{LoginLogRepository, OnlineUserRepository};

/// Event sink that writes the login log and online-user projections.
#[derive(Debug, Clone)]
pub struct AuditProjection {
    login_logs: LoginLogRepository,
    online_users: OnlineUserRepository,
}

impl AuditProjection {
    /// Create a projection over the two audit repositories.
    pub fn new(login_logs: LoginLogRepository, online_users: OnlineUserRepository) -> Self {
        Self {
            login_logs,
            online_users,
        }
    }
}

/// The login log row an event produces, if any.
fn login_log_entry(event: &AuthEvent, at: DateTime<Utc>) -> Option<NewLoginLog> {
    match event {
        AuthEvent::LoginSucceeded {
            user_id,
            username,
            login_type,
            ip_address,
            login_time,
            ..
        } => Some(NewLoginLog {
            user_id: Some(*user_id),
            username: Some(username.clone()),
            ip_address: ip_address.clone(),
            login_type: *login_type,
            status: LoginOutcome::Success,
            message: Some("Login successful".to_string()),
            login_time: *login_time,
        }),
        AuthEvent::LoginFailed {
            user_id,
            username,
            login_type,
            ip_address,
            reason,
        } => Some(NewLoginLog {
            user_id: *user_id,
            username: username.clone(),
            ip_address: ip_address.clone(),
            login_type: *login_type,
            status: LoginOutcome::Failure,
            message: Some(reason.clone()),
            login_time: at,
        }),
        _ => None,
    }
}

/// How an event changes the `sys_online_user` projection.
#[derive(Debug, Clone, PartialEq, Eq)]
enum OnlineUserChange {
    /// A new session came online.
    Online(NewOnlineUser),
    /// A session moved onto its rotated handle.
    Rotated {
        old_session_id: String,
        new_session_id: String,
        expire_time: DateTime<Utc>,
    },
    /// A session ended by logout or forced logout.
    Offline { session_id: String },
}

fn online_user_change(event: &AuthEvent) -> Option<OnlineUserChange> {
    match event {
        AuthEvent::LoginSucceeded {
            user_id,
            username,
            session_id,
            ip_address,
            login_time,
            expire_time,
            ..
        } => Some(OnlineUserChange::Online(NewOnlineUser {
            session_id: session_id.clone(),
            user_id: *user_id,
            username: username.clone(),
            ip_address: ip_address.clone(),
            login_time: *login_time,
            expire_time: *expire_time,
        })),
        AuthEvent::SessionRotated {
            old_session_id,
            new_session_id,
            expire_time,
            ..
        } => Some(OnlineUserChange::Rotated {
            old_session_id: old_session_id.clone(),
            new_session_id: new_session_id.clone(),
            expire_time: *expire_time,
        }),
        AuthEvent::LoggedOut { session_id, .. } | AuthEvent::ForcedLogout { session_id, .. } => {
            Some(OnlineUserChange::Offline {
                session_id: session_id.clone(),
            })
        }
        AuthEvent::LoginFailed { .. } => None,
    }
}

#[async_trait]
impl EventSink for AuditProjection {
    async fn publish(&self, event: DomainEvent) -> AppResult<()> {
        let EventPayload::Auth(auth) = &event.payload else {
            debug!(event_id = %event.id, "Non-auth event ignored by audit projection");
            return Ok(());
        };

        if let Some(entry) = login_log_entry(auth, event.timestamp) {
            self.login_logs.insert(&entry).await?;
        }

        match online_user_change(auth) {
            Some(OnlineUserChange::Online(entry)) => {
                self.online_users.upsert(&entry).await?;
            }
            Some(OnlineUserChange::Rotated {
                old_session_id,
                new_session_id,
                expire_time,
            }) => {
                let moved = self
                    .online_users
                    .rotate(&old_session_id, &new_session_id, expire_time)
                    .await?;
                debug!(%old_session_id, %new_session_id, moved, "Projected session rotation");
            }
            Some(OnlineUserChange::Offline { session_id }) => {
                let changed = self.online_users.mark_offline(&session_id).await?;
                debug!(%session_id, changed, "Projected session end");
            }
            None => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kite_core::types::{LoginType, UserId};

    #[test]
    fn test_failed_login_is_logged_without_online_row() {
        let now = Utc::now();
        let event = AuthEvent::LoginFailed {
            user_id: None,
            username: Some("ghost".to_string()),
            login_type: LoginType::Password,
            ip_address: Some("10.0.0.1".to_string()),
            reason: "Invalid username or password".to_string(),
        };

        let entry = login_log_entry(&event, now).expect("failure is logged");
        assert_eq!(entry.status, LoginOutcome::Failure);
        assert_eq!(entry.login_time, now);
        assert_eq!(entry.message.as_deref(), Some("Invalid username or password"));
        assert!(online_user_change(&event).is_none());
    }

    #[test]
    fn test_successful_login_projects_both_rows() {
        let now = Utc::now();
        let event = AuthEvent::LoginSucceeded {
            user_id: UserId(4),
            username: "dave".to_string(),
            session_id: "feed".to_string(),
            login_type: LoginType::SmsCode,
            ip_address: None,
            login_time: now,
            expire_time: now + chrono::Duration::days(30),
        };

        let log = login_log_entry(&event, now).expect("success is logged");
        assert_eq!(log.status, LoginOutcome::Success);
        assert_eq!(log.user_id, Some(UserId(4)));

        match online_user_change(&event) {
            Some(OnlineUserChange::Online(online)) => {
                assert_eq!(online.session_id, "feed");
                assert_eq!(online.expire_time, now + chrono::Duration::days(30));
            }
            other => panic!("unexpected change: {other:?}"),
        }
    }

    #[test]
    fn test_logout_marks_session_offline() {
        let event = AuthEvent::LoggedOut {
            user_id: UserId(4),
            username: "dave".to_string(),
            session_id: "feed".to_string(),
            ip_address: None,
        };
        assert!(login_log_entry(&event, Utc::now()).is_none());
        assert_eq!(
            online_user_change(&event),
            Some(OnlineUserChange::Offline {
                session_id: "feed".to_string()
            })
        );
    }

    #[test]
    fn test_forced_logout_marks_the_target_session_offline() {
        let event = AuthEvent::ForcedLogout {
            user_id: UserId(4),
            username: "dave".to_string(),
            session_id: "beef".to_string(),
            terminated_by: UserId(1),
        };
        assert!(login_log_entry(&event, Utc::now()).is_none());
        assert_eq!(
            online_user_change(&event),
            Some(OnlineUserChange::Offline {
                session_id: "beef".to_string()
            })
        );
    }

    #[test]
    fn test_rotation_moves_the_row_to_the_new_handle() {
        let expire_time = Utc::now() + chrono::Duration::days(30);
        let event = AuthEvent::SessionRotated {
            user_id: UserId(4),
            old_session_id: "feed".to_string(),
            new_session_id: "f00d".to_string(),
            expire_time,
        };
        assert!(login_log_entry(&event, Utc::now()).is_none());
        assert_eq!(
            online_user_change(&event),
            Some(OnlineUserChange::Rotated {
                old_session_id: "feed".to_string(),
                new_session_id: "f00d".to_string(),
                expire_time,
            })
        );
    }
}
