//! Session registry operations on top of the cache.
//!
//! Three keys per session: the JSON record under `session:{user}:{id}`, an
//! owner pointer under `session:owner:{id}` so a bare refresh token can be
//! resolved without scanning, and one field in the per-user index hash.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use kite_cache::keys;
use kite_cache::provider::CacheManager;
use kite_core::traits::CacheProvider;
use kite_core::types::UserId;
use kite_entity::session::Session;

use super::session_id_for;
use crate::error::{AuthError, AuthResult};

/// Registry of live sessions keyed by user and session handle.
#[derive(Debug, Clone)]
pub struct SessionStore {
    cache: Arc<CacheManager>,
}

impl SessionStore {
    /// Creates a new session store.
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self { cache }
    }

    /// Persist a session until its expiry.
    pub async fn put(&self, session: &Session) -> AuthResult<()> {
        let ttl = session.remaining_at(Utc::now()).ok_or_else(|| {
            AuthError::InternalConsistency(format!(
                "Session {} is already expired",
                session.session_id
            ))
        })?;
        let index_key = keys::session_index(session.user_id);
        self.prune_index(session.user_id).await?;

        self.cache
            .set_json(&keys::session(session.user_id, &session.session_id), session, ttl)
            .await?;
        self.cache
            .set(
                &keys::session_owner(&session.session_id),
                &session.user_id.to_string(),
                ttl,
            )
            .await?;
        self.cache
            .hash_set(
                &index_key,
                &session.session_id,
                &session.expires_at.timestamp().to_string(),
            )
            .await?;
        // Sessions share one lifetime, so the newest one outlives the rest.
        self.cache.expire(&index_key, ttl).await?;

        debug!(user_id = %session.user_id, session_id = %session.session_id, "Session stored");
        Ok(())
    }

    /// Look up the live session behind a refresh token.
    pub async fn get(&self, user_id: UserId, refresh_token: &str) -> AuthResult<Option<Session>> {
        let session_id = session_id_for(refresh_token);
        let session: Option<Session> = self
            .cache
            .get_json(&keys::session(user_id, &session_id))
            .await?;
        let now = Utc::now();
        Ok(session.filter(|s| s.user_id == user_id && s.is_active_at(now)))
    }

    /// Resolve the owner of a refresh token.
    pub async fn owner_of(&self, refresh_token: &str) -> AuthResult<Option<UserId>> {
        self.owner_of_session(&session_id_for(refresh_token)).await
    }

    /// Resolve the owner of a session handle.
    pub async fn owner_of_session(&self, session_id: &str) -> AuthResult<Option<UserId>> {
        match self.cache.get(&keys::session_owner(session_id)).await? {
            Some(raw) => raw.parse::<UserId>().map(Some).map_err(|_| {
                AuthError::InternalConsistency(format!(
                    "Session owner for {session_id} is not a user id: '{raw}'"
                ))
            }),
            None => Ok(None),
        }
    }

    /// Atomically remove a session and return it.
    ///
    /// When several callers race for the same session exactly one receives
    /// it. The returned record may be expired; callers check.
    pub async fn take(&self, user_id: UserId, session_id: &str) -> AuthResult<Option<Session>> {
        let taken: Option<Session> = self
            .cache
            .take_json(&keys::session(user_id, session_id))
            .await?;
        if taken.is_some() {
            self.clear_pointers(user_id, session_id).await?;
        }
        Ok(taken)
    }

    /// End the session behind a refresh token. Idempotent.
    pub async fn revoke(&self, user_id: UserId, refresh_token: &str) -> AuthResult<bool> {
        self.remove(user_id, refresh_token)
            .await
            .map(|removed| removed.is_some())
    }

    /// End the session behind a refresh token and return what was removed.
    pub async fn remove(&self, user_id: UserId, refresh_token: &str) -> AuthResult<Option<Session>> {
        self.revoke_session(user_id, &session_id_for(refresh_token))
            .await
    }

    /// End every session of a user. Returns how many were live.
    pub async fn revoke_all(&self, user_id: UserId) -> AuthResult<u32> {
        Ok(self.drain(user_id).await?.len() as u32)
    }

    /// End every session of a user and return the removed records.
    pub async fn drain(&self, user_id: UserId) -> AuthResult<Vec<Session>> {
        let index = self.cache.hash_get_all(&keys::session_index(user_id)).await?;
        let mut removed = Vec::with_capacity(index.len());

        for session_id in index.keys() {
            if let Some(session) = self.revoke_session(user_id, session_id).await? {
                removed.push(session);
            }
        }

        info!(user_id = %user_id, count = removed.len(), "Revoked all sessions");
        Ok(removed)
    }

    /// End a session by handle alone, as an administrator would.
    pub async fn force_logout(&self, session_id: &str) -> AuthResult<Option<Session>> {
        let Some(user_id) = self.owner_of_session(session_id).await? else {
            return Ok(None);
        };
        self.revoke_session(user_id, session_id).await
    }

    /// Live sessions of a user, newest first.
    pub async fn list(&self, user_id: UserId) -> AuthResult<Vec<Session>> {
        let index = self.cache.hash_get_all(&keys::session_index(user_id)).await?;
        let now = Utc::now();
        let mut sessions = Vec::with_capacity(index.len());

        for session_id in index.keys() {
            let session: Option<Session> = self
                .cache
                .get_json(&keys::session(user_id, session_id))
                .await?;
            if let Some(session) = session.filter(|s| s.is_active_at(now)) {
                sessions.push(session);
            }
        }

        sessions.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(sessions)
    }

    /// Drop index fields whose session has expired or vanished.
    pub async fn prune_index(&self, user_id: UserId) -> AuthResult<u32> {
        let index_key = keys::session_index(user_id);
        let index = self.cache.hash_get_all(&index_key).await?;
        let now = Utc::now();
        let mut pruned = 0u32;

        for (session_id, expires_at) in &index {
            let expired = expires_at
                .parse::<i64>()
                .ok()
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .is_none_or(|at| at <= now);
            let missing = !self
                .cache
                .exists(&keys::session(user_id, session_id))
                .await?;

            if (expired || missing) && self.cache.hash_delete(&index_key, session_id).await? {
                pruned += 1;
            }
        }

        if pruned > 0 {
            debug!(user_id = %user_id, pruned, "Pruned session index");
        }
        Ok(pruned)
    }

    async fn revoke_session(
        &self,
        user_id: UserId,
        session_id: &str,
    ) -> AuthResult<Option<Session>> {
        let taken: Option<Session> = self
            .cache
            .take_json(&keys::session(user_id, session_id))
            .await?;
        // The owner pointer may belong to somebody else's live session.
        let owned =
            taken.is_some() || self.owner_of_session(session_id).await? == Some(user_id);
        if owned {
            self.clear_pointers(user_id, session_id).await?;
        } else {
            self.cache
                .hash_delete(&keys::session_index(user_id), session_id)
                .await?;
        }
        Ok(taken)
    }

    async fn clear_pointers(&self, user_id: UserId, session_id: &str) -> AuthResult<()> {
        self.cache.delete(&keys::session_owner(session_id)).await?;
        self.cache
            .hash_delete(&keys::session_index(user_id), session_id)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kite_entity::session::SessionStatus;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(CacheManager::in_memory()))
    }

    fn session(user_id: i64, refresh_token: &str) -> Session {
        let now = Utc::now();
        Session {
            session_id: session_id_for(refresh_token),
            user_id: UserId(user_id),
            username: format!("user{user_id}"),
            issued_at: now,
            last_access_time: now,
            expires_at: now + chrono::Duration::days(30),
            client_ip: None,
            remember_me: false,
            status: SessionStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_put_get_revoke() {
        let store = store();
        store.put(&session(1, "rt-1")).await.unwrap();

        assert!(store.get(UserId(1), "rt-1").await.unwrap().is_some());
        assert!(store.get(UserId(2), "rt-1").await.unwrap().is_none());
        assert_eq!(store.owner_of("rt-1").await.unwrap(), Some(UserId(1)));

        assert!(store.revoke(UserId(1), "rt-1").await.unwrap());
        assert!(!store.revoke(UserId(1), "rt-1").await.unwrap());
        assert!(store.get(UserId(1), "rt-1").await.unwrap().is_none());
        assert_eq!(store.owner_of("rt-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_revoked_status_is_not_returned() {
        let store = store();
        let mut s = session(1, "rt-r");
        s.status = SessionStatus::Revoked;
        store.put(&s).await.unwrap();
        assert!(store.get(UserId(1), "rt-r").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_cannot_be_stored() {
        let store = store();
        let mut s = session(1, "rt-old");
        s.expires_at = Utc::now() - chrono::Duration::seconds(1);
        assert!(matches!(
            store.put(&s).await,
            Err(AuthError::InternalConsistency(_))
        ));
    }

    #[tokio::test]
    async fn test_revoke_all_leaves_other_users() {
        let store = store();
        store.put(&session(1, "a")).await.unwrap();
        store.put(&session(1, "b")).await.unwrap();
        store.put(&session(2, "c")).await.unwrap();

        assert_eq!(store.list(UserId(1)).await.unwrap().len(), 2);
        assert_eq!(store.revoke_all(UserId(1)).await.unwrap(), 2);
        assert!(store.list(UserId(1)).await.unwrap().is_empty());
        assert!(store.get(UserId(2), "c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_revoke_by_wrong_user_keeps_session() {
        let store = store();
        store.put(&session(1, "rt-mine")).await.unwrap();

        assert!(!store.revoke(UserId(2), "rt-mine").await.unwrap());
        assert_eq!(store.owner_of("rt-mine").await.unwrap(), Some(UserId(1)));
        assert!(store.get(UserId(1), "rt-mine").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_force_logout_by_handle() {
        let store = store();
        let s = session(3, "rt-3");
        store.put(&s).await.unwrap();

        let removed = store.force_logout(&s.session_id).await.unwrap();
        assert_eq!(removed.map(|r| r.user_id), Some(UserId(3)));
        assert!(store.force_logout(&s.session_id).await.unwrap().is_none());
        assert!(store.get(UserId(3), "rt-3").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_take_has_single_winner() {
        let store = store();
        let s = session(4, "rt-4");
        store.put(&s).await.unwrap();

        let attempts = (0..8).map(|_| {
            let store = store.clone();
            let id = s.session_id.clone();
            tokio::spawn(async move { store.take(UserId(4), &id).await.unwrap() })
        });
        let winners = futures::future::join_all(attempts)
            .await
            .into_iter()
            .filter(|r| matches!(r, Ok(Some(_))))
            .count();
        assert_eq!(winners, 1);
        assert_eq!(store.owner_of("rt-4").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_prune_index_drops_vanished_sessions() {
        let cache = Arc::new(CacheManager::in_memory());
        let store = SessionStore::new(cache.clone());
        let live = session(5, "live");
        let gone = session(5, "gone");
        store.put(&live).await.unwrap();
        store.put(&gone).await.unwrap();

        cache
            .delete(&keys::session(UserId(5), &gone.session_id))
            .await
            .unwrap();

        assert_eq!(store.prune_index(UserId(5)).await.unwrap(), 1);
        let index = cache.hash_get_all(&keys::session_index(UserId(5))).await.unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.contains_key(&live.session_id));
    }
}
