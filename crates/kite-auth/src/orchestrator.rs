//! Sign-in, refresh, sign-out and permission queries.
//!
//! The orchestrator owns no state. It sequences the credential validator,
//! token issuer, permission resolver and session store, and reports each
//! outcome to the event sink. Event delivery is best effort.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use kite_core::events::{AuthEvent, DomainEvent};
use kite_core::traits::EventSink;
use kite_core::types::UserId;
use kite_entity::session::Session;
use kite_entity::user::Principal;

use crate::credential::{CredentialValidator, LoginRequest};
use crate::error::{AuthError, AuthResult};
use crate::rbac::{MenuTreeNode, PermissionResolver, RoleSummary, UserPermissions};
use crate::repository::PrincipalRepository;
use crate::session::{SessionStore, session_id_for};
use crate::token::{Claims, TokenIssuer, TokenPair};

/// A sign-in attempt.
#[derive(Debug, Clone)]
pub struct SignInRequest {
    /// Proof of identity.
    pub credentials: LoginRequest,
    /// Issue a long-lived access token.
    pub remember_me: bool,
    /// Caller address, recorded on the session and in the login log.
    pub client_ip: Option<String>,
}

/// Public fields of the signed-in principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrincipalSummary {
    /// Account identifier.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Display name, when set.
    pub real_name: Option<String>,
    /// Contact email, when set.
    pub email: Option<String>,
    /// Phone number used for SMS sign-in, when set.
    pub phone: Option<String>,
}

impl From<&Principal> for PrincipalSummary {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id,
            username: principal.username.clone(),
            real_name: principal.real_name.clone(),
            email: principal.email.clone(),
            phone: principal.phone.clone(),
        }
    }
}

/// Everything a client needs after a successful sign-in.
#[derive(Debug, Clone, Serialize)]
pub struct SignInResult {
    /// Access and refresh tokens for the new session.
    pub tokens: TokenPair,
    /// Externally visible session handle.
    pub session_id: String,
    /// The signed-in account.
    pub user: PrincipalSummary,
    /// Enabled roles granted to the account.
    pub roles: Vec<RoleSummary>,
    /// Navigation tree the account may see.
    pub menu_tree: Vec<MenuTreeNode>,
    /// Distinct permission strings the account holds.
    pub permissions: BTreeSet<String>,
}

/// Entry point for every authentication flow.
#[derive(Debug, Clone)]
pub struct AuthOrchestrator {
    validator: Arc<CredentialValidator>,
    issuer: Arc<TokenIssuer>,
    sessions: Arc<SessionStore>,
    resolver: Arc<PermissionResolver>,
    principals: Arc<dyn PrincipalRepository>,
    events: Arc<dyn EventSink>,
}

impl AuthOrchestrator {
    /// Wires the orchestrator from its collaborators.
    pub fn new(
        validator: Arc<CredentialValidator>,
        issuer: Arc<TokenIssuer>,
        sessions: Arc<SessionStore>,
        resolver: Arc<PermissionResolver>,
        principals: Arc<dyn PrincipalRepository>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            validator,
            issuer,
            sessions,
            resolver,
            principals,
            events,
        }
    }

    /// Authenticate and open a new session.
    ///
    /// The session write is the last write awaited, so dropping this future
    /// never leaves a session without the rest of the sign-in behind it.
    pub async fn sign_in(&self, request: SignInRequest) -> AuthResult<SignInResult> {
        let login_type = request.credentials.login_type();

        match self.authenticate(&request).await {
            Ok(result) => {
                info!(
                    user_id = %result.user.id,
                    login_type = %login_type,
                    session_id = %result.session_id,
                    "Login successful"
                );
                Ok(result)
            }
            Err((user_id, err)) => {
                warn!(
                    user_id = ?user_id,
                    login_type = %login_type,
                    reason = err.reason(),
                    "Login rejected"
                );
                self.publish(
                    user_id,
                    AuthEvent::LoginFailed {
                        user_id,
                        username: request.credentials.subject_hint().map(String::from),
                        login_type,
                        ip_address: request.client_ip.clone(),
                        reason: err.to_string(),
                    },
                )
                .await;
                Err(err)
            }
        }
    }

    async fn authenticate(
        &self,
        request: &SignInRequest,
    ) -> Result<SignInResult, (Option<UserId>, AuthError)> {
        let principal = self
            .validator
            .validate(&request.credentials)
            .await
            .map_err(|e| (None, e))?;
        let user_id = principal.id;
        let known = |e: AuthError| (Some(user_id), e);

        if !principal.can_login() {
            return Err(known(AuthError::AccountDisabled));
        }

        let permissions = self.resolver.resolve(user_id).await.map_err(known)?;
        let issued = self
            .issuer
            .issue(&principal, request.remember_me, request.client_ip.clone())
            .map_err(known)?;

        self.principals
            .record_login(user_id, request.client_ip.as_deref(), issued.session.issued_at)
            .await
            .map_err(|e| known(e.into()))?;
        self.sessions.put(&issued.session).await.map_err(known)?;

        self.publish(
            Some(user_id),
            AuthEvent::LoginSucceeded {
                user_id,
                username: principal.username.clone(),
                session_id: issued.session.session_id.clone(),
                login_type: request.credentials.login_type(),
                ip_address: request.client_ip.clone(),
                login_time: issued.session.issued_at,
                expire_time: issued.session.expires_at,
            },
        )
        .await;

        Ok(SignInResult {
            tokens: issued.tokens,
            session_id: issued.session.session_id,
            user: PrincipalSummary::from(&principal),
            roles: permissions.roles,
            menu_tree: permissions.menu_tree,
            permissions: permissions.permissions,
        })
    }

    /// Exchange a refresh token for a new pair. The old token dies here.
    ///
    /// Once the old session is taken it stays gone, even if a later step
    /// fails; the client must sign in again.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let Some(user_id) = self.sessions.owner_of(refresh_token).await? else {
            return Err(AuthError::InvalidRefreshToken);
        };
        let old_session_id = session_id_for(refresh_token);

        let Some(consumed) = self.sessions.take(user_id, &old_session_id).await? else {
            return Err(AuthError::InvalidRefreshToken);
        };
        if !consumed.is_active_at(Utc::now()) {
            return Err(AuthError::InvalidRefreshToken);
        }

        let principal = self
            .principals
            .find_by_id(user_id)
            .await?
            .filter(Principal::can_login)
            .ok_or(AuthError::AccountDisabled)?;

        let issued = self.issuer.rotate(&consumed, &principal)?;
        self.sessions.put(&issued.session).await?;

        info!(user_id = %user_id, session_id = %issued.session.session_id, "Session rotated");
        self.publish(
            Some(user_id),
            AuthEvent::SessionRotated {
                user_id,
                old_session_id,
                new_session_id: issued.session.session_id.clone(),
                expire_time: issued.session.expires_at,
            },
        )
        .await;

        Ok(issued.tokens)
    }

    /// End one of the caller's sessions. Signing out twice is not an error.
    pub async fn sign_out(&self, user_id: UserId, refresh_token: &str) -> AuthResult<()> {
        if let Some(session) = self.sessions.remove(user_id, refresh_token).await? {
            info!(user_id = %user_id, session_id = %session.session_id, "Logged out");
            self.publish_logout(session).await;
        }
        Ok(())
    }

    /// End every session of the caller. Returns how many ended.
    pub async fn sign_out_all(&self, user_id: UserId) -> AuthResult<u32> {
        let removed = self.sessions.drain(user_id).await?;
        let count = removed.len() as u32;
        for session in removed {
            self.publish_logout(session).await;
        }
        Ok(count)
    }

    /// End somebody's session by its handle.
    pub async fn force_logout(&self, actor_id: UserId, session_id: &str) -> AuthResult<()> {
        let session = self
            .sessions
            .force_logout(session_id)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("Session {session_id}")))?;

        info!(
            actor_id = %actor_id,
            user_id = %session.user_id,
            session_id,
            "Session forcibly ended"
        );
        self.publish(
            Some(actor_id),
            AuthEvent::ForcedLogout {
                user_id: session.user_id,
                username: session.username,
                session_id: session.session_id,
                terminated_by: actor_id,
            },
        )
        .await;
        Ok(())
    }

    /// Live sessions of a user, newest first.
    pub async fn list_sessions(&self, user_id: UserId) -> AuthResult<Vec<Session>> {
        self.sessions.list(user_id).await
    }

    /// Current roles, menu tree and permissions of a user.
    pub async fn get_user_permissions(&self, user_id: UserId) -> AuthResult<UserPermissions> {
        self.resolver.resolve(user_id).await
    }

    /// Whether a user currently holds a permission string.
    pub async fn check_permission(&self, user_id: UserId, permission: &str) -> AuthResult<bool> {
        self.resolver.check_permission(user_id, permission).await
    }

    /// Send a one-time sign-in code to a phone.
    pub async fn send_sms_code(&self, phone: &str) -> AuthResult<()> {
        self.validator.send_code(phone).await
    }

    /// Verify an access token without touching storage.
    pub fn verify_access_token(&self, token: &str) -> AuthResult<Claims> {
        self.issuer.verify(token)
    }

    async fn publish_logout(&self, session: Session) {
        self.publish(
            Some(session.user_id),
            AuthEvent::LoggedOut {
                user_id: session.user_id,
                username: session.username,
                session_id: session.session_id,
                ip_address: session.client_ip,
            },
        )
        .await;
    }

    async fn publish(&self, actor_id: Option<UserId>, event: AuthEvent) {
        if let Err(e) = self.events.publish(DomainEvent::auth(actor_id, event)).await {
            warn!(error = %e, "Failed to publish auth event");
        }
    }
}
