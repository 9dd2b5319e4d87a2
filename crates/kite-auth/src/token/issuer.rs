//! Token issuance, rotation, and access token verification.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kite_core::config::AuthConfig;
use kite_core::error::AppError;
use kite_core::result::AppResult;
use kite_entity::session::{Session, SessionStatus};
use kite_entity::user::Principal;

use super::claims::Claims;
use crate::error::{AuthError, AuthResult};
use crate::session::session_id_for;

/// Number of random bytes in a refresh token.
const REFRESH_TOKEN_BYTES: usize = 32;

/// Tokens handed to the client after sign-in or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Signed access token.
    pub access_token: String,
    /// Opaque single-use refresh token.
    pub refresh_token: String,
    /// Access token expiration.
    pub expires_at: DateTime<Utc>,
}

/// A token pair together with the session record that backs it.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// Tokens for the client.
    pub tokens: TokenPair,
    /// Session to persist in the session store.
    pub session: Session,
}

/// Creates signed access tokens and opaque refresh tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    access_lifetime: Duration,
    session_lifetime: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_lifetime", &self.access_lifetime)
            .field("session_lifetime", &self.session_lifetime)
            .finish()
    }
}

impl TokenIssuer {
    /// Creates an issuer from auth configuration.
    ///
    /// Fails with a configuration error when the secret is too short or a
    /// lifetime is out of range.
    pub fn new(config: &AuthConfig) -> AppResult<Self> {
        config.validate()?;
        let access_lifetime = lifetime(
            config.access_token_minutes,
            Duration::try_minutes,
            "access_token_minutes",
        )?;
        let session_lifetime =
            lifetime(config.refresh_token_days, Duration::try_days, "refresh_token_days")?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = config.leeway_seconds;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_lifetime,
            session_lifetime,
        })
    }

    /// Issue a fresh session for a principal that just proved its identity.
    pub fn issue(
        &self,
        principal: &Principal,
        remember_me: bool,
        client_ip: Option<String>,
    ) -> AuthResult<IssuedSession> {
        let now = Utc::now();
        self.mint(principal, now, now, remember_me, client_ip)
    }

    /// Replace a session that the store has just atomically removed.
    ///
    /// The new session keeps the original sign-in time, client address and
    /// remember-me choice; its expiry slides forward from now.
    pub fn rotate(&self, consumed: &Session, principal: &Principal) -> AuthResult<IssuedSession> {
        if consumed.user_id != principal.id {
            return Err(AuthError::InvalidRefreshToken);
        }
        self.mint(
            principal,
            consumed.issued_at,
            Utc::now(),
            consumed.remember_me,
            consumed.client_ip.clone(),
        )
    }

    /// Verify an access token's signature, lifetime, issuer and audience.
    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let reason = match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => "token has expired",
                    jsonwebtoken::errors::ErrorKind::ImmatureSignature => "token is not yet valid",
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => "invalid signature",
                    jsonwebtoken::errors::ErrorKind::InvalidIssuer => "invalid issuer",
                    jsonwebtoken::errors::ErrorKind::InvalidAudience => "invalid audience",
                    jsonwebtoken::errors::ErrorKind::InvalidToken => "invalid token format",
                    _ => "validation failed",
                };
                AuthError::InvalidAccessToken(reason.to_string())
            })
    }

    fn mint(
        &self,
        principal: &Principal,
        issued_at: DateTime<Utc>,
        now: DateTime<Utc>,
        remember_me: bool,
        client_ip: Option<String>,
    ) -> AuthResult<IssuedSession> {
        let refresh_token = generate_refresh_token();
        let session_id = session_id_for(&refresh_token);

        let access_lifetime = if remember_me {
            self.session_lifetime
        } else {
            self.access_lifetime
        };
        let access_expires_at = now + access_lifetime;

        let claims = Claims {
            sub: principal.id.to_string(),
            username: principal.username.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: access_expires_at.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4().to_string(),
            sid: session_id.clone(),
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| {
                AuthError::InternalConsistency(format!("Failed to encode access token: {e}"))
            })?;

        let session = Session {
            session_id,
            user_id: principal.id,
            username: principal.username.clone(),
            issued_at,
            last_access_time: now,
            expires_at: now + self.session_lifetime,
            client_ip,
            remember_me,
            status: SessionStatus::Active,
        };

        Ok(IssuedSession {
            tokens: TokenPair {
                access_token,
                refresh_token,
                expires_at: access_expires_at,
            },
            session,
        })
    }
}

/// Convert a configured lifetime without wrapping or overflowing.
fn lifetime(value: u64, unit: fn(i64) -> Option<Duration>, name: &str) -> AppResult<Duration> {
    i64::try_from(value)
        .ok()
        .and_then(unit)
        .ok_or_else(|| AppError::configuration(format!("auth.{name} is out of range")))
}

/// 256 random bits from the OS, base64url without padding.
fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
