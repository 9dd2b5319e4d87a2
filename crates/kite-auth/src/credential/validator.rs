//! Turns a [`LoginRequest`] into the principal it proves.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use kite_cache::keys;
use kite_cache::provider::CacheManager;
use kite_core::config::SmsConfig;
use kite_core::traits::CacheProvider;
use kite_core::types::LoginType;
use kite_entity::user::Principal;

use super::delegated::IdentityProvider;
use super::sms::{SmsSender, generate_code, mask_phone};
use super::LoginRequest;
use crate::error::{AuthError, AuthResult};
use crate::password::PasswordHasher;
use crate::repository::PrincipalRepository;

/// Validates passwords, one-time SMS codes and delegated authorization codes.
///
/// The only state it changes is the single-use SMS code.
#[derive(Debug, Clone)]
pub struct CredentialValidator {
    principals: Arc<dyn PrincipalRepository>,
    cache: Arc<CacheManager>,
    hasher: PasswordHasher,
    sms_sender: Arc<dyn SmsSender>,
    identity_providers: HashMap<LoginType, Arc<dyn IdentityProvider>>,
    code_ttl: Duration,
    resend_interval: Duration,
}

impl CredentialValidator {
    /// Creates a validator with no identity providers registered.
    pub fn new(
        principals: Arc<dyn PrincipalRepository>,
        cache: Arc<CacheManager>,
        sms_sender: Arc<dyn SmsSender>,
        config: &SmsConfig,
    ) -> Self {
        Self {
            principals,
            cache,
            hasher: PasswordHasher::new(),
            sms_sender,
            identity_providers: HashMap::new(),
            code_ttl: Duration::from_secs(config.code_ttl_seconds),
            resend_interval: Duration::from_secs(config.resend_interval_seconds),
        }
    }

    /// Register the provider for its login type, replacing any earlier one.
    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.identity_providers.insert(provider.provider(), provider);
        self
    }

    /// Resolve the principal a request proves. Status is not checked here.
    pub async fn validate(&self, request: &LoginRequest) -> AuthResult<Principal> {
        match request {
            LoginRequest::Password { username, password } => {
                self.validate_password(username, password).await
            }
            LoginRequest::SmsCode { phone, code } => {
                self.verify_code(phone, code).await?;
                self.principals
                    .find_by_phone(phone)
                    .await?
                    .ok_or(AuthError::InvalidCredentials)
            }
            LoginRequest::Delegated { provider, code } => {
                self.validate_delegated(*provider, code).await
            }
        }
    }

    /// Issue a one-time code to a phone, subject to the resend interval.
    pub async fn send_code(&self, phone: &str) -> AuthResult<()> {
        let resend_key = keys::sms_resend(phone);
        if !self.cache.set_nx(&resend_key, "1", self.resend_interval).await? {
            return Err(AuthError::ResendTooSoon {
                retry_after_secs: self.resend_interval.as_secs(),
            });
        }

        let code_key = keys::sms_code(phone);
        let code = generate_code();
        self.cache
            .set(&code_key, &code_digest(&code), self.code_ttl)
            .await?;

        if let Err(e) = self.sms_sender.send(phone, &code).await {
            warn!(phone = %mask_phone(phone), error = %e, "SMS delivery failed");
            self.cache.delete(&code_key).await?;
            self.cache.delete(&resend_key).await?;
            return Err(e.into());
        }

        info!(phone = %mask_phone(phone), "SMS code sent");
        Ok(())
    }

    /// Consume the stored code for a phone if it equals `code`.
    ///
    /// A wrong guess leaves the stored code in place until it expires. Of
    /// several concurrent correct submissions, exactly one succeeds.
    pub async fn verify_code(&self, phone: &str, code: &str) -> AuthResult<()> {
        let consumed = self
            .cache
            .take_if_eq(&keys::sms_code(phone), &code_digest(code))
            .await?;
        if consumed {
            Ok(())
        } else {
            debug!(phone = %mask_phone(phone), "SMS code rejected");
            Err(AuthError::CodeExpiredOrInvalid)
        }
    }

    async fn validate_password(&self, username: &str, password: &str) -> AuthResult<Principal> {
        let Some(principal) = self.principals.find_by_username(username).await? else {
            self.hasher.verify_dummy(password);
            return Err(AuthError::InvalidCredentials);
        };

        match self.hasher.verify_password(password, &principal.password_hash) {
            Ok(true) => Ok(principal),
            Ok(false) => Err(AuthError::InvalidCredentials),
            Err(e) => {
                warn!(user_id = %principal.id, error = %e, "Stored password hash is unusable");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    async fn validate_delegated(&self, provider: LoginType, code: &str) -> AuthResult<Principal> {
        let source = self
            .identity_providers
            .get(&provider)
            .ok_or(AuthError::UnsupportedLoginType)?;

        let identity = source.exchange(code).await?;
        if identity.provider != provider {
            return Err(AuthError::InternalConsistency(format!(
                "{provider} provider returned a {} identity",
                identity.provider
            )));
        }

        self.principals
            .find_by_external_id(provider, &identity.external_id)
            .await?
            .ok_or(AuthError::AccountNotLinked)
    }
}

/// Stored form of a one-time code. The cache never holds the code itself,
/// so comparing stored values leaks nothing about the code.
fn code_digest(code: &str) -> String {
    Sha256::digest(code.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
