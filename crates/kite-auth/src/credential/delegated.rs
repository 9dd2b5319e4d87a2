//! Third-party identity providers (DingTalk, WeChat).
//!
//! No vendor client ships with Kite. Deployments register an
//! [`IdentityProvider`] per login type on the credential validator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use kite_core::result::AppResult;
use kite_core::types::LoginType;

/// The account a provider vouched for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    /// Provider that issued the identity.
    pub provider: LoginType,
    /// The provider's stable account id.
    pub external_id: String,
}

/// Exchanges an authorization code for the provider's account id.
#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    /// The login type this provider serves.
    fn provider(&self) -> LoginType;

    /// Redeem an authorization code.
    ///
    /// A rejected code should be reported as an `Authentication` error; any
    /// other kind is treated as the provider being unavailable.
    async fn exchange(&self, code: &str) -> AppResult<ExternalIdentity>;
}
