//! Authentication configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Minimum accepted length of the HMAC signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Longest accepted access token lifetime: one year.
pub const MAX_ACCESS_TOKEN_MINUTES: u64 = 525_600;

/// Longest accepted session lifetime: ten years.
pub const MAX_REFRESH_TOKEN_DAYS: u64 = 3650;

/// Token issuance configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT signing (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// `iss` claim written into and required on access tokens.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// `aud` claim written into and required on access tokens.
    #[serde(default = "default_audience")]
    pub audience: String,
    /// Access token lifetime in minutes.
    #[serde(default = "default_access_minutes")]
    pub access_token_minutes: u64,
    /// Refresh token (session) lifetime in days. Also the access token
    /// lifetime when the caller asked to be remembered.
    #[serde(default = "default_refresh_days")]
    pub refresh_token_days: u64,
    /// Clock skew tolerance when verifying access tokens, in seconds.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
}

impl AuthConfig {
    /// Reject configurations that cannot produce secure tokens.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(AppError::configuration(format!(
                "auth.jwt_secret must be at least {MIN_SECRET_LEN} bytes long"
            )));
        }
        if !(1..=MAX_ACCESS_TOKEN_MINUTES).contains(&self.access_token_minutes) {
            return Err(AppError::configuration(format!(
                "auth.access_token_minutes must be between 1 and {MAX_ACCESS_TOKEN_MINUTES}"
            )));
        }
        if !(1..=MAX_REFRESH_TOKEN_DAYS).contains(&self.refresh_token_days) {
            return Err(AppError::configuration(format!(
                "auth.refresh_token_days must be between 1 and {MAX_REFRESH_TOKEN_DAYS}"
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_token_minutes", &self.access_token_minutes)
            .field("refresh_token_days", &self.refresh_token_days)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish_non_exhaustive()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            issuer: default_issuer(),
            audience: default_audience(),
            access_token_minutes: default_access_minutes(),
            refresh_token_days: default_refresh_days(),
            leeway_seconds: default_leeway(),
        }
    }
}

/// One-time SMS code configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    /// How long an issued code stays valid, in seconds.
    #[serde(default = "default_code_ttl")]
    pub code_ttl_seconds: u64,
    /// Minimum delay between two codes sent to the same phone, in seconds.
    #[serde(default = "default_resend_interval")]
    pub resend_interval_seconds: u64,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            code_ttl_seconds: default_code_ttl(),
            resend_interval_seconds: default_resend_interval(),
        }
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_issuer() -> String {
    "KiteServer".to_string()
}

fn default_audience() -> String {
    "KiteClient".to_string()
}

fn default_access_minutes() -> u64 {
    480
}

fn default_refresh_days() -> u64 {
    30
}

fn default_leeway() -> u64 {
    5
}

fn default_code_ttl() -> u64 {
    300
}

fn default_resend_interval() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_secret_is_rejected() {
        let config = AuthConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_long_secret_is_accepted() {
        let config = AuthConfig {
            jwt_secret: "k".repeat(MIN_SECRET_LEN),
            ..AuthConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lifetimes_are_bounded() {
        let valid = AuthConfig {
            jwt_secret: "k".repeat(MIN_SECRET_LEN),
            ..AuthConfig::default()
        };

        for (minutes, days) in [(0, 30), (480, 0), (MAX_ACCESS_TOKEN_MINUTES + 1, 30)] {
            let config = AuthConfig {
                access_token_minutes: minutes,
                refresh_token_days: days,
                ..valid.clone()
            };
            assert!(config.validate().is_err(), "{minutes} min / {days} d accepted");
        }

        for days in [MAX_REFRESH_TOKEN_DAYS + 1, 200_000_000_000, u64::MAX] {
            let config = AuthConfig {
                refresh_token_days: days,
                ..valid.clone()
            };
            let err = config.validate().unwrap_err();
            assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
        }

        let edge = AuthConfig {
            access_token_minutes: MAX_ACCESS_TOKEN_MINUTES,
            refresh_token_days: MAX_REFRESH_TOKEN_DAYS,
            ..valid
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = AuthConfig {
            jwt_secret: "super-secret-value-that-must-not-leak".to_string(),
            ..AuthConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("KiteServer"));
    }
}
