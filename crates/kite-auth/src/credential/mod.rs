//! Credential validation for every supported login channel.

pub mod delegated;
pub mod sms;
pub mod validator;

use serde::Deserialize;

use kite_core::types::LoginType;

pub use delegated::{ExternalIdentity, IdentityProvider};
pub use sms::{LogSmsSender, SmsSender};
pub use validator::CredentialValidator;

/// Proof of identity submitted by a client.
#[derive(Clone, Deserialize)]
#[serde(tag = "login_type", rename_all = "snake_case")]
pub enum LoginRequest {
    /// Username and plaintext password.
    Password {
        /// Login name.
        username: String,
        /// Plaintext password.
        password: String,
    },
    /// Phone number and the one-time code sent to it.
    SmsCode {
        /// Phone number the code was sent to.
        phone: String,
        /// The six-digit code.
        code: String,
    },
    /// Authorization code issued by a third-party identity provider.
    Delegated {
        /// Which provider issued the code.
        provider: LoginType,
        /// The provider's authorization code.
        code: String,
    },
}

impl LoginRequest {
    /// The channel this request arrives through.
    pub fn login_type(&self) -> LoginType {
        match self {
            Self::Password { .. } => LoginType::Password,
            Self::SmsCode { .. } => LoginType::SmsCode,
            Self::Delegated { provider, .. } => *provider,
        }
    }

    /// The identifier the caller claimed, for login logs. Never a secret.
    pub fn subject_hint(&self) -> Option<&str> {
        match self {
            Self::Password { username, .. } => Some(username),
            Self::SmsCode { phone, .. } => Some(phone),
            Self::Delegated { .. } => None,
        }
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::SmsCode { phone, .. } => f
                .debug_struct("SmsCode")
                .field("phone", phone)
                .finish_non_exhaustive(),
            Self::Delegated { provider, .. } => f
                .debug_struct("Delegated")
                .field("provider", provider)
                .finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_secrets() {
        let request = LoginRequest::Password {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{request:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));

        let sms = LoginRequest::SmsCode {
            phone: "13800000000".to_string(),
            code: "482913".to_string(),
        };
        assert!(!format!("{sms:?}").contains("482913"));
    }

    #[test]
    fn test_login_type_and_hint() {
        let delegated = LoginRequest::Delegated {
            provider: LoginType::WeChat,
            code: "abc".to_string(),
        };
        assert_eq!(delegated.login_type(), LoginType::WeChat);
        assert_eq!(delegated.subject_hint(), None);

        let request: LoginRequest = serde_json::from_str(
            r#"{"login_type":"sms_code","phone":"13800000000","code":"123456"}"#,
        )
        .unwrap();
        assert_eq!(request.login_type(), LoginType::SmsCode);
        assert_eq!(request.subject_hint(), Some("13800000000"));
    }
}
