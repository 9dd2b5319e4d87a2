//! Login channel enumeration shared by events and log rows.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The credential channel used for a sign-in attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginType {
    /// Username and password.
    Password,
    /// DingTalk authorization code.
    DingTalk,
    /// WeChat authorization code.
    WeChat,
    /// One-time code sent by SMS.
    SmsCode,
}

impl LoginType {
    /// Numeric code stored in the login log table.
    pub fn code(&self) -> i16 {
        match self {
            Self::Password => 1,
            Self::DingTalk => 2,
            Self::WeChat => 3,
            Self::SmsCode => 4,
        }
    }

    /// Return the type as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::DingTalk => "ding_talk",
            Self::WeChat => "we_chat",
            Self::SmsCode => "sms_code",
        }
    }
}

impl fmt::Display for LoginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_login_log_numbering() {
        assert_eq!(LoginType::Password.code(), 1);
        assert_eq!(LoginType::DingTalk.code(), 2);
        assert_eq!(LoginType::WeChat.code(), 3);
        assert_eq!(LoginType::SmsCode.code(), 4);
    }
}
