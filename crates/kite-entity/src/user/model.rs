//! Principal entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use kite_core::types::{LoginType, UserId};

use crate::status::EnableStatus;

/// A user account that can authenticate against Kite (`sys_user`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Principal {
    /// Unique user identifier.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Argon2id PHC string.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Mobile number used for one-time code login.
    pub phone: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Human-readable name.
    pub real_name: Option<String>,
    /// Linked DingTalk account.
    pub dingtalk_id: Option<String>,
    /// Linked WeChat account.
    pub wechat_id: Option<String>,
    /// Account status.
    pub status: EnableStatus,
    /// Last successful login time.
    pub last_login_time: Option<DateTime<Utc>>,
    /// Address of the last successful login.
    pub last_login_ip: Option<String>,
    /// Soft-delete marker.
    pub is_deleted: bool,
    /// When the account was created.
    pub create_time: DateTime<Utc>,
    /// When the account was last updated.
    pub update_time: DateTime<Utc>,
}

impl Principal {
    /// Check if the user can log in right now.
    pub fn can_login(&self) -> bool {
        self.status.is_enabled() && !self.is_deleted
    }

    /// The external account id linked for a delegated login provider.
    pub fn external_id(&self, provider: LoginType) -> Option<&str> {
        match provider {
            LoginType::DingTalk => self.dingtalk_id.as_deref(),
            LoginType::WeChat => self.wechat_id.as_deref(),
            LoginType::Password | LoginType::SmsCode => None,
        }
    }
}
