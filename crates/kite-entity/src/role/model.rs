//! Role entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use kite_core::types::RoleId;

use super::data_scope::DataScope;
use crate::status::EnableStatus;

/// A named bundle of menu grants (`sys_role`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    /// Unique role identifier.
    pub id: RoleId,
    /// Unique machine code, e.g. `"admin"`.
    pub role_code: String,
    /// Display name.
    pub role_name: String,
    /// Display order.
    pub sort: i32,
    /// Row-level data visibility.
    pub data_scope: DataScope,
    /// Disabled roles contribute no permissions.
    pub status: EnableStatus,
    /// Free-form note.
    pub remark: Option<String>,
    /// Soft-delete marker.
    pub is_deleted: bool,
    /// When the role was created.
    pub create_time: DateTime<Utc>,
    /// When the role was last updated.
    pub update_time: DateTime<Utc>,
}

impl Role {
    /// Whether this role currently grants anything.
    pub fn is_active(&self) -> bool {
        self.status.is_enabled() && !self.is_deleted
    }
}
