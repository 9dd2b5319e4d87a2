//! Row-level data visibility attached to a role.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which records a role's holders may see in data-bearing screens.
///
/// Stored as a `SMALLINT`. Kite only persists the value; enforcement
/// belongs to the handlers that query business data.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type,
)]
#[repr(i16)]
#[serde(rename_all = "snake_case")]
pub enum DataScope {
    /// Every record.
    #[default]
    All = 1,
    /// An explicit list of departments.
    Custom = 2,
    /// The holder's own department.
    Department = 3,
    /// The holder's department and all departments below it.
    DepartmentAndBelow = 4,
    /// Only records the holder created.
    SelfOnly = 5,
}

impl DataScope {
    /// Return the scope as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Custom => "custom",
            Self::Department => "department",
            Self::DepartmentAndBelow => "department_and_below",
            Self::SelfOnly => "self_only",
        }
    }
}

impl fmt::Display for DataScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
