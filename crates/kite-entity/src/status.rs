//! Enable/disable flag shared by principals, roles, and menu nodes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Record status stored as a `SMALLINT` (`1` enabled, `0` disabled).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type,
)]
#[repr(i16)]
#[serde(rename_all = "lowercase")]
pub enum EnableStatus {
    /// The record is switched off and ignored by login and resolution.
    Disabled = 0,
    /// The record is in effect.
    #[default]
    Enabled = 1,
}

impl EnableStatus {
    /// Whether the record is in effect.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Enabled => "enabled",
        }
    }
}

impl fmt::Display for EnableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EnableStatus {
    type Err = kite_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enabled" | "1" => Ok(Self::Enabled),
            "disabled" | "0" => Ok(Self::Disabled),
            _ => Err(kite_core::AppError::validation(format!(
                "Invalid status: '{s}'. Expected one of: enabled, disabled"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_accepts_numeric_codes() {
        assert_eq!("1".parse::<EnableStatus>().unwrap(), EnableStatus::Enabled);
        assert_eq!("Disabled".parse::<EnableStatus>().unwrap(), EnableStatus::Disabled);
        assert!("paused".parse::<EnableStatus>().is_err());
    }

    #[test]
    fn test_default_is_enabled() {
        assert!(EnableStatus::default().is_enabled());
        assert_eq!(EnableStatus::Disabled as i16, 0);
    }
}
