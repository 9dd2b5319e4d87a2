//! Menu node kind enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of a menu node, stored as a `SMALLINT`.
///
/// Nesting rules: a `Directory` may hold anything, a `Menu` may only hold
/// `Button`s, and a `Button` is always a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
#[serde(rename_all = "lowercase")]
pub enum MenuType {
    /// A grouping node in the navigation tree.
    Directory = 1,
    /// A navigable page.
    Menu = 2,
    /// An action inside a page, carrying permission tokens.
    Button = 3,
}

impl MenuType {
    /// Whether a node of this kind may have a child of kind `child`.
    pub fn accepts_child(&self, child: MenuType) -> bool {
        match self {
            Self::Directory => true,
            Self::Menu => child == Self::Button,
            Self::Button => false,
        }
    }

    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Menu => "menu",
            Self::Button => "button",
        }
    }
}

impl fmt::Display for MenuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MenuType {
    type Err = kite_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "directory" => Ok(Self::Directory),
            "menu" => Ok(Self::Menu),
            "button" => Ok(Self::Button),
            _ => Err(kite_core::AppError::validation(format!(
                "Invalid menu type: '{s}'. Expected one of: directory, menu, button"
            ))),
        }
    }
}
