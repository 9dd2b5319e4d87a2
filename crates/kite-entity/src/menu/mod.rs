//! Menu hierarchy entities.

pub mod menu_type;
pub mod model;

pub use menu_type::MenuType;
pub use model::{MenuNode, MenuUpdate, NewMenu};
