//! Core type definitions used across the Kite workspace.

pub mod id;
pub mod login_type;

pub use id::*;
pub use login_type::LoginType;
