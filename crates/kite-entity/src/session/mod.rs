//! Cached login session.

pub mod model;

pub use model::{Session, SessionStatus};
