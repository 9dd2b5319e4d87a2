//! Durable audit projections: login history and online sessions.

pub mod login_log;
pub mod online_user;

pub use login_log::{LoginOutcome, NewLoginLog};
pub use online_user::NewOnlineUser;
