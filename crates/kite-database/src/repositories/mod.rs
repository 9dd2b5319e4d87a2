//! Repository implementations for the Kite RBAC tables.

pub mod login_log;
pub mod menu;
pub mod online_user;
pub mod role;
pub mod user;

pub use login_log::LoginLogRepository;
pub use menu::MenuRepository;
pub use online_user::OnlineUserRepository;
pub use role::RoleRepository;
pub use user::UserRepository;
