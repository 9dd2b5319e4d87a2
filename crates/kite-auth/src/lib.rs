//! # kite-auth
//!
//! Session and permission resolution for the Kite RBAC backend.
//!
//! ## Modules
//!
//! - `credential`: password, one-time SMS code and delegated login validation
//! - `token`: HS256 access tokens, opaque refresh tokens, rotation
//! - `session`: cache-backed registry of live sessions
//! - `rbac`: permission resolution and validated menu hierarchy edits
//! - `orchestrator`: sign-in, refresh, sign-out and permission queries
//! - `repository`: storage ports with PostgreSQL and in-memory adapters

pub mod credential;
pub mod error;
pub mod orchestrator;
pub mod password;
pub mod rbac;
pub mod repository;
pub mod session;
pub mod token;

pub use credential::{CredentialValidator, IdentityProvider, LoginRequest, SmsSender};
pub use error::{AuthError, AuthResult};
pub use orchestrator::{AuthOrchestrator, SignInRequest, SignInResult};
pub use password::PasswordHasher;
pub use rbac::{MenuGraph, PermissionResolver, UserPermissions};
pub use repository::{MenuRepository, PrincipalRepository, RoleRepository};
pub use session::SessionStore;
pub use token::{Claims, TokenIssuer, TokenPair};
