//! # kite-database
//!
//! PostgreSQL connection management, migrations, and concrete repository
//! implementations for the Kite RBAC tables, plus the audit projection that
//! turns authentication events into login-log and online-user rows.

pub mod connection;
pub mod migration;
pub mod projection;
pub mod repositories;

pub use connection::DatabasePool;
pub use projection::AuditProjection;
