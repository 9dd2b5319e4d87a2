//! # kite-entity
//!
//! Domain entity models for Kite. Database entities derive
//! `sqlx::FromRow`; enums stored as `SMALLINT` derive `sqlx::Type` with an
//! `i16` representation. [`session::Session`] lives only in the cache and is
//! serialized as JSON.

pub mod audit;
pub mod menu;
pub mod role;
pub mod session;
pub mod status;
pub mod user;

pub use status::EnableStatus;
