//! # kite-core
//!
//! Core crate for Kite. Contains the unified error system, configuration
//! schemas, typed identifiers, domain events, and the traits implemented by
//! the cache and database crates.
//!
//! This crate has **no** internal dependencies on other Kite crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
