//! Principal (user account) entities.

pub mod model;

pub use model::Principal;
