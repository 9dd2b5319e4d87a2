//! Role entities.

pub mod data_scope;
pub mod model;

pub use data_scope::DataScope;
pub use model::Role;
