//! Role-based access control over the menu hierarchy.

pub mod graph;
pub mod resolver;
pub mod tree;

pub use graph::MenuGraph;
pub use resolver::{PermissionResolver, RoleSummary, UserPermissions};
pub use tree::{MenuTreeNode, build_tree};
