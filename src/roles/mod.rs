//! Principals and role computation
//!
//! - [`RoleHierarchyHelper`] answers parent/child/ancestor queries over a
//!   flat `role → parent` mapping and rejects cycles
//! - [`RoleCalculator`] turns user and group associations into the
//!   effective role set of a [`Principal`]

pub mod calculator;
pub mod hierarchy;
pub mod principal;

pub use calculator::{Role, RoleCalculator, RoleSnapshot, UserGroupSnapshot, UserRecord};
pub use hierarchy::RoleHierarchyHelper;
pub use principal::Principal;

/// Built-in administrator role, granted full catalog access
pub const ADMIN_ROLE: &str = "ROLE_ADMINISTRATOR";

/// Built-in group administrator role
pub const GROUP_ADMIN_ROLE: &str = "ROLE_GROUP_ADMIN";

/// Role held by every authenticated principal
pub const AUTHENTICATED_ROLE: &str = "ROLE_AUTHENTICATED";
