//! Catalog access control
//!
//! Rule-based read/write security for a geospatial catalog of workspaces,
//! layers, layer groups and styles.
//!
//! ## Features
//!
//! - **Hierarchical rules** at catalog, workspace, layer and global layer group level
//! - **Role hierarchy** with inherited and per-user personalized roles
//! - **Secure catalog** that hides or challenges what a principal cannot read
//! - **Atomic rule edits**: readers always see a complete rule tree
//!
//! ## Access Control Model
//!
//! ```text
//! *.* (catalog) → ws.* (workspace) → ws.layer
//!               → group (global layer group)
//! ```
//!
//! The most specific rule along a resource's path decides; levels without a
//! rule inherit their parent's roles, and an uncovered catalog denies.
//!
//! ## Example Configuration
//!
//! ```toml
//! [rules]
//! path = "~/.config/catalog-acl/layers.properties"
//! entries = ["topp.*.w=ROLE_TOPP_WRITER"]
//!
//! [security]
//! catalog_mode = "challenge"
//! layer_group_policy = "hide_empty"
//!
//! [[roles.role]]
//! name = "ROLE_TOPP_WRITER"
//! parent = "ROLE_EDITOR"
//!
//! [[roles.user]]
//! name = "alice"
//! roles = ["ROLE_TOPP_WRITER"]
//! ```

pub mod access_control;
pub mod catalog;
pub mod config;
pub mod error;
pub mod roles;

// Re-export main types
pub use access_control::{AccessManager, RuleStore};
pub use catalog::{RequestContext, SecureCatalog};
pub use config::{AppConfig, load_config};
pub use error::{AppError, Result};
pub use roles::{Principal, RoleCalculator};
