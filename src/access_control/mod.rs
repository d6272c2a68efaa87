//! Access control module
//!
//! Rule-based read/write security over a catalog of workspaces, layers,
//! layer groups and styles.
//!
//! ## Rule Model
//!
//! Rules are `key=roles` entries. Keys address a level of the catalog:
//!
//! 1. **`*.*.<mode>`** - the whole catalog
//! 2. **`ws.*.<mode>`** - a workspace and everything in it
//! 3. **`ws.layer.<mode>`** - a single layer or layer group of a workspace
//! 4. **`group.<mode>`** - a global layer group
//!
//! where `<mode>` is `r` or `w`. The most specific rule along a resource's
//! path wins; a level without its own rule inherits its parent's roles, and
//! a catalog without a root rule denies everything that is not covered.
//!
//! ## Example Rules
//!
//! ```text
//! mode=HIDE
//! *.*.r=*
//! *.*.w=ROLE_ADMINISTRATOR
//! topp.*.w=ROLE_TOPP_WRITER
//! topp.states.r=ROLE_TOPP_READER,ROLE_TOPP_WRITER
//! basemap.r=ROLE_MAPS
//! ```

pub mod manager;
pub mod parser;
pub mod rule;
pub mod store;
pub mod tree;
pub mod types;

pub use manager::{AccessManager, SecurityFilter};
pub use parser::parse_rule;
pub use rule::{RoleSet, Rule, RuleKey};
pub use store::RuleStore;
pub use tree::{SecureTree, SecureTreeNode};
pub use types::{AccessLimits, AccessMode, CatalogMode, LayerGroupVisibilityPolicy};
