//! Configuration types for catalog-acl
//!
//! This module defines the configuration structure that can be loaded from
//! TOML files and/or environment variables.

use crate::access_control::types::{CatalogMode, LayerGroupVisibilityPolicy};
use crate::catalog::memory::CatalogListing;
use crate::error::HierarchyError;
use crate::roles::{ADMIN_ROLE, GROUP_ADMIN_ROLE, Role, RoleSnapshot, UserGroupSnapshot};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where access rules come from
    pub rules: RulesConfig,

    /// Catalog security behaviour
    pub security: SecurityConfig,

    /// Role hierarchy, users and groups
    pub roles: RolesConfig,

    /// Catalog content used by diagnostics
    pub catalog: CatalogListing,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Access rule sources
///
/// Rules from `path` are loaded first, then `entries` are added. When
/// neither is set the catalog is fully open (`*.*.r=*`, `*.*.w=*`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Properties file holding rules (`~` is expanded)
    pub path: Option<String>,

    /// Inline rules as `key=roles` lines
    pub entries: Vec<String>,
}

impl RulesConfig {
    pub fn is_empty(&self) -> bool {
        self.path.is_none() && self.entries.is_empty()
    }
}

/// Catalog security settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Overrides the `mode` entry of the rules
    pub catalog_mode: Option<CatalogMode>,

    /// What to do with layer groups whose children were filtered
    pub layer_group_policy: LayerGroupVisibilityPolicy,

    /// Local role name granting full catalog access
    pub admin_role: String,

    /// Local role name mapped onto the group administrator role
    pub group_admin_role: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            catalog_mode: None,
            layer_group_policy: LayerGroupVisibilityPolicy::HideEmpty,
            admin_role: ADMIN_ROLE.to_string(),
            group_admin_role: GROUP_ADMIN_ROLE.to_string(),
        }
    }
}

/// Role service and user/group service content
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RolesConfig {
    #[serde(rename = "role")]
    pub roles: Vec<RoleConfig>,

    #[serde(rename = "user")]
    pub users: Vec<UserConfig>,

    #[serde(rename = "group")]
    pub groups: Vec<GroupConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    pub name: String,
    pub parent: Option<String>,
    /// Default property values, overridden per user
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub name: String,
    pub roles: Vec<String>,
    pub groups: Vec<String>,
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    pub name: String,
    pub roles: Vec<String>,
    pub enabled: bool,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            roles: Vec::new(),
            enabled: true,
        }
    }
}

impl RolesConfig {
    /// Build the role and user/group snapshots consumed by the role calculator
    ///
    /// Fails if the configured hierarchy contains a cycle.
    pub fn snapshots(&self) -> Result<(RoleSnapshot, UserGroupSnapshot), HierarchyError> {
        let mut roles = RoleSnapshot::new();
        for role in &self.roles {
            let template = role
                .properties
                .iter()
                .fold(Role::new(role.name.as_str()), |r, (k, v)| {
                    r.with_property(k.as_str(), v.as_str())
                });
            roles.add_role(template, role.parent.as_deref())?;
        }

        let mut users = UserGroupSnapshot::new();
        for group in &self.groups {
            users.add_group(&group.name, group.enabled);
            for role in &group.roles {
                roles.associate_role_to_group(role, &group.name);
            }
        }
        for user in &self.users {
            users.add_user(&user.name, user.properties.clone());
            for group in &user.groups {
                users.add_user_to_group(&user.name, group);
            }
            for role in &user.roles {
                roles.associate_role_to_user(role, &user.name);
            }
        }

        Ok((roles, users))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.rules.is_empty());
        assert_eq!(config.security.catalog_mode, None);
        assert_eq!(
            config.security.layer_group_policy,
            LayerGroupVisibilityPolicy::HideEmpty
        );
        assert_eq!(config.security.admin_role, ADMIN_ROLE);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_deserialize_catalog_mode() {
        let mode: CatalogMode = serde_json::from_str(r#""challenge""#).unwrap();
        assert_eq!(mode, CatalogMode::Challenge);
    }

    #[test]
    fn test_snapshots_reject_cycles() {
        let roles = RolesConfig {
            roles: vec![
                RoleConfig {
                    name: "A".into(),
                    parent: Some("B".into()),
                    ..Default::default()
                },
                RoleConfig {
                    name: "B".into(),
                    parent: Some("A".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert!(matches!(
            roles.snapshots(),
            Err(HierarchyError::InvalidParent { .. })
        ));
    }

    #[test]
    fn test_snapshots_groups_default_enabled() {
        let roles = RolesConfig {
            users: vec![UserConfig {
                name: "alice".into(),
                groups: vec!["staff".into()],
                ..Default::default()
            }],
            groups: vec![GroupConfig {
                name: "staff".into(),
                roles: vec!["ROLE_STAFF".into()],
                ..Default::default()
            }],
            ..Default::default()
        };
        let (_, users) = roles.snapshots().unwrap();
        assert!(users.is_group_enabled("staff"));
        assert!(users.user("alice").unwrap().groups.contains("staff"));
    }
}
