//! Configuration loader with layered sources
//!
//! Loads configuration from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (CATALOG_ACL__*)
//! 2. Configuration file (TOML)
//! 3. Default values

use crate::access_control::parser::{parse_rule, read_properties};
use crate::access_control::store::MODE_KEY;
use crate::access_control::types::CatalogMode;
use crate::config::types::AppConfig;
use crate::error::ConfigError;
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "catalog-acl.toml",
    ".catalog-acl.toml",
    "~/.config/catalog-acl/config.toml",
    "/etc/catalog-acl/config.toml",
];

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        // Explicit path provided - must exist
        let expanded = shellexpand::tilde(path);
        if !Path::new(expanded.as_ref()).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
    } else {
        // First existing default path wins
        for path in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // e.g. CATALOG_ACL__SECURITY__CATALOG_MODE=challenge
    // Double underscore (__) maps to nested keys (security.catalog_mode)
    builder = builder.add_source(
        Environment::with_prefix("CATALOG_ACL")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Validate configuration values
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(path) = &config.rules.path {
        let expanded = shellexpand::tilde(path);
        if !Path::new(expanded.as_ref()).exists() {
            return Err(ConfigError::Invalid {
                message: format!("rules.path does not exist: {}", path),
            });
        }
    }

    validate_rule_entries(&config.rules.entries)?;

    if config.security.admin_role.trim().is_empty() {
        return Err(ConfigError::Missing {
            field: "security.admin_role".to_string(),
        });
    }

    config
        .roles
        .snapshots()
        .map_err(|e| ConfigError::Invalid {
            message: format!("roles: {}", e),
        })?;

    if config.logging.level.trim().is_empty() {
        return Err(ConfigError::Missing {
            field: "logging.level".to_string(),
        });
    }

    Ok(())
}

/// Validate that every inline rule is a well-formed `key=roles` entry
fn validate_rule_entries(entries: &[String]) -> Result<(), ConfigError> {
    for (index, entry) in entries.iter().enumerate() {
        let parsed = read_properties(entry);
        let [(key, value)] = parsed.as_slice() else {
            return Err(ConfigError::Invalid {
                message: format!("rules.entries[{}] is not a 'key=roles' entry: {}", index, entry),
            });
        };

        if key == MODE_KEY {
            if CatalogMode::try_parse(value).is_none() {
                return Err(ConfigError::Invalid {
                    message: format!("rules.entries[{}]: unknown catalog mode '{}'", index, value),
                });
            }
            continue;
        }

        parse_rule(key, value).map_err(|e| ConfigError::Invalid {
            message: format!("rules.entries[{}]: {}", index, e),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_control::types::LayerGroupVisibilityPolicy;

    #[test]
    fn test_load_config_from_str_basic() {
        let toml = r#"
[rules]
entries = ["*.*.r=*", "topp.*.w=ROLE_TOPP_WRITER"]

[security]
catalog_mode = "challenge"
layer_group_policy = "hide_never"

[logging]
level = "debug"
"#;

        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.rules.entries.len(), 2);
        assert_eq!(config.security.catalog_mode, Some(CatalogMode::Challenge));
        assert_eq!(
            config.security.layer_group_policy,
            LayerGroupVisibilityPolicy::HideNever
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_config_with_roles() {
        let toml = r#"
[[roles.role]]
name = "ROLE_EDITOR"

[[roles.role]]
name = "ROLE_TOPP_EDITOR"
parent = "ROLE_EDITOR"
properties = { bbox = "world" }

[[roles.user]]
name = "alice"
roles = ["ROLE_TOPP_EDITOR"]
groups = ["staff"]

[[roles.group]]
name = "staff"
roles = ["ROLE_STAFF"]
enabled = false
"#;

        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.roles.roles.len(), 2);
        assert_eq!(
            config.roles.roles[1].parent.as_deref(),
            Some("ROLE_EDITOR")
        );
        assert_eq!(config.roles.users[0].groups, vec!["staff"]);
        assert!(!config.roles.groups[0].enabled);
    }

    #[test]
    fn test_invalid_rule_entry() {
        let toml = r#"
[rules]
entries = ["topp.states.x=ROLE_A"]
"#;

        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_entry_without_separator() {
        let result = validate_rule_entries(&["# only a comment".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_mode_entry_accepted() {
        assert!(validate_rule_entries(&["mode=MIXED".to_string()]).is_ok());
        assert!(validate_rule_entries(&["mode=OPEN".to_string()]).is_err());
    }

    #[test]
    fn test_cyclic_roles_rejected() {
        let toml = r#"
[[roles.role]]
name = "A"
parent = "B"

[[roles.role]]
name = "B"
parent = "A"
"#;

        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_missing_rules_file() {
        let toml = r#"
[rules]
path = "/definitely/not/here/layers.properties"
"#;

        assert!(load_config_from_str(toml).is_err());
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let result = load_config(Some("/definitely/not/here/catalog-acl.toml"));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
