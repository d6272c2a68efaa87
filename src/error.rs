//! Error types for catalog-acl
//!
//! This module defines the error hierarchy used throughout the crate.
//! Configuration-time problems (bad rule keys, cyclic role hierarchies)
//! are surfaced as errors; runtime access checks never error and deny instead.

use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    #[error("Role hierarchy error: {0}")]
    Hierarchy(#[from] HierarchyError),

    #[error("Access denied: {0}")]
    AccessDenied(#[from] AccessDeniedError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while parsing or applying access rules
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Malformed rule key '{key}': {reason}")]
    MalformedKey { key: String, reason: String },

    #[error("Unsupported wildcard in rule '{key}': a '*' workspace cannot name a specific layer")]
    UnsupportedWildcard { key: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuleError {
    pub fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedKey {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Role hierarchy errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("Cycle detected in role hierarchy at '{role}'")]
    Cyclic { role: String },

    #[error("'{parent}' is not a valid parent for role '{role}'")]
    InvalidParent { role: String, parent: String },

    #[error("Unknown role '{role}'")]
    UnknownRole { role: String },
}

/// Access control errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Access denied to '{resource}': {reason}")]
pub struct AccessDeniedError {
    pub resource: String,
    pub reason: String,
}

impl AccessDeniedError {
    pub fn new(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// Error raised when an anonymous or under-privileged principal asks
    /// for a resource the catalog mode says must be challenged
    pub fn challenge(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            reason: "authentication with sufficient privileges is required".into(),
        }
    }
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for rule operations
pub type RuleResult<T> = std::result::Result<T, RuleError>;

/// Result type alias for role hierarchy queries
pub type HierarchyResult<T> = std::result::Result<T, HierarchyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_key_message() {
        let err = RuleError::malformed("a.b.c.d", "expected 2 or 3 segments");
        assert!(err.to_string().contains("a.b.c.d"));
        assert!(err.to_string().contains("segments"));
    }

    #[test]
    fn test_access_denied_constructors() {
        let err = AccessDeniedError::challenge("topp:states");
        assert_eq!(err.resource, "topp:states");
        assert!(err.reason.contains("authentication"));

        let app: AppError = err.into();
        assert!(matches!(app, AppError::AccessDenied(_)));
    }

    #[test]
    fn test_hierarchy_error_conversion() {
        let err = HierarchyError::Cyclic {
            role: "ROLE_A".into(),
        };
        let app: AppError = err.into();
        assert!(app.to_string().contains("ROLE_A"));
    }
}
