//! Principals whose access is being checked

use crate::roles::calculator::Role;
use std::collections::BTreeSet;
use std::fmt;

/// An authenticated user with its effective role names, or the anonymous user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    username: Option<String>,
    roles: BTreeSet<String>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self {
            username: None,
            roles: BTreeSet::new(),
        }
    }

    pub fn authenticated<I, S>(username: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            username: Some(username.into()),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a principal from roles computed by the role calculator.
    /// Only role names matter for authorization.
    pub fn from_roles<'a, I>(username: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = &'a Role>,
    {
        Self::authenticated(username, roles.into_iter().map(|r| r.name().to_string()))
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_none()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.username {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "anonymous"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous() {
        let p = Principal::anonymous();
        assert!(p.is_anonymous());
        assert_eq!(p.to_string(), "anonymous");
        assert_eq!(p.role_names().count(), 0);
    }

    #[test]
    fn test_from_roles_uses_names() {
        let personalized = Role::new("ROLE_EMPLOYEE")
            .with_property("employee_number", "")
            .personalize("alice", &[("employee_number".to_string(), "42".to_string())].into());
        let p = Principal::from_roles("alice", [&personalized, &Role::new("ROLE_AUTHENTICATED")]);

        assert!(p.has_role("ROLE_EMPLOYEE"));
        assert!(p.has_role("ROLE_AUTHENTICATED"));
        assert_eq!(p.username(), Some("alice"));
    }
}
