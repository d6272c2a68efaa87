//! Access rule values
//!
//! A [`Rule`] is one parsed statement of the form `root[.layer].mode=roles`.
//! Rules are immutable: editing a rule means replacing it in the store.

use crate::access_control::parser::escape_segment;
use crate::access_control::types::AccessMode;
use std::collections::BTreeSet;
use std::fmt;

/// Wildcard used in rule keys for "any workspace" or "any layer"
pub const ANY: &str = "*";

/// Role name meaning "everybody, including anonymous"
pub const EVERYBODY: &str = "*";

/// Set of role names authorized by a rule
///
/// The [`EVERYBODY`] wildcard absorbs every other name: a set containing it
/// is stored as the wildcard alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    /// Set matching every principal
    pub fn everybody() -> Self {
        Self(BTreeSet::from([EVERYBODY.to_string()]))
    }

    /// Set matching no principal
    pub fn nobody() -> Self {
        Self(BTreeSet::new())
    }

    /// Build a set from role names, collapsing to [`RoleSet::everybody`] if
    /// the wildcard is present. Names are trimmed and blanks dropped.
    pub fn from_roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: BTreeSet<String> = roles
            .into_iter()
            .map(|r| r.as_ref().trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();

        if names.contains(EVERYBODY) {
            Self::everybody()
        } else {
            Self(names)
        }
    }

    pub fn is_everybody(&self) -> bool {
        self.0.contains(EVERYBODY)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Exact, case-sensitive membership of a named role. Never true for the
    /// wildcard itself.
    pub fn contains_role(&self, name: &str) -> bool {
        name != EVERYBODY && self.0.contains(name)
    }

    /// Whether a principal holding `roles` is authorized by this set
    pub fn permits<'a, I>(&self, roles: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        if self.is_everybody() {
            return true;
        }
        roles.into_iter().any(|r| self.0.contains(r))
    }

    /// Iterate over role names (the wildcard included, if present)
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.0.iter().map(String::as_str).collect::<Vec<_>>().join(",");
        write!(f, "{}", joined)
    }
}

/// Identity of a rule within a store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleKey {
    pub root: String,
    pub layer: Option<String>,
    pub mode: AccessMode,
}

/// One access-control statement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    root: String,
    layer: Option<String>,
    mode: AccessMode,
    roles: RoleSet,
}

impl Rule {
    /// Create a workspace/layer rule. `layer` may be [`ANY`].
    pub fn new(
        root: impl Into<String>,
        layer: impl Into<String>,
        mode: AccessMode,
        roles: RoleSet,
    ) -> Self {
        Self {
            root: root.into().trim().to_string(),
            layer: Some(layer.into().trim().to_string()),
            mode,
            roles,
        }
    }

    /// Create a rule keyed by a single top-level name, used for layer
    /// groups that do not belong to any workspace
    pub fn global_group(name: impl Into<String>, mode: AccessMode, roles: RoleSet) -> Self {
        Self {
            root: name.into().trim().to_string(),
            layer: None,
            mode,
            roles,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn layer(&self) -> Option<&str> {
        self.layer.as_deref()
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    pub fn key(&self) -> RuleKey {
        RuleKey {
            root: self.root.clone(),
            layer: self.layer.clone(),
            mode: self.mode,
        }
    }

    pub fn is_global_group_rule(&self) -> bool {
        self.layer.is_none()
    }

    /// Properties key with literal dots escaped
    pub fn property_key(&self) -> String {
        match &self.layer {
            Some(layer) => format!(
                "{}.{}.{}",
                escape_segment(&self.root),
                escape_segment(layer),
                self.mode.letter()
            ),
            None => format!("{}.{}", escape_segment(&self.root), self.mode.letter()),
        }
    }

    pub fn property_value(&self) -> String {
        self.roles.to_string()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.property_key(), self.property_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_set_wildcard_absorbs() {
        let set = RoleSet::from_roles(["ROLE_A", "*", "ROLE_B"]);
        assert!(set.is_everybody());
        assert_eq!(set.len(), 1);
        assert_eq!(set.to_string(), "*");
    }

    #[test]
    fn test_role_set_contains_role_ignores_wildcard() {
        let set = RoleSet::everybody();
        assert!(!set.contains_role("*"));
        assert!(!set.contains_role("ROLE_A"));
        assert!(set.permits(std::iter::empty()));
    }

    #[test]
    fn test_role_set_permits_by_intersection() {
        let set = RoleSet::from_roles([" ROLE_A ", "ROLE_B", ""]);
        assert_eq!(set.len(), 2);
        assert!(set.permits(["ROLE_X", "ROLE_B"]));
        assert!(!set.permits(["ROLE_X"]));
        assert!(!set.permits(["role_a"]));
    }

    #[test]
    fn test_property_key_escapes_dots() {
        let rule = Rule::new("w", "a.b", AccessMode::Read, RoleSet::everybody());
        assert_eq!(rule.property_key(), r"w.a\.b.r");
        assert_eq!(rule.to_string(), r"w.a\.b.r=*");
    }

    #[test]
    fn test_global_group_rule() {
        let rule = Rule::global_group("basemap", AccessMode::Write, RoleSet::nobody());
        assert!(rule.is_global_group_rule());
        assert_eq!(rule.property_key(), "basemap.w");
        assert_eq!(rule.property_value(), "");
    }
}
