//! Role calculation
//!
//! Expands a user's directly assigned roles into the effective set:
//!
//! 1. roles associated with the user
//! 2. roles associated with every *enabled* group the user belongs to
//! 3. all ancestors of the above, via the role hierarchy
//!
//! Roles reached in steps 1 and 2 are personalized with the user's
//! properties; inherited ancestors keep their generic values.

use crate::error::HierarchyResult;
use crate::roles::hierarchy::RoleHierarchyHelper;
use crate::roles::principal::Principal;
use crate::roles::{ADMIN_ROLE, AUTHENTICATED_ROLE, GROUP_ADMIN_ROLE};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// A role, optionally carrying default property values
///
/// A personalized role is tagged with the user it was computed for and is
/// not equal to the shared template. Use [`Role::same_authority`] to compare
/// roles for authorization purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    name: String,
    properties: BTreeMap<String, String>,
    user: Option<String>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
            user: None,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// User this role instance was personalized for
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn is_personalized(&self) -> bool {
        self.user.is_some()
    }

    /// Compare by role name only
    pub fn same_authority(&self, other: &Role) -> bool {
        self.name == other.name
    }

    /// Overlay the user's values onto this role's property template
    ///
    /// Returns an unchanged copy when the template and the user share no keys.
    pub fn personalize(&self, username: &str, user_properties: &BTreeMap<String, String>) -> Role {
        let overlaps = self
            .properties
            .keys()
            .any(|k| user_properties.contains_key(k));
        if !overlaps {
            return self.clone();
        }

        let properties = self
            .properties
            .iter()
            .map(|(k, v)| {
                let value = user_properties.get(k).unwrap_or(v);
                (k.clone(), value.clone())
            })
            .collect();

        Role {
            name: self.name.clone(),
            properties,
            user: Some(username.to_string()),
        }
    }
}

/// Snapshot of the role service: role templates, hierarchy and associations
#[derive(Debug, Clone, Default)]
pub struct RoleSnapshot {
    roles: BTreeMap<String, Role>,
    hierarchy: RoleHierarchyHelper,
    user_roles: HashMap<String, BTreeSet<String>>,
    group_roles: HashMap<String, BTreeSet<String>>,
}

impl RoleSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a role template under an optional parent
    pub fn add_role(&mut self, role: Role, parent: Option<&str>) -> HierarchyResult<()> {
        self.hierarchy.add_role(role.name(), parent)?;
        self.roles.insert(role.name().to_string(), role);
        Ok(())
    }

    /// Remove a role along with every association to it
    pub fn remove_role(&mut self, name: &str) -> bool {
        let removed = self.roles.remove(name).is_some();
        self.hierarchy.remove_role(name);
        for roles in self.user_roles.values_mut().chain(self.group_roles.values_mut()) {
            roles.remove(name);
        }
        removed
    }

    pub fn set_parent(&mut self, role: &str, parent: Option<&str>) -> HierarchyResult<()> {
        self.hierarchy.set_parent(role, parent)
    }

    pub fn associate_role_to_user(&mut self, role: &str, user: &str) {
        self.user_roles
            .entry(user.to_string())
            .or_default()
            .insert(role.to_string());
    }

    pub fn disassociate_role_from_user(&mut self, role: &str, user: &str) -> bool {
        self.user_roles
            .get_mut(user)
            .is_some_and(|roles| roles.remove(role))
    }

    pub fn associate_role_to_group(&mut self, role: &str, group: &str) {
        self.group_roles
            .entry(group.to_string())
            .or_default()
            .insert(role.to_string());
    }

    pub fn disassociate_role_from_group(&mut self, role: &str, group: &str) -> bool {
        self.group_roles
            .get_mut(group)
            .is_some_and(|roles| roles.remove(role))
    }

    pub fn role(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    pub fn hierarchy(&self) -> &RoleHierarchyHelper {
        &self.hierarchy
    }

    fn roles_for_user(&self, user: &str) -> impl Iterator<Item = &String> {
        self.user_roles.get(user).into_iter().flatten()
    }

    fn roles_for_group(&self, group: &str) -> impl Iterator<Item = &String> {
        self.group_roles.get(group).into_iter().flatten()
    }
}

/// A user of the user/group service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRecord {
    pub properties: BTreeMap<String, String>,
    pub groups: BTreeSet<String>,
}

/// Snapshot of the user/group service
#[derive(Debug, Clone, Default)]
pub struct UserGroupSnapshot {
    users: HashMap<String, UserRecord>,
    groups: HashMap<String, bool>,
}

impl UserGroupSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&mut self, name: &str, properties: BTreeMap<String, String>) {
        self.users.entry(name.to_string()).or_default().properties = properties;
    }

    pub fn add_group(&mut self, name: &str, enabled: bool) {
        self.groups.insert(name.to_string(), enabled);
    }

    pub fn add_user_to_group(&mut self, user: &str, group: &str) {
        self.users
            .entry(user.to_string())
            .or_default()
            .groups
            .insert(group.to_string());
        self.groups.entry(group.to_string()).or_insert(true);
    }

    pub fn set_group_enabled(&mut self, group: &str, enabled: bool) {
        self.groups.insert(group.to_string(), enabled);
    }

    pub fn is_group_enabled(&self, group: &str) -> bool {
        self.groups.get(group).copied().unwrap_or(false)
    }

    pub fn user(&self, name: &str) -> Option<&UserRecord> {
        self.users.get(name)
    }
}

/// Computes effective roles from consistent role and user/group snapshots
pub struct RoleCalculator<'a> {
    roles: &'a RoleSnapshot,
    users: &'a UserGroupSnapshot,
    admin_role: Option<String>,
    group_admin_role: Option<String>,
}

impl<'a> RoleCalculator<'a> {
    pub fn new(roles: &'a RoleSnapshot, users: &'a UserGroupSnapshot) -> Self {
        Self {
            roles,
            users,
            admin_role: None,
            group_admin_role: None,
        }
    }

    /// Local role names that map onto the built-in administrator roles
    pub fn with_admin_roles(
        mut self,
        admin_role: Option<String>,
        group_admin_role: Option<String>,
    ) -> Self {
        self.admin_role = admin_role;
        self.group_admin_role = group_admin_role;
        self
    }

    /// Effective roles of `username`, ordered by name
    pub fn calculate_roles(&self, username: &str) -> HierarchyResult<Vec<Role>> {
        let user = self.users.user(username);
        let empty = BTreeMap::new();
        let user_properties = user.map(|u| &u.properties).unwrap_or(&empty);

        let mut direct: BTreeSet<&str> = self
            .roles
            .roles_for_user(username)
            .map(String::as_str)
            .collect();

        for group in user.into_iter().flat_map(|u| u.groups.iter()) {
            if !self.users.is_group_enabled(group) {
                debug!(user = username, group, "Skipping roles of disabled group");
                continue;
            }
            direct.extend(self.roles.roles_for_group(group).map(String::as_str));
        }

        let mut effective: BTreeMap<String, Role> = BTreeMap::new();
        for name in &direct {
            let role = self.template(name).personalize(username, user_properties);
            effective.insert(name.to_string(), role);
        }

        for name in &direct {
            for ancestor in self.roles.hierarchy().ancestors(name)? {
                if !effective.contains_key(&ancestor) {
                    let role = self.template(&ancestor);
                    effective.insert(ancestor, role);
                }
            }
        }

        let mapped = [
            (self.admin_role.as_deref(), ADMIN_ROLE),
            (self.group_admin_role.as_deref(), GROUP_ADMIN_ROLE),
        ];
        for (local, system) in mapped {
            if let Some(local) = local
                && effective.contains_key(local)
            {
                effective
                    .entry(system.to_string())
                    .or_insert_with(|| Role::new(system));
            }
        }

        effective
            .entry(AUTHENTICATED_ROLE.to_string())
            .or_insert_with(|| Role::new(AUTHENTICATED_ROLE));

        debug!(
            user = username,
            roles = effective.len(),
            "Calculated effective roles"
        );
        Ok(effective.into_values().collect())
    }

    /// Effective roles of `username` wrapped as a principal
    pub fn principal(&self, username: &str) -> HierarchyResult<Principal> {
        let roles = self.calculate_roles(username)?;
        Ok(Principal::from_roles(username, &roles))
    }

    fn template(&self, name: &str) -> Role {
        self.roles
            .role(name)
            .cloned()
            .unwrap_or_else(|| Role::new(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(roles: &[Role]) -> Vec<&str> {
        roles.iter().map(Role::name).collect()
    }

    #[test]
    fn test_direct_group_and_ancestor_roles() {
        let mut roles = RoleSnapshot::new();
        roles.add_role(Role::new("ROLE_PARENT"), None).unwrap();
        roles.add_role(Role::new("ROLE_CHILD"), Some("ROLE_PARENT")).unwrap();
        roles.add_role(Role::new("ROLE_GROUP"), None).unwrap();
        roles.associate_role_to_user("ROLE_CHILD", "alice");
        roles.associate_role_to_group("ROLE_GROUP", "staff");

        let mut users = UserGroupSnapshot::new();
        users.add_user_to_group("alice", "staff");

        let calc = RoleCalculator::new(&roles, &users);
        let result = calc.calculate_roles("alice").unwrap();
        assert_eq!(
            names(&result),
            vec!["ROLE_AUTHENTICATED", "ROLE_CHILD", "ROLE_GROUP", "ROLE_PARENT"]
        );
    }

    #[test]
    fn test_personalization_only_for_direct_roles() {
        let mut roles = RoleSnapshot::new();
        roles
            .add_role(Role::new("ROLE_BASE").with_property("org", "none"), None)
            .unwrap();
        roles
            .add_role(
                Role::new("ROLE_EMPLOYEE").with_property("employee_number", ""),
                Some("ROLE_BASE"),
            )
            .unwrap();
        roles.associate_role_to_user("ROLE_EMPLOYEE", "bob");

        let mut users = UserGroupSnapshot::new();
        users.add_user(
            "bob",
            BTreeMap::from([
                ("employee_number".to_string(), "1234".to_string()),
                ("org".to_string(), "acme".to_string()),
            ]),
        );

        let result = RoleCalculator::new(&roles, &users)
            .calculate_roles("bob")
            .unwrap();

        let employee = result.iter().find(|r| r.name() == "ROLE_EMPLOYEE").unwrap();
        assert_eq!(employee.property("employee_number"), Some("1234"));
        assert_eq!(employee.user(), Some("bob"));

        let template = roles.role("ROLE_EMPLOYEE").unwrap();
        assert_ne!(employee, template);
        assert!(employee.same_authority(template));
        assert_eq!(template.property("employee_number"), Some(""));

        let base = result.iter().find(|r| r.name() == "ROLE_BASE").unwrap();
        assert_eq!(base.property("org"), Some("none"));
        assert!(!base.is_personalized());
    }

    #[test]
    fn test_admin_role_mapping() {
        let mut roles = RoleSnapshot::new();
        roles.add_role(Role::new("LOCAL_ADMIN"), None).unwrap();
        roles.associate_role_to_user("LOCAL_ADMIN", "root");
        let users = UserGroupSnapshot::new();

        let principal = RoleCalculator::new(&roles, &users)
            .with_admin_roles(Some("LOCAL_ADMIN".into()), Some("LOCAL_GROUP_ADMIN".into()))
            .principal("root")
            .unwrap();

        assert!(principal.has_role("LOCAL_ADMIN"));
        assert!(principal.has_role(ADMIN_ROLE));
        assert!(!principal.has_role(GROUP_ADMIN_ROLE));
    }

    #[test]
    fn test_unknown_user_gets_authenticated_only() {
        let roles = RoleSnapshot::new();
        let users = UserGroupSnapshot::new();
        let result = RoleCalculator::new(&roles, &users)
            .calculate_roles("nobody")
            .unwrap();
        assert_eq!(names(&result), vec![AUTHENTICATED_ROLE]);
    }
}
