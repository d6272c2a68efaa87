//! Role hierarchy helper
//!
//! Answers tree-shape queries over a flat `role → parent` mapping.
//!
//! Traversals that follow more than one edge (`ancestors`, `descendants`)
//! detect cycles and fail with [`HierarchyError::Cyclic`]. Single-edge
//! lookups (`parent`, `children`) never fail, even on a node that sits
//! inside a cycle.

use crate::error::{HierarchyError, HierarchyResult};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleHierarchyHelper {
    parents: HashMap<String, Option<String>>,
}

impl RoleHierarchyHelper {
    /// Create a helper from a `role → parent` mapping. Empty parent names
    /// are treated as "no parent".
    pub fn new(mappings: HashMap<String, Option<String>>) -> Self {
        let parents = mappings
            .into_iter()
            .map(|(role, parent)| (role, parent.filter(|p| !p.is_empty())))
            .collect();
        Self { parents }
    }

    /// Create a helper from `(role, parent)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(role, parent)| (role.into(), parent.map(Into::into)))
                .collect(),
        )
    }

    pub fn contains_role(&self, role: &str) -> bool {
        self.parents.contains_key(role)
    }

    pub fn is_root(&self, role: &str) -> bool {
        self.parent(role).is_none()
    }

    pub fn is_leaf(&self, role: &str) -> bool {
        self.children(role).is_empty()
    }

    pub fn parent(&self, role: &str) -> Option<&str> {
        self.parents.get(role).and_then(|p| p.as_deref())
    }

    /// Direct children, found by reverse lookup
    pub fn children(&self, role: &str) -> BTreeSet<String> {
        self.parents
            .iter()
            .filter(|(_, parent)| parent.as_deref() == Some(role))
            .map(|(child, _)| child.clone())
            .collect()
    }

    /// Every role reachable by following parents
    pub fn ancestors(&self, role: &str) -> HierarchyResult<BTreeSet<String>> {
        let mut ancestors = BTreeSet::new();
        let mut current = self.parent(role);

        while let Some(parent) = current {
            if !ancestors.insert(parent.to_string()) {
                return Err(HierarchyError::Cyclic {
                    role: parent.to_string(),
                });
            }
            current = self.parent(parent);
        }

        Ok(ancestors)
    }

    /// Every role reachable by following children
    pub fn descendants(&self, role: &str) -> HierarchyResult<BTreeSet<String>> {
        let mut descendants = BTreeSet::new();
        self.fill_descendants(self.children(role), &mut descendants)?;
        Ok(descendants)
    }

    fn fill_descendants(
        &self,
        children: BTreeSet<String>,
        descendants: &mut BTreeSet<String>,
    ) -> HierarchyResult<()> {
        for child in children {
            if descendants.contains(&child) {
                return Err(HierarchyError::Cyclic { role: child });
            }
            let grandchildren = self.children(&child);
            descendants.insert(child);
            self.fill_descendants(grandchildren, descendants)?;
        }
        Ok(())
    }

    pub fn root_roles(&self) -> BTreeSet<String> {
        self.parents
            .iter()
            .filter(|(_, parent)| parent.is_none())
            .map(|(role, _)| role.clone())
            .collect()
    }

    pub fn leaf_roles(&self) -> BTreeSet<String> {
        let with_children: BTreeSet<&str> =
            self.parents.values().filter_map(|p| p.as_deref()).collect();
        self.parents
            .keys()
            .filter(|role| !with_children.contains(role.as_str()))
            .cloned()
            .collect()
    }

    /// Whether `parent` may become the parent of `role`
    ///
    /// `None` (make `role` a root) is always valid. A role cannot be its own
    /// parent, nor can one of its descendants.
    pub fn is_valid_parent(&self, role: &str, parent: Option<&str>) -> HierarchyResult<bool> {
        let parent = match parent {
            Some(p) if !p.is_empty() => p,
            _ => return Ok(true),
        };
        if parent == role {
            return Ok(false);
        }
        Ok(!self.descendants(role)?.contains(parent))
    }

    /// Add a role, replacing any previous parent assignment
    pub fn add_role(&mut self, role: &str, parent: Option<&str>) -> HierarchyResult<()> {
        if !self.is_valid_parent(role, parent)? {
            return Err(HierarchyError::InvalidParent {
                role: role.to_string(),
                parent: parent.unwrap_or_default().to_string(),
            });
        }
        self.parents.insert(
            role.to_string(),
            parent.filter(|p| !p.is_empty()).map(str::to_string),
        );
        Ok(())
    }

    /// Change the parent of an existing role
    pub fn set_parent(&mut self, role: &str, parent: Option<&str>) -> HierarchyResult<()> {
        if !self.contains_role(role) {
            return Err(HierarchyError::UnknownRole {
                role: role.to_string(),
            });
        }
        self.add_role(role, parent)
    }

    /// Remove a role. Its children become roots.
    pub fn remove_role(&mut self, role: &str) -> bool {
        if self.parents.remove(role).is_none() {
            return false;
        }
        for parent in self.parents.values_mut() {
            if parent.as_deref() == Some(role) {
                *parent = None;
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> RoleHierarchyHelper {
        RoleHierarchyHelper::from_pairs([
            ("ROOT", None),
            ("CHILD1", Some("ROOT")),
            ("CHILD2", Some("ROOT")),
            ("GRANDCHILD", Some("CHILD1")),
        ])
    }

    #[test]
    fn test_shape_queries() {
        let h = tree();
        assert!(h.contains_role("ROOT"));
        assert!(!h.contains_role("OTHER"));
        assert!(h.is_root("ROOT"));
        assert!(!h.is_root("CHILD1"));
        assert!(h.is_leaf("GRANDCHILD"));
        assert!(!h.is_leaf("CHILD1"));
        assert_eq!(h.parent("GRANDCHILD"), Some("CHILD1"));
        assert_eq!(h.parent("ROOT"), None);
        assert_eq!(
            h.children("ROOT"),
            BTreeSet::from(["CHILD1".to_string(), "CHILD2".to_string()])
        );
    }

    #[test]
    fn test_empty_parent_is_root() {
        let h = RoleHierarchyHelper::from_pairs([("A", Some(""))]);
        assert!(h.is_root("A"));
        assert_eq!(h.root_roles().len(), 1);
    }

    #[test]
    fn test_add_role_rejects_cycle() {
        let mut h = tree();
        let err = h.set_parent("ROOT", Some("GRANDCHILD")).unwrap_err();
        assert!(matches!(err, HierarchyError::InvalidParent { .. }));
        assert!(h.is_root("ROOT"));

        assert!(matches!(
            h.set_parent("MISSING", None),
            Err(HierarchyError::UnknownRole { .. })
        ));

        h.add_role("NEW", Some("CHILD2")).unwrap();
        assert_eq!(h.parent("NEW"), Some("CHILD2"));
    }

    #[test]
    fn test_remove_role_orphans_children() {
        let mut h = tree();
        assert!(h.remove_role("CHILD1"));
        assert!(h.is_root("GRANDCHILD"));
        assert!(!h.remove_role("CHILD1"));
    }
}
