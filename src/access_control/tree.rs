//! Secure tree
//!
//! Hierarchical index of authorized roles built from a [`RuleStore`]:
//!
//! ```text
//! root (*.*)  →  workspace or global group (ws.* / group)  →  layer (ws.layer)
//! ```
//!
//! Every node may carry an explicit role set per access mode. A node without
//! one inherits its parent's, and the root falls back to the empty set, so a
//! missing rule always denies. Effective sets are resolved once at build
//! time, which keeps lookups proportional to the path depth.
//!
//! A `*` in a rule key is structural: `*.*` addresses the root and `ws.*`
//! addresses the workspace node. It never becomes a child named `*`.

use crate::access_control::rule::{ANY, RoleSet, Rule};
use crate::access_control::store::RuleStore;
use crate::access_control::types::AccessMode;
use crate::error::{RuleError, RuleResult};
use crate::roles::Principal;
use std::collections::HashMap;
use tracing::{info, trace, warn};

/// One node of the secure tree
#[derive(Debug, Default)]
pub struct SecureTreeNode {
    name: String,
    depth: usize,
    children: HashMap<String, SecureTreeNode>,
    explicit: [Option<RoleSet>; 2],
    effective: [RoleSet; 2],
}

impl SecureTreeNode {
    fn new(name: impl Into<String>, depth: usize) -> Self {
        Self {
            name: name.into(),
            depth,
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Distance from the root (the root is 0)
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn child(&self, name: &str) -> Option<&SecureTreeNode> {
        self.children.get(name)
    }

    pub fn children(&self) -> impl Iterator<Item = &SecureTreeNode> {
        self.children.values()
    }

    /// Role set set directly on this node by a rule, if any
    pub fn explicit_roles(&self, mode: AccessMode) -> Option<&RoleSet> {
        self.explicit[mode.index()].as_ref()
    }

    /// Roles authorized at this node, inherited from the closest ancestor
    /// carrying an explicit set when this node has none
    pub fn authorized_roles(&self, mode: AccessMode) -> &RoleSet {
        &self.effective[mode.index()]
    }

    /// Whether `principal` may access this node in `mode`
    ///
    /// Anonymous principals only pass when everybody is authorized.
    pub fn can_access(&self, principal: &Principal, mode: AccessMode) -> bool {
        let roles = self.authorized_roles(mode);
        if roles.is_everybody() {
            return true;
        }
        if principal.is_anonymous() {
            return false;
        }
        roles.permits(principal.role_names())
    }

    fn child_or_create(&mut self, name: &str) -> &mut SecureTreeNode {
        let depth = self.depth + 1;
        self.children
            .entry(name.to_string())
            .or_insert_with(|| SecureTreeNode::new(name, depth))
    }

    fn resolve(&mut self, inherited: &[RoleSet; 2]) {
        for mode in AccessMode::all() {
            let i = mode.index();
            self.effective[i] = self.explicit[i]
                .clone()
                .unwrap_or_else(|| inherited[i].clone());
        }
        let effective = self.effective.clone();
        for child in self.children.values_mut() {
            child.resolve(&effective);
        }
    }
}

/// Immutable tree of authorized roles
#[derive(Debug)]
pub struct SecureTree {
    root: SecureTreeNode,
    rule_count: usize,
}

impl Default for SecureTree {
    fn default() -> Self {
        Self {
            root: SecureTreeNode::new(ANY, 0),
            rule_count: 0,
        }
    }
}

impl SecureTree {
    /// Build a tree from every rule in `store`
    ///
    /// Rules naming resources that do not exist still create nodes. Fails if
    /// a rule pairs a `*` workspace with a named layer. The parser rejects
    /// such keys, so only rules constructed in code can get here.
    pub fn build(store: &RuleStore) -> RuleResult<Self> {
        let mut tree = Self::default();

        // Workspace rules are applied after global group rules so they win
        // when a group and a workspace share a name.
        let (groups, workspaces): (Vec<&Rule>, Vec<&Rule>) =
            store.rules().iter().partition(|r| r.is_global_group_rule());

        for rule in groups.into_iter().chain(workspaces) {
            let path = Self::rule_path(rule)?;
            let mut node = &mut tree.root;
            for segment in &path {
                node = node.child_or_create(segment);
            }

            let slot = &mut node.explicit[rule.mode().index()];
            if slot.is_some() {
                warn!(
                    rule = %rule,
                    "Rule overrides a global group rule on the same node"
                );
            }
            trace!(rule = %rule, depth = path.len(), "Applied rule");
            *slot = Some(rule.roles().clone());
            tree.rule_count += 1;
        }

        tree.root.resolve(&[RoleSet::nobody(), RoleSet::nobody()]);

        info!(rules = tree.rule_count, "Built secure tree");
        Ok(tree)
    }

    fn rule_path(rule: &Rule) -> RuleResult<Vec<&str>> {
        match (rule.root(), rule.layer()) {
            (ANY, None) | (ANY, Some(ANY)) => Ok(Vec::new()),
            (ANY, Some(_)) => Err(RuleError::UnsupportedWildcard {
                key: rule.property_key(),
            }),
            (root, None) | (root, Some(ANY)) => Ok(vec![root]),
            (root, Some(layer)) => Ok(vec![root, layer]),
        }
    }

    pub fn root(&self) -> &SecureTreeNode {
        &self.root
    }

    /// Number of rules applied while building
    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    /// Deepest existing node along `path`
    pub fn node(&self, path: &[&str]) -> &SecureTreeNode {
        let mut node = &self.root;
        for segment in path {
            match node.child(segment) {
                Some(child) => node = child,
                None => break,
            }
        }
        node
    }

    /// Whether `principal` may access the resource at `path` in `mode`
    pub fn can_access(&self, principal: &Principal, path: &[&str], mode: AccessMode) -> bool {
        let node = self.node(path);
        let allowed = node.can_access(principal, mode);
        trace!(
            path = ?path,
            node = node.name(),
            depth = node.depth(),
            mode = %mode,
            allowed,
            "Evaluated secure tree"
        );
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(text: &str) -> RuleStore {
        RuleStore::from_properties_str_strict(text).unwrap()
    }

    fn user(roles: &[&str]) -> Principal {
        Principal::authenticated("user", roles.iter().copied())
    }

    #[test]
    fn test_empty_tree_denies() {
        let tree = SecureTree::build(&RuleStore::new()).unwrap();
        assert!(tree.root().authorized_roles(AccessMode::Read).is_empty());
        assert!(!tree.can_access(&Principal::anonymous(), &["topp", "states"], AccessMode::Read));
        assert!(!tree.can_access(&user(&["ROLE_A"]), &[], AccessMode::Write));
    }

    #[test]
    fn test_inheritance_and_specificity() {
        let tree = SecureTree::build(&store(
            "*.*.r=*\ntopp.*.w=ROLE_TW\ntopp.states.w=ROLE_TSW\n",
        ))
        .unwrap();

        let topp = tree.root().child("topp").unwrap();
        assert!(topp.explicit_roles(AccessMode::Read).is_none());
        assert!(topp.authorized_roles(AccessMode::Read).is_everybody());

        let states = tree.node(&["topp", "states"]);
        assert_eq!(states.name(), "states");
        assert!(states.authorized_roles(AccessMode::Write).contains_role("ROLE_TSW"));
        assert!(!states.authorized_roles(AccessMode::Write).contains_role("ROLE_TW"));

        let tw = user(&["ROLE_TW"]);
        assert!(tree.can_access(&tw, &["topp", "roads"], AccessMode::Write));
        assert!(!tree.can_access(&tw, &["topp", "states"], AccessMode::Write));
        assert!(!tree.can_access(&tw, &["nurc", "dem"], AccessMode::Write));
    }

    #[test]
    fn test_wildcard_is_not_a_child() {
        let tree = SecureTree::build(&store("*.*.r=*\ntopp.*.r=ROLE_A\n")).unwrap();
        assert!(tree.root().child("*").is_none());
        assert!(tree.root().child("topp").unwrap().child("*").is_none());
    }

    #[test]
    fn test_anonymous_only_passes_everybody() {
        let tree = SecureTree::build(&store("*.*.r=ROLE_ANONYMOUS\n")).unwrap();
        let anonymous = Principal::anonymous();
        assert!(!tree.can_access(&anonymous, &["topp"], AccessMode::Read));
    }

    #[test]
    fn test_global_group_rule() {
        let tree = SecureTree::build(&store("*.*.r=*\nbasemap.r=ROLE_MAPS\n")).unwrap();
        assert!(!tree.can_access(&Principal::anonymous(), &["basemap"], AccessMode::Read));
        assert!(tree.can_access(&user(&["ROLE_MAPS"]), &["basemap"], AccessMode::Read));
    }

    #[test]
    fn test_workspace_wildcard_with_named_layer_fails() {
        // parsing already rejects this key; rules built in code reach the tree
        let mut rules = RuleStore::new();
        rules.add_rule(Rule::new(ANY, "states", AccessMode::Read, RoleSet::from_roles(["ROLE_A"])));
        let result = SecureTree::build(&rules);
        assert!(matches!(
            result,
            Err(RuleError::UnsupportedWildcard { .. })
        ));
    }
}
