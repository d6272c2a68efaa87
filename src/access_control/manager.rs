//! Access manager
//!
//! Owns the rule store and the published [`SecureTree`]. Rule edits build a
//! complete candidate tree first and publish it with a single atomic swap,
//! so concurrent readers see either the old tree or the new one.
//!
//! Resources map onto tree paths as follows:
//!
//! | resource                     | path              |
//! |------------------------------|-------------------|
//! | workspace `ws`               | `ws`              |
//! | layer `ws:name`              | `ws / name`       |
//! | layer group `ws:name`        | `ws / name`       |
//! | global layer group `name`    | `name`            |
//! | style `ws:name`              | `ws`              |
//! | global style                 | root (write only) |
//!
//! A layer whose workspace is unknown is denied.

use crate::access_control::rule::Rule;
use crate::access_control::store::RuleStore;
use crate::access_control::tree::SecureTree;
use crate::access_control::types::{AccessLimits, AccessMode, CatalogMode};
use crate::catalog::{CatalogInfo, ResourceKind};
use crate::config::{AppConfig, SecurityConfig};
use crate::error::RuleResult;
use crate::roles::{ADMIN_ROLE, Principal};
use arc_swap::ArcSwap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

pub struct AccessManager {
    rules: RwLock<RuleStore>,
    tree: ArcSwap<SecureTree>,
    mode_override: Option<CatalogMode>,
    admin_role: String,
}

impl AccessManager {
    /// Create a manager from a rule store and the security settings
    pub fn new(store: RuleStore, security: &SecurityConfig) -> RuleResult<Self> {
        let tree = SecureTree::build(&store)?;
        Ok(Self {
            rules: RwLock::new(store),
            tree: ArcSwap::from_pointee(tree),
            mode_override: security.catalog_mode,
            admin_role: security.admin_role.clone(),
        })
    }

    /// Create a manager from the `[rules]` and `[security]` configuration sections
    pub fn from_config(config: &AppConfig) -> crate::Result<Self> {
        let store = RuleStore::from_config(&config.rules)?;
        Ok(Self::new(store, &config.security)?)
    }

    /// Manager over a fully open catalog, with default settings
    pub fn allow_all() -> Self {
        let store = RuleStore::with_defaults();
        let tree = SecureTree::build(&store).unwrap_or_default();
        Self {
            rules: RwLock::new(store),
            tree: ArcSwap::from_pointee(tree),
            mode_override: None,
            admin_role: ADMIN_ROLE.to_string(),
        }
    }

    /// Catalog mode: the configured override, else the rule store's `mode`
    pub fn catalog_mode(&self) -> CatalogMode {
        match self.mode_override {
            Some(mode) => mode,
            None => self.read_rules(|store| store.mode()),
        }
    }

    /// Currently published tree
    pub fn tree(&self) -> Arc<SecureTree> {
        self.tree.load_full()
    }

    /// Snapshot of the rule store
    pub fn rules(&self) -> RuleStore {
        self.read_rules(RuleStore::clone)
    }

    /// Add a rule and republish the tree
    ///
    /// Returns `Ok(false)` if a rule with the same key exists. If the new
    /// tree cannot be built, neither the store nor the tree change.
    pub fn add_rule(&self, rule: Rule) -> RuleResult<bool> {
        self.edit_rules(|store| store.add_rule(rule))
    }

    /// Remove a rule and republish the tree. Returns `Ok(false)` if absent.
    pub fn remove_rule(&self, rule: &Rule) -> RuleResult<bool> {
        self.edit_rules(|store| store.remove_rule(rule))
    }

    /// Replace every rule (and the mode) with the content of `store`
    pub fn replace_rules(&self, store: RuleStore) -> RuleResult<()> {
        self.edit_rules(|current| {
            *current = store;
            true
        })
        .map(|_| ())
    }

    fn edit_rules<F>(&self, edit: F) -> RuleResult<bool>
    where
        F: FnOnce(&mut RuleStore) -> bool,
    {
        let mut guard = self.rules.write().unwrap_or_else(PoisonError::into_inner);

        let mut candidate = guard.clone();
        if !edit(&mut candidate) {
            return Ok(false);
        }

        let tree = SecureTree::build(&candidate)?;
        *guard = candidate;
        self.tree.store(Arc::new(tree));

        info!(rules = guard.len(), "Published new secure tree");
        Ok(true)
    }

    fn read_rules<T>(&self, f: impl FnOnce(&RuleStore) -> T) -> T {
        let guard = self.rules.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Whether `principal` is a catalog administrator
    pub fn is_admin(&self, principal: &Principal) -> bool {
        !principal.is_anonymous()
            && (principal.has_role(&self.admin_role) || principal.has_role(ADMIN_ROLE))
    }

    /// Whether `principal` may access `resource` in `mode`
    pub fn can_access(
        &self,
        principal: &Principal,
        resource: &dyn CatalogInfo,
        mode: AccessMode,
    ) -> bool {
        let tree = self.tree.load();
        let admin = self.is_admin(principal);
        let allowed = check(&tree, admin, principal, resource, mode);
        debug!(
            principal = %principal,
            resource = %resource.prefixed_name(),
            kind = %resource.kind(),
            mode = %mode,
            allowed,
            "Checked access"
        );
        allowed
    }

    /// Catalog mode plus read/write flags of `principal` on `resource`
    pub fn access_limits(&self, principal: &Principal, resource: &dyn CatalogInfo) -> AccessLimits {
        let tree = self.tree.load();
        let admin = self.is_admin(principal);
        AccessLimits {
            mode: self.catalog_mode(),
            readable: check(&tree, admin, principal, resource, AccessMode::Read),
            writable: check(&tree, admin, principal, resource, AccessMode::Write),
        }
    }

    /// Reusable read-access predicate for resources of `kind`
    ///
    /// The filter captures the current tree, so a rule edit published after
    /// this call does not affect it.
    pub fn security_filter(&self, principal: &Principal, kind: ResourceKind) -> SecurityFilter {
        SecurityFilter {
            tree: self.tree.load_full(),
            admin: self.is_admin(principal),
            principal: principal.clone(),
            kind,
        }
    }
}

/// Read-access predicate closed over one principal and one tree snapshot
#[derive(Debug, Clone)]
pub struct SecurityFilter {
    tree: Arc<SecureTree>,
    principal: Principal,
    admin: bool,
    kind: ResourceKind,
}

impl SecurityFilter {
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Whether `resource` is of the filtered kind and readable
    pub fn accepts(&self, resource: &dyn CatalogInfo) -> bool {
        resource.kind() == self.kind
            && check(
                &self.tree,
                self.admin,
                &self.principal,
                resource,
                AccessMode::Read,
            )
    }

    /// Keep the readable items of `items`
    pub fn filter<T: CatalogInfo>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().filter(|item| self.accepts(item)).collect()
    }
}

fn check(
    tree: &SecureTree,
    admin: bool,
    principal: &Principal,
    resource: &dyn CatalogInfo,
    mode: AccessMode,
) -> bool {
    if admin {
        return true;
    }

    let name = resource.name();
    match (resource.kind(), resource.workspace()) {
        (ResourceKind::Workspace, _) => tree.can_access(principal, &[name], mode),
        (ResourceKind::Layer, Some(ws)) => tree.can_access(principal, &[ws, name], mode),
        (ResourceKind::Layer, None) => {
            debug!(layer = name, "Layer workspace unresolved, denying");
            false
        }
        (ResourceKind::LayerGroup, Some(ws)) => tree.can_access(principal, &[ws, name], mode),
        (ResourceKind::LayerGroup, None) => tree.can_access(principal, &[name], mode),
        (ResourceKind::Style, Some(ws)) => tree.can_access(principal, &[ws], mode),
        (ResourceKind::Style, None) => match mode {
            AccessMode::Read => true,
            AccessMode::Write => tree.can_access(principal, &[], mode),
        },
    }
}
