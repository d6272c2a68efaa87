//! Secure catalog decorator
//!
//! [`SecureCatalog`] wraps a [`Catalog`] and answers every call on behalf of
//! one principal, hiding or challenging what the principal cannot read.
//!
//! Listings always drop unreadable resources. Direct lookups follow the
//! catalog mode: HIDE answers `Ok(None)`, CHALLENGE answers an
//! [`AccessDeniedError`], MIXED hides during capabilities listings and
//! challenges otherwise.
//!
//! Layer group children are only filtered during capabilities listings.
//! Ordinary requests get the group's full child list after the group's own
//! read check.

use crate::access_control::manager::{AccessManager, SecurityFilter};
use crate::access_control::types::{AccessMode, CatalogMode, LayerGroupVisibilityPolicy};
use crate::catalog::filtered_list::FilteredList;
use crate::catalog::{
    Catalog, CatalogInfo, LayerGroupEntry, LayerGroupInfo, LayerInfo, PublishedInfo,
    ResourceKind, StyleInfo, WorkspaceInfo,
};
use crate::error::AccessDeniedError;
use crate::roles::Principal;
use std::sync::Arc;
use tracing::debug;

/// Per-call request state
///
/// Passed explicitly to every [`SecureCatalog`] call. A virtual service
/// context names the workspace (and optionally the single layer) a request
/// was addressed to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    capabilities: bool,
    local_workspace: Option<String>,
    local_layer: Option<String>,
}

impl RequestContext {
    /// Ordinary request
    pub fn new() -> Self {
        Self::default()
    }

    /// Capabilities listing
    pub fn capabilities() -> Self {
        Self {
            capabilities: true,
            ..Self::default()
        }
    }

    /// Restrict the request to a workspace, or to one layer of it
    pub fn with_virtual_service(mut self, workspace: &str, layer: Option<&str>) -> Self {
        self.local_workspace = Some(workspace.to_string());
        self.local_layer = layer.map(str::to_string);
        self
    }

    pub fn is_capabilities(&self) -> bool {
        self.capabilities
    }

    pub fn local_workspace(&self) -> Option<&str> {
        self.local_workspace.as_deref()
    }

    pub fn local_layer(&self) -> Option<&str> {
        self.local_layer.as_deref()
    }

    /// Whether the virtual service context names `resource` directly
    fn names(&self, resource: &dyn CatalogInfo) -> bool {
        self.local_layer.as_deref() == Some(resource.name())
            && self
                .local_workspace
                .as_deref()
                .is_none_or(|ws| resource.workspace() == Some(ws))
    }

    /// Whether the advertised flag lets `resource` through
    ///
    /// A non-advertised resource is dropped from capabilities listings,
    /// unless the request was addressed to that resource.
    fn shows(&self, resource: &dyn CatalogInfo) -> bool {
        resource.is_advertised() || !self.capabilities || self.names(resource)
    }
}

/// Visibility rules for layer group children, closed over one request
#[derive(Debug, Clone)]
struct GroupFilter {
    layers: SecurityFilter,
    groups: SecurityFilter,
    context: RequestContext,
    policy: LayerGroupVisibilityPolicy,
}

impl GroupFilter {
    /// Backing indices of the children of `group` that stay visible
    fn visible_children(&self, group: &LayerGroupInfo) -> Vec<usize> {
        if !self.context.is_capabilities() {
            return (0..group.layers.len()).collect();
        }

        group
            .layers
            .iter()
            .enumerate()
            .filter(|(_, entry)| self.entry_visible(entry))
            .map(|(index, _)| index)
            .collect()
    }

    fn entry_visible(&self, entry: &LayerGroupEntry) -> bool {
        match &entry.published {
            PublishedInfo::Layer(layer) => {
                self.layers.accepts(layer) && self.context.shows(layer)
            }
            PublishedInfo::Group(group) => {
                self.groups.accepts(group.as_ref()) && self.shown(group, None)
            }
        }
    }

    /// Advertised flag and visibility policy for a readable group
    ///
    /// `visible` may carry the already computed child positions.
    fn shown(&self, group: &LayerGroupInfo, visible: Option<&[usize]>) -> bool {
        if !self.context.shows(group) {
            return false;
        }
        if !self.context.is_capabilities() {
            return true;
        }

        let kept = match visible {
            Some(positions) => positions.len(),
            None => self.visible_children(group).len(),
        };
        !self.policy.hides(group.layers.len(), kept)
    }

    /// Copy of `group` holding only its visible children, recursively
    fn prune(&self, group: &LayerGroupInfo, visible: &[usize]) -> LayerGroupInfo {
        let layers = visible
            .iter()
            .map(|&index| {
                let entry = &group.layers[index];
                match &entry.published {
                    PublishedInfo::Group(nested) => {
                        let nested_visible = self.visible_children(nested);
                        LayerGroupEntry {
                            published: PublishedInfo::Group(Box::new(
                                self.prune(nested, &nested_visible),
                            )),
                            style: entry.style.clone(),
                        }
                    }
                    PublishedInfo::Layer(_) => entry.clone(),
                }
            })
            .collect();

        LayerGroupInfo {
            layers,
            ..LayerGroupInfo::new(group.workspace.as_deref(), group.name.as_str())
                .with_advertised(group.advertised)
        }
    }
}

/// Layer group as seen by one principal
///
/// Reads reflect the visible children; edits through [`Self::layers_mut`]
/// write through to the full child list, leaving hidden children in place.
#[derive(Debug, Clone)]
pub struct SecuredLayerGroup {
    group: LayerGroupInfo,
    visible: Vec<usize>,
    filter: Arc<GroupFilter>,
}

impl SecuredLayerGroup {
    pub fn name(&self) -> &str {
        &self.group.name
    }

    pub fn workspace(&self) -> Option<&str> {
        self.group.workspace.as_deref()
    }

    pub fn is_advertised(&self) -> bool {
        self.group.advertised
    }

    /// Number of visible children
    pub fn layer_count(&self) -> usize {
        self.visible.len()
    }

    /// Visible children, in order
    pub fn layers(&self) -> impl Iterator<Item = &LayerGroupEntry> {
        self.visible.iter().map(|&index| &self.group.layers[index])
    }

    /// Live, write-through view over the visible children
    pub fn layers_mut(&mut self) -> FilteredList<'_, LayerGroupEntry> {
        FilteredList::new(&mut self.group.layers, &mut self.visible)
    }

    /// The visible child at `index` secured the same way, if it is a group
    pub fn nested_group(&self, index: usize) -> Option<SecuredLayerGroup> {
        let entry = &self.group.layers[*self.visible.get(index)?];
        match &entry.published {
            PublishedInfo::Group(nested) => Some(SecuredLayerGroup {
                visible: self.filter.visible_children(nested),
                group: nested.as_ref().clone(),
                filter: Arc::clone(&self.filter),
            }),
            PublishedInfo::Layer(_) => None,
        }
    }

    /// The group with hidden children removed at every nesting level
    pub fn into_visible(self) -> LayerGroupInfo {
        self.filter.prune(&self.group, &self.visible)
    }

    /// The full group, hidden children included
    pub fn into_delegate(self) -> LayerGroupInfo {
        self.group
    }
}

impl CatalogInfo for SecuredLayerGroup {
    fn kind(&self) -> ResourceKind {
        ResourceKind::LayerGroup
    }

    fn name(&self) -> &str {
        &self.group.name
    }

    fn workspace(&self) -> Option<&str> {
        self.group.workspace.as_deref()
    }

    fn is_advertised(&self) -> bool {
        self.group.advertised
    }
}

/// Catalog decorator enforcing access rules
pub struct SecureCatalog<C> {
    catalog: C,
    access: Arc<AccessManager>,
    policy: LayerGroupVisibilityPolicy,
}

impl<C: Catalog> SecureCatalog<C> {
    pub fn new(catalog: C, access: Arc<AccessManager>, policy: LayerGroupVisibilityPolicy) -> Self {
        Self {
            catalog,
            access,
            policy,
        }
    }

    /// The undecorated catalog
    pub fn inner(&self) -> &C {
        &self.catalog
    }

    pub fn access(&self) -> &AccessManager {
        &self.access
    }

    pub fn policy(&self) -> LayerGroupVisibilityPolicy {
        self.policy
    }

    pub fn workspaces(&self, principal: &Principal, _ctx: &RequestContext) -> Vec<WorkspaceInfo> {
        self.access
            .security_filter(principal, ResourceKind::Workspace)
            .filter(self.catalog.workspaces())
    }

    pub fn workspace_by_name(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        name: &str,
    ) -> Result<Option<WorkspaceInfo>, AccessDeniedError> {
        let Some(workspace) = self.catalog.workspace_by_name(name) else {
            return Ok(None);
        };
        if !self.readable(principal, &workspace) {
            return self.deny(&workspace, ctx);
        }
        Ok(Some(workspace))
    }

    pub fn layers(&self, principal: &Principal, ctx: &RequestContext) -> Vec<LayerInfo> {
        self.secure_layers(principal, ctx, self.catalog.layers())
    }

    pub fn layers_by_workspace(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        workspace: &str,
    ) -> Vec<LayerInfo> {
        self.secure_layers(principal, ctx, self.catalog.layers_by_workspace(workspace))
    }

    pub fn layer_by_name(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        workspace: &str,
        name: &str,
    ) -> Result<Option<LayerInfo>, AccessDeniedError> {
        let Some(layer) = self.catalog.layer_by_name(workspace, name) else {
            return Ok(None);
        };
        if !self.readable(principal, &layer) {
            return self.deny(&layer, ctx);
        }
        if !ctx.shows(&layer) {
            debug!(layer = %layer.prefixed_name(), "Hiding non-advertised layer");
            return Ok(None);
        }
        Ok(Some(layer))
    }

    pub fn layer_groups(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
    ) -> Vec<SecuredLayerGroup> {
        self.secure_groups(principal, ctx, self.catalog.layer_groups())
    }

    pub fn layer_groups_by_workspace(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        workspace: Option<&str>,
    ) -> Vec<SecuredLayerGroup> {
        self.secure_groups(
            principal,
            ctx,
            self.catalog.layer_groups_by_workspace(workspace),
        )
    }

    pub fn layer_group_by_name(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        workspace: Option<&str>,
        name: &str,
    ) -> Result<Option<SecuredLayerGroup>, AccessDeniedError> {
        let Some(group) = self.catalog.layer_group_by_name(workspace, name) else {
            return Ok(None);
        };
        if !self.readable(principal, &group) {
            return self.deny(&group, ctx);
        }
        let filter = self.group_filter(principal, ctx);
        Ok(Self::secure_group(&filter, group))
    }

    pub fn styles(&self, principal: &Principal, _ctx: &RequestContext) -> Vec<StyleInfo> {
        self.access
            .security_filter(principal, ResourceKind::Style)
            .filter(self.catalog.styles())
    }

    pub fn style_by_name(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        workspace: Option<&str>,
        name: &str,
    ) -> Result<Option<StyleInfo>, AccessDeniedError> {
        let Some(style) = self.catalog.style_by_name(workspace, name) else {
            return Ok(None);
        };
        if !self.readable(principal, &style) {
            return self.deny(&style, ctx);
        }
        Ok(Some(style))
    }

    fn readable(&self, principal: &Principal, resource: &dyn CatalogInfo) -> bool {
        self.access.can_access(principal, resource, AccessMode::Read)
    }

    fn deny<T>(
        &self,
        resource: &dyn CatalogInfo,
        ctx: &RequestContext,
    ) -> Result<Option<T>, AccessDeniedError> {
        let mode = self.access.catalog_mode();
        debug!(
            resource = %resource.prefixed_name(),
            kind = %resource.kind(),
            mode = %mode,
            "Denied direct lookup"
        );
        match mode {
            CatalogMode::Hide => Ok(None),
            CatalogMode::Mixed if ctx.is_capabilities() => Ok(None),
            CatalogMode::Challenge | CatalogMode::Mixed => {
                Err(AccessDeniedError::challenge(resource.prefixed_name()))
            }
        }
    }

    fn secure_layers(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        layers: Vec<LayerInfo>,
    ) -> Vec<LayerInfo> {
        let filter = self.access.security_filter(principal, ResourceKind::Layer);
        layers
            .into_iter()
            .filter(|layer| filter.accepts(layer) && ctx.shows(layer))
            .collect()
    }

    fn secure_groups(
        &self,
        principal: &Principal,
        ctx: &RequestContext,
        groups: Vec<LayerGroupInfo>,
    ) -> Vec<SecuredLayerGroup> {
        let filter = self.group_filter(principal, ctx);
        groups
            .into_iter()
            .filter(|group| filter.groups.accepts(group))
            .filter_map(|group| Self::secure_group(&filter, group))
            .collect()
    }

    fn group_filter(&self, principal: &Principal, ctx: &RequestContext) -> Arc<GroupFilter> {
        Arc::new(GroupFilter {
            layers: self.access.security_filter(principal, ResourceKind::Layer),
            groups: self
                .access
                .security_filter(principal, ResourceKind::LayerGroup),
            context: ctx.clone(),
            policy: self.policy,
        })
    }

    /// Apply the advertised flag and the visibility policy to a readable group
    fn secure_group(filter: &Arc<GroupFilter>, group: LayerGroupInfo) -> Option<SecuredLayerGroup> {
        let visible = filter.visible_children(&group);
        if !filter.shown(&group, Some(&visible)) {
            debug!(
                group = %group.prefixed_name(),
                children = group.layers.len(),
                visible = visible.len(),
                policy = %filter.policy,
                "Hiding layer group"
            );
            return None;
        }

        Some(SecuredLayerGroup {
            group,
            visible,
            filter: Arc::clone(filter),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_control::store::RuleStore;
    use crate::catalog::MemoryCatalog;
    use crate::config::SecurityConfig;

    fn secure(rules: &str, policy: LayerGroupVisibilityPolicy) -> SecureCatalog<MemoryCatalog> {
        let mut catalog = MemoryCatalog::new();
        catalog
            .add_workspace("topp")
            .add_workspace("nurc")
            .add_layer(LayerInfo::new("topp", "states"))
            .add_layer(LayerInfo::new("topp", "roads").with_advertised(false))
            .add_layer(LayerInfo::new("nurc", "dem"))
            .add_layer_group(
                LayerGroupInfo::new(Some("topp"), "tasmania")
                    .with_layer(LayerInfo::new("topp", "states"))
                    .with_layer(LayerInfo::new("topp", "roads").with_advertised(false)),
            );

        let store = RuleStore::from_properties_str_strict(rules).unwrap();
        let access = AccessManager::new(store, &SecurityConfig::default()).unwrap();
        SecureCatalog::new(catalog, Arc::new(access), policy)
    }

    #[test]
    fn test_listing_hides_unreadable() {
        let catalog = secure(
            "*.*.r=*\nnurc.*.r=ROLE_NURC\n",
            LayerGroupVisibilityPolicy::HideEmpty,
        );
        let anonymous = Principal::anonymous();
        let ctx = RequestContext::new();

        let names: Vec<_> = catalog
            .layers(&anonymous, &ctx)
            .into_iter()
            .map(|l| l.prefixed_name())
            .collect();
        assert_eq!(names, vec!["topp:states", "topp:roads"]);
        assert_eq!(catalog.workspaces(&anonymous, &ctx).len(), 1);
    }

    #[test]
    fn test_non_advertised_layer_in_capabilities() {
        let catalog = secure("*.*.r=*\n", LayerGroupVisibilityPolicy::HideEmpty);
        let anonymous = Principal::anonymous();

        let caps = RequestContext::capabilities();
        assert_eq!(catalog.layers(&anonymous, &caps).len(), 2);
        assert_eq!(
            catalog.layer_by_name(&anonymous, &caps, "topp", "roads"),
            Ok(None)
        );

        let direct = RequestContext::capabilities().with_virtual_service("topp", Some("roads"));
        assert!(
            catalog
                .layer_by_name(&anonymous, &direct, "topp", "roads")
                .unwrap()
                .is_some()
        );

        let plain = RequestContext::new();
        assert!(
            catalog
                .layer_by_name(&anonymous, &plain, "topp", "roads")
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_group_children_pass_through_outside_capabilities() {
        let catalog = secure(
            "*.*.r=*\ntopp.states.r=ROLE_A\n",
            LayerGroupVisibilityPolicy::HideEmpty,
        );
        let group = catalog
            .layer_group_by_name(
                &Principal::anonymous(),
                &RequestContext::new(),
                Some("topp"),
                "tasmania",
            )
            .unwrap()
            .unwrap();
        assert_eq!(group.layer_count(), 2);
    }

    #[test]
    fn test_context_names_layer() {
        let ctx = RequestContext::new().with_virtual_service("topp", Some("states"));
        assert!(ctx.names(&LayerInfo::new("topp", "states")));
        assert!(!ctx.names(&LayerInfo::new("nurc", "states")));
        assert_eq!(ctx.local_workspace(), Some("topp"));
        assert!(!ctx.is_capabilities());
    }
}
