//! In-memory catalog

use crate::catalog::{Catalog, LayerGroupInfo, LayerInfo, StyleInfo, WorkspaceInfo};
use serde::Deserialize;

/// Catalog held entirely in memory, used by the CLI and by tests
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    workspaces: Vec<WorkspaceInfo>,
    layers: Vec<LayerInfo>,
    layer_groups: Vec<LayerGroupInfo>,
    styles: Vec<StyleInfo>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_workspace(&mut self, name: &str) -> &mut Self {
        self.workspaces.push(WorkspaceInfo::new(name));
        self
    }

    pub fn add_layer(&mut self, layer: LayerInfo) -> &mut Self {
        self.layers.push(layer);
        self
    }

    pub fn add_layer_group(&mut self, group: LayerGroupInfo) -> &mut Self {
        self.layer_groups.push(group);
        self
    }

    pub fn add_style(&mut self, style: StyleInfo) -> &mut Self {
        self.styles.push(style);
        self
    }

    /// Build a catalog from a compact listing: workspace names mapped to
    /// their layer names
    pub fn from_listing(listing: &CatalogListing) -> Self {
        let mut catalog = Self::new();
        for (workspace, layers) in &listing.workspaces {
            catalog.add_workspace(workspace);
            for layer in layers {
                catalog.add_layer(LayerInfo::new(workspace.as_str(), layer.as_str()));
            }
        }
        for group in &listing.global_groups {
            catalog.add_layer_group(LayerGroupInfo::new(None, group.as_str()));
        }
        catalog
    }
}

/// Serialized form accepted by [`MemoryCatalog::from_listing`]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogListing {
    pub workspaces: std::collections::BTreeMap<String, Vec<String>>,
    pub global_groups: Vec<String>,
}

impl Catalog for MemoryCatalog {
    fn workspaces(&self) -> Vec<WorkspaceInfo> {
        self.workspaces.clone()
    }

    fn layers(&self) -> Vec<LayerInfo> {
        self.layers.clone()
    }

    fn layer_groups(&self) -> Vec<LayerGroupInfo> {
        self.layer_groups.clone()
    }

    fn styles(&self) -> Vec<StyleInfo> {
        self.styles.clone()
    }
}
