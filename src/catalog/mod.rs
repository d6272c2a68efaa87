//! Catalog model consumed by the access-control engine
//!
//! The engine only needs stable identity (name, workspace, kind) and the
//! advertised flag of each resource, so the model is a set of plain
//! read-only values behind the [`Catalog`] trait.

pub mod filtered_list;
pub mod memory;
pub mod secure;

pub use filtered_list::FilteredList;
pub use memory::MemoryCatalog;
pub use secure::{RequestContext, SecureCatalog, SecuredLayerGroup};

use serde::Serialize;
use std::fmt;

/// Kind of catalog resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Workspace,
    Layer,
    LayerGroup,
    Style,
}

impl ResourceKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Workspace => "workspace",
            ResourceKind::Layer => "layer",
            ResourceKind::LayerGroup => "layer_group",
            ResourceKind::Style => "style",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only identity of a catalog resource
pub trait CatalogInfo {
    fn kind(&self) -> ResourceKind;

    fn name(&self) -> &str;

    /// Owning workspace; `None` for global groups and styles, or when the
    /// workspace could not be resolved
    fn workspace(&self) -> Option<&str>;

    fn is_advertised(&self) -> bool {
        true
    }

    /// `workspace:name`, or the bare name when there is no workspace
    fn prefixed_name(&self) -> String {
        match self.workspace() {
            Some(ws) => format!("{}:{}", ws, self.name()),
            None => self.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceInfo {
    pub name: String,
}

impl WorkspaceInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl CatalogInfo for WorkspaceInfo {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Workspace
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn workspace(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn prefixed_name(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    pub name: String,
    pub workspace: Option<String>,
    pub advertised: bool,
}

impl LayerInfo {
    pub fn new(workspace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workspace: Some(workspace.into()),
            advertised: true,
        }
    }

    pub fn with_advertised(mut self, advertised: bool) -> Self {
        self.advertised = advertised;
        self
    }
}

impl CatalogInfo for LayerInfo {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Layer
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn workspace(&self) -> Option<&str> {
        self.workspace.as_deref()
    }

    fn is_advertised(&self) -> bool {
        self.advertised
    }
}

/// A layer or a nested layer group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishedInfo {
    Layer(LayerInfo),
    Group(Box<LayerGroupInfo>),
}

impl CatalogInfo for PublishedInfo {
    fn kind(&self) -> ResourceKind {
        match self {
            PublishedInfo::Layer(l) => l.kind(),
            PublishedInfo::Group(g) => g.kind(),
        }
    }

    fn name(&self) -> &str {
        match self {
            PublishedInfo::Layer(l) => l.name(),
            PublishedInfo::Group(g) => g.name(),
        }
    }

    fn workspace(&self) -> Option<&str> {
        match self {
            PublishedInfo::Layer(l) => l.workspace(),
            PublishedInfo::Group(g) => g.workspace(),
        }
    }

    fn is_advertised(&self) -> bool {
        match self {
            PublishedInfo::Layer(l) => l.is_advertised(),
            PublishedInfo::Group(g) => g.is_advertised(),
        }
    }
}

/// One child of a layer group, with the style it is drawn with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerGroupEntry {
    pub published: PublishedInfo,
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerGroupInfo {
    pub name: String,
    pub workspace: Option<String>,
    pub advertised: bool,
    pub layers: Vec<LayerGroupEntry>,
}

impl LayerGroupInfo {
    pub fn new(workspace: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workspace: workspace.map(str::to_string),
            advertised: true,
            layers: Vec::new(),
        }
    }

    pub fn with_advertised(mut self, advertised: bool) -> Self {
        self.advertised = advertised;
        self
    }

    pub fn with_layer(mut self, layer: LayerInfo) -> Self {
        self.layers.push(LayerGroupEntry {
            published: PublishedInfo::Layer(layer),
            style: None,
        });
        self
    }

    pub fn with_group(mut self, group: LayerGroupInfo) -> Self {
        self.layers.push(LayerGroupEntry {
            published: PublishedInfo::Group(Box::new(group)),
            style: None,
        });
        self
    }
}

impl CatalogInfo for LayerGroupInfo {
    fn kind(&self) -> ResourceKind {
        ResourceKind::LayerGroup
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn workspace(&self) -> Option<&str> {
        self.workspace.as_deref()
    }

    fn is_advertised(&self) -> bool {
        self.advertised
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleInfo {
    pub name: String,
    pub workspace: Option<String>,
}

impl StyleInfo {
    pub fn new(workspace: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workspace: workspace.map(str::to_string),
        }
    }
}

impl CatalogInfo for StyleInfo {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Style
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn workspace(&self) -> Option<&str> {
        self.workspace.as_deref()
    }
}

/// Enumeration and lookup of catalog resources
pub trait Catalog: Send + Sync {
    fn workspaces(&self) -> Vec<WorkspaceInfo>;

    fn layers(&self) -> Vec<LayerInfo>;

    fn layer_groups(&self) -> Vec<LayerGroupInfo>;

    fn styles(&self) -> Vec<StyleInfo>;

    fn workspace_by_name(&self, name: &str) -> Option<WorkspaceInfo> {
        self.workspaces().into_iter().find(|w| w.name == name)
    }

    fn layer_by_name(&self, workspace: &str, name: &str) -> Option<LayerInfo> {
        self.layers()
            .into_iter()
            .find(|l| l.name == name && l.workspace.as_deref() == Some(workspace))
    }

    fn layer_group_by_name(&self, workspace: Option<&str>, name: &str) -> Option<LayerGroupInfo> {
        self.layer_groups()
            .into_iter()
            .find(|g| g.name == name && g.workspace.as_deref() == workspace)
    }

    fn style_by_name(&self, workspace: Option<&str>, name: &str) -> Option<StyleInfo> {
        self.styles()
            .into_iter()
            .find(|s| s.name == name && s.workspace.as_deref() == workspace)
    }

    fn layers_by_workspace(&self, workspace: &str) -> Vec<LayerInfo> {
        self.layers()
            .into_iter()
            .filter(|l| l.workspace.as_deref() == Some(workspace))
            .collect()
    }

    fn layer_groups_by_workspace(&self, workspace: Option<&str>) -> Vec<LayerGroupInfo> {
        self.layer_groups()
            .into_iter()
            .filter(|g| g.workspace.as_deref() == workspace)
            .collect()
    }

    fn styles_by_workspace(&self, workspace: Option<&str>) -> Vec<StyleInfo> {
        self.styles()
            .into_iter()
            .filter(|s| s.workspace.as_deref() == workspace)
            .collect()
    }
}
