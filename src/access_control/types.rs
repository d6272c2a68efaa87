//! Access control types
//!
//! Core enums shared by the rule store, the secure tree and the catalog decorator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Access mode a rule grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Read access (listing, rendering, describing)
    Read,
    /// Write access (editing, transactions)
    Write,
}

impl AccessMode {
    /// Get the single-letter code used in rule keys
    pub const fn letter(&self) -> &'static str {
        match self {
            AccessMode::Read => "r",
            AccessMode::Write => "w",
        }
    }

    /// Parse a rule key mode letter. Only `r` and `w` are recognized.
    pub fn from_letter(s: &str) -> Option<Self> {
        match s {
            "r" => Some(AccessMode::Read),
            "w" => Some(AccessMode::Write),
            _ => None,
        }
    }

    /// Parse a human-readable mode name (`read`, `write`, or the letter form)
    pub fn try_parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "r" | "read" => Some(AccessMode::Read),
            "w" | "write" => Some(AccessMode::Write),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Read => "read",
            AccessMode::Write => "write",
        }
    }

    /// Get all modes
    pub fn all() -> &'static [AccessMode] {
        &[AccessMode::Read, AccessMode::Write]
    }

    pub(crate) const fn index(&self) -> usize {
        match self {
            AccessMode::Read => 0,
            AccessMode::Write => 1,
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the catalog reacts to resources a principal cannot read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogMode {
    /// Pretend the resource does not exist
    #[default]
    #[serde(alias = "HIDE")]
    Hide,
    /// Ask for authentication when the resource is accessed directly
    #[serde(alias = "CHALLENGE")]
    Challenge,
    /// Hide in capabilities listings, challenge on direct access
    #[serde(alias = "MIXED")]
    Mixed,
}

impl CatalogMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CatalogMode::Hide => "HIDE",
            CatalogMode::Challenge => "CHALLENGE",
            CatalogMode::Mixed => "MIXED",
        }
    }

    /// Parse a catalog mode, case-insensitively
    pub fn try_parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIDE" => Some(CatalogMode::Hide),
            "CHALLENGE" => Some(CatalogMode::Challenge),
            "MIXED" => Some(CatalogMode::Mixed),
            _ => None,
        }
    }
}

impl fmt::Display for CatalogMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decides whether a layer group whose children were filtered is still shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerGroupVisibilityPolicy {
    /// Never hide a readable group, whatever happens to its children
    HideNever,
    /// Hide the group when no child survives filtering
    #[default]
    HideEmpty,
    /// Hide the group when it had children and all of them were filtered away
    HideIfAllHidden,
}

impl LayerGroupVisibilityPolicy {
    /// Whether a group should be hidden given its child counts before and after filtering
    pub const fn hides(&self, original: usize, filtered: usize) -> bool {
        match self {
            LayerGroupVisibilityPolicy::HideNever => false,
            LayerGroupVisibilityPolicy::HideEmpty => filtered == 0,
            LayerGroupVisibilityPolicy::HideIfAllHidden => filtered == 0 && original > 0,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            LayerGroupVisibilityPolicy::HideNever => "hide_never",
            LayerGroupVisibilityPolicy::HideEmpty => "hide_empty",
            LayerGroupVisibilityPolicy::HideIfAllHidden => "hide_if_all_hidden",
        }
    }
}

impl fmt::Display for LayerGroupVisibilityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Access a principal has on a single resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessLimits {
    /// Catalog mode in effect when the resource is not readable
    pub mode: CatalogMode,
    pub readable: bool,
    pub writable: bool,
}

impl AccessLimits {
    /// Limits granting nothing
    pub const fn denied(mode: CatalogMode) -> Self {
        Self {
            mode,
            readable: false,
            writable: false,
        }
    }

    /// Limits granting everything
    pub const fn full(mode: CatalogMode) -> Self {
        Self {
            mode,
            readable: true,
            writable: true,
        }
    }

    pub const fn allows(&self, mode: AccessMode) -> bool {
        match mode {
            AccessMode::Read => self.readable,
            AccessMode::Write => self.writable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_letter_roundtrip() {
        for mode in AccessMode::all() {
            assert_eq!(AccessMode::from_letter(mode.letter()), Some(*mode));
        }
        assert_eq!(AccessMode::from_letter("a"), None);
        assert_eq!(AccessMode::from_letter("R"), None);
    }

    #[test]
    fn test_catalog_mode_parse() {
        assert_eq!(CatalogMode::try_parse("hide"), Some(CatalogMode::Hide));
        assert_eq!(
            CatalogMode::try_parse(" CHALLENGE "),
            Some(CatalogMode::Challenge)
        );
        assert_eq!(CatalogMode::try_parse("Mixed"), Some(CatalogMode::Mixed));
        assert_eq!(CatalogMode::try_parse("open"), None);
    }

    #[test]
    fn test_visibility_policy() {
        use LayerGroupVisibilityPolicy::*;
        assert!(!HideNever.hides(2, 0));
        assert!(HideEmpty.hides(2, 0));
        assert!(HideEmpty.hides(0, 0));
        assert!(!HideEmpty.hides(2, 1));
        assert!(HideIfAllHidden.hides(2, 0));
        assert!(!HideIfAllHidden.hides(0, 0));
    }

    #[test]
    fn test_deserialize_policy() {
        let policy: LayerGroupVisibilityPolicy =
            serde_json::from_str(r#""hide_if_all_hidden""#).unwrap();
        assert_eq!(policy, LayerGroupVisibilityPolicy::HideIfAllHidden);
    }
}
