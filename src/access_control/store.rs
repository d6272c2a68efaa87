//! Rule store
//!
//! Ordered, mutable collection of [`Rule`]s plus the global catalog mode.
//! Insertion order is kept so serialization is deterministic; it has no
//! influence on evaluation.

use crate::access_control::parser::{parse_rule, read_properties, write_properties};
use crate::access_control::rule::{ANY, RoleSet, Rule};
use crate::access_control::types::{AccessMode, CatalogMode};
use crate::catalog::Catalog;
use crate::config::RulesConfig;
use crate::error::{RuleError, RuleResult};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Reserved properties key holding the catalog mode
pub const MODE_KEY: &str = "mode";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleStore {
    rules: Vec<Rule>,
    mode: CatalogMode,
}

impl RuleStore {
    /// Create an empty store in HIDE mode
    pub fn new() -> Self {
        Self::default()
    }

    /// Store granting read and write on everything to everybody
    pub fn with_defaults() -> Self {
        let mut store = Self::new();
        store.add_rule(Rule::new(ANY, ANY, AccessMode::Read, RoleSet::everybody()));
        store.add_rule(Rule::new(ANY, ANY, AccessMode::Write, RoleSet::everybody()));
        store
    }

    /// Build a store from `(key, value)` entries, skipping entries that do
    /// not parse. Rejected entries are returned next to the store.
    pub fn load_entries<I, K, V>(entries: I) -> (Self, Vec<RuleError>)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut store = Self::new();
        let mut rejected = Vec::new();

        for (key, value) in entries {
            let (key, value) = (key.as_ref(), value.as_ref());

            if key.trim() == MODE_KEY {
                match CatalogMode::try_parse(value) {
                    Some(mode) => store.mode = mode,
                    None => warn!(value, "Unknown catalog mode, keeping {}", store.mode),
                }
                continue;
            }

            match parse_rule(key, value) {
                Ok(rule) => {
                    if !store.add_rule(rule) {
                        warn!(key, "Duplicate rule key ignored, keeping the first definition");
                    }
                }
                Err(e) => {
                    warn!(key, error = %e, "Rejected access rule");
                    rejected.push(e);
                }
            }
        }

        (store, rejected)
    }

    /// Build a store from properties text, skipping malformed rules
    pub fn from_properties_str(text: &str) -> Self {
        Self::load_entries(read_properties(text)).0
    }

    /// Build a store from properties text, failing on the first malformed rule
    pub fn from_properties_str_strict(text: &str) -> RuleResult<Self> {
        let (store, mut rejected) = Self::load_entries(read_properties(text));
        match rejected.drain(..).next() {
            Some(err) => Err(err),
            None => Ok(store),
        }
    }

    /// Load a properties file
    pub fn load(path: impl AsRef<Path>) -> RuleResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let store = Self::from_properties_str(&text);
        debug!(
            path = %path.as_ref().display(),
            rules = store.len(),
            mode = %store.mode,
            "Loaded access rules"
        );
        Ok(store)
    }

    /// Build the store described by the `[rules]` configuration section
    ///
    /// The rules file is read first and inline entries are added after it,
    /// so a file rule wins over an inline rule with the same key. Inline
    /// entries must all parse. An empty section yields [`Self::with_defaults`].
    pub fn from_config(config: &RulesConfig) -> RuleResult<Self> {
        if config.is_empty() {
            debug!("No access rules configured, using open defaults");
            return Ok(Self::with_defaults());
        }

        let mut store = match &config.path {
            Some(path) => Self::load(&*shellexpand::tilde(path))?,
            None => Self::new(),
        };

        let inline = Self::from_properties_str_strict(&config.entries.join("\n"))?;
        if inline.mode != CatalogMode::default() {
            store.mode = inline.mode;
        }
        for rule in inline.rules {
            if !store.add_rule(rule) {
                warn!("Inline rule shadowed by a rule from the rules file");
            }
        }

        Ok(store)
    }

    pub fn mode(&self) -> CatalogMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: CatalogMode) {
        self.mode = mode;
    }

    /// Add a rule. Returns `false` and leaves the store untouched if a rule
    /// with the same `(root, layer, mode)` key is already present.
    pub fn add_rule(&mut self, rule: Rule) -> bool {
        let key = rule.key();
        if self.rules.iter().any(|r| r.key() == key) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    /// Remove a rule equal to `rule` in every field. Returns `false` if absent.
    pub fn remove_rule(&mut self, rule: &Rule) -> bool {
        match self.rules.iter().position(|r| r == rule) {
            Some(index) => {
                self.rules.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rules whose role set names `role` exactly. The wildcard never matches.
    pub fn rules_associated_with_role(&self, role: &str) -> Vec<&Rule> {
        self.rules
            .iter()
            .filter(|r| r.roles().contains_role(role))
            .collect()
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Serialize to a key/value mapping, the catalog mode included
    pub fn to_properties(&self) -> BTreeMap<String, String> {
        let mut props: BTreeMap<String, String> = self
            .rules
            .iter()
            .map(|r| (r.property_key(), r.property_value()))
            .collect();
        props.insert(MODE_KEY.to_string(), self.mode.to_string());
        props
    }

    /// Serialize to properties text: the mode first, then rules in insertion order
    pub fn to_properties_string(&self) -> String {
        let entries: Vec<(String, String)> = self
            .rules
            .iter()
            .map(|r| (r.property_key(), r.property_value()))
            .collect();

        let mode = self.mode.to_string();
        write_properties(
            std::iter::once((MODE_KEY, mode.as_str()))
                .chain(entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
        )
    }

    /// Rules naming a workspace, layer or global group that does not exist
    /// in `catalog`. They stay in the store; the tree simply never reaches them.
    pub fn unresolved_rules<'a>(&'a self, catalog: &dyn Catalog) -> Vec<&'a Rule> {
        self.rules
            .iter()
            .filter(|rule| !Self::resolves(rule, catalog))
            .collect()
    }

    fn resolves(rule: &Rule, catalog: &dyn Catalog) -> bool {
        let root = rule.root();
        match rule.layer() {
            None => root == ANY || catalog.layer_group_by_name(None, root).is_some(),
            Some(ANY) => root == ANY || catalog.workspace_by_name(root).is_some(),
            Some(layer) => {
                root != ANY
                    && catalog.workspace_by_name(root).is_some()
                    && (catalog.layer_by_name(root, layer).is_some()
                        || catalog.layer_group_by_name(Some(root), layer).is_some())
            }
        }
    }
}
