//! Config declarations and merged descriptors.
//!
//! A class declares its own configs in a [`ConfigMap`]. Walking the ancestor
//! chain produces a [`MergedConfigMap`] of [`ConfigDescriptor`]s keyed by the
//! public name.

use indexmap::IndexMap;

use crate::class::hooks::HookSet;
use crate::value::Value;

/// Trailing marker that makes a declared config reactive (`floating_`).
pub const REACTIVE_MARKER: char = '_';

/// Split a declared name into its public name and reactive flag.
///
/// Only a single trailing marker is stripped; a bare `"_"` is not reactive.
pub fn parse_declared_name(raw: &str) -> (&str, bool) {
    match raw.strip_suffix(REACTIVE_MARKER) {
        Some(public) if !public.is_empty() => (public, true),
        _ => (raw, false),
    }
}

/// Public name for a declared or public config name.
pub fn public_name(raw: &str) -> &str {
    parse_declared_name(raw).0
}

// ---------------------------------------------------------------------------
// ConfigMap
// ---------------------------------------------------------------------------

/// One entry of a class's own config map.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDecl {
    /// Public name (marker stripped).
    pub name: String,
    pub reactive: bool,
    pub default: Value,
}

/// A class's own declarative config map, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigMap {
    entries: Vec<ConfigDecl>,
}

impl ConfigMap {
    /// Create an empty config map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a config (builder). `raw` may carry the reactive marker.
    pub fn declare(mut self, raw: &str, default: impl Into<Value>) -> Self {
        self.insert(raw, default);
        self
    }

    /// Declare a config in place.
    ///
    /// Redeclaring a name inside the same map replaces the earlier entry but
    /// keeps its position.
    pub fn insert(&mut self, raw: &str, default: impl Into<Value>) {
        let (name, reactive) = parse_declared_name(raw);
        let decl = ConfigDecl {
            name: name.to_owned(),
            reactive,
            default: default.into(),
        };
        match self.entries.iter_mut().find(|d| d.name == decl.name) {
            Some(existing) => *existing = decl,
            None => self.entries.push(decl),
        }
    }

    /// Declaration for a public (stripped) name.
    pub fn get(&self, name: &str) -> Option<&ConfigDecl> {
        self.entries.iter().find(|d| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigDecl> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// MergedConfigMap
// ---------------------------------------------------------------------------

/// A config after ancestor-chain merging.
#[derive(Debug, Clone)]
pub struct ConfigDescriptor {
    pub name: String,
    pub reactive: bool,
    /// Most-derived default.
    pub default_value: Value,
    /// Default of the root-most declaration of this name.
    pub base_value: Value,
    /// Class whose declaration won.
    pub declared_by: String,
    pub hooks: HookSet,
}

/// Ordered, override-resolved configs visible to a class.
#[derive(Debug, Clone, Default)]
pub struct MergedConfigMap {
    pub(crate) entries: IndexMap<String, ConfigDescriptor>,
}

impl MergedConfigMap {
    /// Descriptor for a public name.
    pub fn get(&self, name: &str) -> Option<&ConfigDescriptor> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Position of `name` in declaration order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.get_index_of(name)
    }

    /// Descriptors in merged declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ConfigDescriptor> {
        self.entries.values()
    }

    /// Public names in merged declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
