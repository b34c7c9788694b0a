//! Class definitions: name, ancestor, own configs and hooks.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::class::hooks::{DestroyHook, HookSet};
use crate::error::Result;
use crate::instance::InstanceId;
use crate::runtime::Runtime;
use crate::value::Value;

use super::descriptor::{public_name, ConfigMap};

/// Declarative description of a class. Immutable once registered.
///
/// ```ignore
/// let def = ClassDefinition::new("menu.List")
///     .extends("component.Base")
///     .configs(ConfigMap::new().declare("floating_", false))
///     .after_set("floating", |rt, id, value, _old| { /* ... */ Ok(()) });
/// ```
#[derive(Clone)]
pub struct ClassDefinition {
    name: String,
    ancestor: Option<String>,
    configs: ConfigMap,
    hooks: IndexMap<String, HookSet>,
    on_destroy: Option<DestroyHook>,
}

impl ClassDefinition {
    /// Start a definition with no ancestor, configs or hooks.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ancestor: None,
            configs: ConfigMap::new(),
            hooks: IndexMap::new(),
            on_destroy: None,
        }
    }

    /// Set the ancestor class (builder).
    pub fn extends(mut self, ancestor: impl Into<String>) -> Self {
        self.ancestor = Some(ancestor.into());
        self
    }

    /// Replace the own config map (builder).
    pub fn configs(mut self, configs: ConfigMap) -> Self {
        self.configs = configs;
        self
    }

    /// Declare a single config (builder).
    pub fn config(mut self, raw: &str, default: impl Into<Value>) -> Self {
        self.configs.insert(raw, default);
        self
    }

    /// Hook served in place of the stored value on every read.
    pub fn before_get(
        mut self,
        config: &str,
        hook: impl Fn(&Runtime, InstanceId, &Value) -> Value + 'static,
    ) -> Self {
        self.hook_slot(config).before_get = Some(Rc::new(hook));
        self
    }

    /// Hook that transforms an incoming value before comparison and storage.
    pub fn before_set(
        mut self,
        config: &str,
        hook: impl Fn(&mut Runtime, InstanceId, Value, &Value) -> Result<Value> + 'static,
    ) -> Self {
        self.hook_slot(config).before_set = Some(Rc::new(hook));
        self
    }

    /// Hook that reacts to a stored change: `(runtime, id, value, old_value)`.
    pub fn after_set(
        mut self,
        config: &str,
        hook: impl Fn(&mut Runtime, InstanceId, &Value, &Value) -> Result<()> + 'static,
    ) -> Self {
        self.hook_slot(config).after_set = Some(Rc::new(hook));
        self
    }

    /// Teardown step run before owned children are destroyed.
    ///
    /// Runs most-derived class first, then each ancestor's.
    pub fn on_destroy(
        mut self,
        hook: impl Fn(&mut Runtime, InstanceId) -> Result<()> + 'static,
    ) -> Self {
        self.on_destroy = Some(Rc::new(hook));
        self
    }

    fn hook_slot(&mut self, config: &str) -> &mut HookSet {
        self.hooks
            .entry(public_name(config).to_owned())
            .or_default()
    }

    /// Registered class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the class this one extends.
    pub fn ancestor(&self) -> Option<&str> {
        self.ancestor.as_deref()
    }

    /// Configs declared by this class itself, ancestors excluded.
    pub fn own_configs(&self) -> &ConfigMap {
        &self.configs
    }

    pub(crate) fn hooks(&self) -> &IndexMap<String, HookSet> {
        &self.hooks
    }

    pub(crate) fn destroy_hook(&self) -> Option<&DestroyHook> {
        self.on_destroy.as_ref()
    }
}

impl fmt::Debug for ClassDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDefinition")
            .field("name", &self.name)
            .field("ancestor", &self.ancestor)
            .field("configs", &self.configs)
            .field("hooks", &self.hooks)
            .field("on_destroy", &self.on_destroy.is_some())
            .finish()
    }
}
