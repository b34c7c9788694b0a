//! ConfigRegistry: class definitions by name and lazily merged config maps.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::class::hooks::HookSet;
use crate::error::{Result, RuntimeError};

use super::definition::ClassDefinition;
use super::descriptor::{ConfigDescriptor, MergedConfigMap};

/// Stores class definitions and caches their merged config maps.
///
/// Ancestor chains are append-only: once a class has been merged its cached
/// map stays valid, since registered definitions are never mutated.
#[derive(Default)]
pub struct ConfigRegistry {
    classes: IndexMap<String, Rc<ClassDefinition>>,
    merged: HashMap<String, Rc<MergedConfigMap>>,
}

impl ConfigRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class definition.
    ///
    /// Fails with [`RuntimeError::DuplicateClassName`] if the name is taken;
    /// the first registration is left untouched.
    pub fn register(&mut self, definition: ClassDefinition) -> Result<()> {
        let name = definition.name().to_owned();
        if self.classes.contains_key(&name) {
            return Err(RuntimeError::DuplicateClassName(name));
        }
        debug!(class = %name, ancestor = ?definition.ancestor(), "registered class");
        self.classes.insert(name, Rc::new(definition));
        Ok(())
    }

    /// Drop a registration that never produced a merged map.
    pub(crate) fn unregister_unmerged(&mut self, name: &str) {
        if !self.merged.contains_key(name) {
            self.classes.shift_remove(name);
        }
    }

    /// The definition registered under `name`.
    pub fn lookup(&self, name: &str) -> Result<&Rc<ClassDefinition>> {
        self.classes
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownClass(name.to_owned()))
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Registered class names, in registration order.
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    /// Merged config map for `name`, computed on first request.
    pub fn merge(&mut self, name: &str) -> Result<Rc<MergedConfigMap>> {
        self.merge_guarded(name, &mut Vec::new())
    }

    fn merge_guarded(
        &mut self,
        name: &str,
        visiting: &mut Vec<String>,
    ) -> Result<Rc<MergedConfigMap>> {
        if let Some(cached) = self.merged.get(name) {
            return Ok(Rc::clone(cached));
        }
        if visiting.iter().any(|v| v == name) {
            return Err(RuntimeError::CyclicAncestry(name.to_owned()));
        }
        let definition = Rc::clone(self.lookup(name)?);

        visiting.push(name.to_owned());
        let ancestor = match definition.ancestor() {
            Some(ancestor) => Some(self.merge_guarded(ancestor, visiting)?),
            None => None,
        };
        visiting.pop();

        let merged = Rc::new(merge_class(ancestor.as_deref(), &definition)?);
        trace!(class = name, configs = ?merged.names(), "merged config map");
        self.merged.insert(name.to_owned(), Rc::clone(&merged));
        Ok(merged)
    }

    /// Definitions from `name` up to the root, most-derived first.
    pub fn chain(&self, name: &str) -> Result<Vec<Rc<ClassDefinition>>> {
        let mut chain = Vec::new();
        let mut current = Some(name.to_owned());
        while let Some(class) = current {
            if chain.len() > self.classes.len() {
                return Err(RuntimeError::CyclicAncestry(name.to_owned()));
            }
            let definition = Rc::clone(self.lookup(&class)?);
            current = definition.ancestor().map(str::to_owned);
            chain.push(definition);
        }
        Ok(chain)
    }
}

/// Lay `definition`'s own configs and hooks over its ancestor's merged map.
fn merge_class(
    ancestor: Option<&MergedConfigMap>,
    definition: &ClassDefinition,
) -> Result<MergedConfigMap> {
    let mut entries = ancestor.map(|m| m.entries.clone()).unwrap_or_default();

    for decl in definition.own_configs().iter() {
        let (base_value, hooks) = match entries.shift_remove(&decl.name) {
            Some(inherited) => (inherited.base_value, inherited.hooks),
            None => (decl.default.clone(), HookSet::default()),
        };
        entries.insert(
            decl.name.clone(),
            ConfigDescriptor {
                name: decl.name.clone(),
                reactive: decl.reactive,
                default_value: decl.default.clone(),
                base_value,
                declared_by: definition.name().to_owned(),
                hooks,
            },
        );
    }

    for (config, own) in definition.hooks() {
        let descriptor =
            entries
                .get_mut(config)
                .ok_or_else(|| RuntimeError::UnknownConfig {
                    class: definition.name().to_owned(),
                    config: config.clone(),
                })?;
        descriptor.hooks = own.inherit(&descriptor.hooks);
    }

    // plain configs skip hook dispatch, so a hook on one would never run
    if let Some(plain) = entries.values().find(|d| !d.reactive && !d.hooks.is_empty()) {
        return Err(RuntimeError::InvalidValue {
            config: plain.name.clone(),
            message: format!(
                "hooks need a reactive config; declare it as `{}_` in `{}`",
                plain.name,
                definition.name()
            ),
        });
    }

    Ok(MergedConfigMap { entries })
}
