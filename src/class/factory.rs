//! ClassFactory: one-time registration that makes a class instantiable.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, error};

use crate::config::{ClassDefinition, ConfigRegistry, MergedConfigMap};
use crate::error::{Result, RuntimeError};

use super::accessor::{Accessor, AccessorSynthesizer, AccessorTable};
use super::hooks::DestroyHook;

/// A registered class, frozen and ready to instantiate.
pub struct ClassEntry {
    name: String,
    merged: Rc<MergedConfigMap>,
    accessors: AccessorTable,
    destroy_hooks: Vec<DestroyHook>,
}

impl ClassEntry {
    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Merged config map the accessors were built from.
    pub fn merged(&self) -> &MergedConfigMap {
        &self.merged
    }

    /// Synthesized accessor table.
    pub fn accessors(&self) -> &AccessorTable {
        &self.accessors
    }

    /// Accessor for `config`, or [`RuntimeError::UnknownConfig`].
    pub fn accessor(&self, config: &str) -> Result<&Accessor> {
        self.accessors
            .get(config)
            .ok_or_else(|| RuntimeError::UnknownConfig {
                class: self.name.clone(),
                config: config.to_owned(),
            })
    }

    /// `on_destroy` hooks, most-derived first.
    pub(crate) fn destroy_hooks(&self) -> &[DestroyHook] {
        &self.destroy_hooks
    }
}

impl fmt::Debug for ClassEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassEntry")
            .field("name", &self.name)
            .field("configs", &self.merged.names())
            .field("destroy_hooks", &self.destroy_hooks.len())
            .finish()
    }
}

/// Caches synthesized accessor tables per class name.
#[derive(Default)]
pub struct ClassFactory {
    entries: HashMap<String, Rc<ClassEntry>>,
}

impl ClassFactory {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register, merge and synthesize a class.
    ///
    /// On a merge failure the registration is rolled back so the definition
    /// can be corrected and applied again.
    pub fn try_apply_class_config(
        &mut self,
        registry: &mut ConfigRegistry,
        definition: ClassDefinition,
    ) -> Result<Rc<ClassEntry>> {
        let name = definition.name().to_owned();
        registry.register(definition)?;

        let built = Self::build_entry(registry, &name);
        let entry = match built {
            Ok(entry) => Rc::new(entry),
            Err(err) => {
                registry.unregister_unmerged(&name);
                return Err(err);
            }
        };

        debug!(class = %name, configs = entry.accessors.len(), "class ready");
        self.entries.insert(name, Rc::clone(&entry));
        Ok(entry)
    }

    /// Like [`try_apply_class_config`](Self::try_apply_class_config), but a
    /// class name collision is a packaging defect and stops the process.
    ///
    /// # Panics
    ///
    /// Panics if a class with the same name is already registered.
    pub fn apply_class_config(
        &mut self,
        registry: &mut ConfigRegistry,
        definition: ClassDefinition,
    ) -> Result<Rc<ClassEntry>> {
        match self.try_apply_class_config(registry, definition) {
            Err(RuntimeError::DuplicateClassName(name)) => {
                error!(class = %name, "duplicate class registration");
                panic!("class `{name}` is already registered");
            }
            other => other,
        }
    }

    fn build_entry(registry: &mut ConfigRegistry, name: &str) -> Result<ClassEntry> {
        let merged = registry.merge(name)?;
        let destroy_hooks = registry
            .chain(name)?
            .iter()
            .filter_map(|def| def.destroy_hook().cloned())
            .collect();
        let accessors = AccessorSynthesizer::synthesize(&merged);
        Ok(ClassEntry {
            name: name.to_owned(),
            merged,
            accessors,
            destroy_hooks,
        })
    }

    /// The frozen entry for `name`.
    pub fn entry(&self, name: &str) -> Result<Rc<ClassEntry>> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownClass(name.to_owned()))
    }

    /// Whether a class entry was built for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applied_class_is_cached() {
        let mut reg = ConfigRegistry::new();
        let mut factory = ClassFactory::new();
        let entry = factory
            .try_apply_class_config(&mut reg, ClassDefinition::new("A").config("x_", 1))
            .unwrap();
        assert_eq!(entry.name(), "A");
        assert!(Rc::ptr_eq(&entry, &factory.entry("A").unwrap()));
        assert!(entry.accessor("x").is_ok());
        assert!(matches!(
            entry.accessor("y"),
            Err(RuntimeError::UnknownConfig { .. })
        ));
    }

    #[test]
    fn failed_merge_rolls_back_registration() {
        let mut reg = ConfigRegistry::new();
        let mut factory = ClassFactory::new();
        let err = factory
            .try_apply_class_config(&mut reg, ClassDefinition::new("B").extends("A"))
            .unwrap_err();
        assert_eq!(err, RuntimeError::UnknownClass("A".into()));
        assert!(!reg.contains("B"));

        factory
            .try_apply_class_config(&mut reg, ClassDefinition::new("A"))
            .unwrap();
        factory
            .try_apply_class_config(&mut reg, ClassDefinition::new("B").extends("A"))
            .unwrap();
        assert!(factory.contains("B"));
    }

    #[test]
    #[should_panic(expected = "class `A` is already registered")]
    fn duplicate_is_fatal() {
        let mut reg = ConfigRegistry::new();
        let mut factory = ClassFactory::new();
        factory
            .apply_class_config(&mut reg, ClassDefinition::new("A"))
            .unwrap();
        let _ = factory.apply_class_config(&mut reg, ClassDefinition::new("A"));
    }

    #[test]
    fn destroy_hooks_collected_leaf_first() {
        let mut reg = ConfigRegistry::new();
        let mut factory = ClassFactory::new();
        factory
            .try_apply_class_config(&mut reg, ClassDefinition::new("A").on_destroy(|_, _| Ok(())))
            .unwrap();
        factory
            .try_apply_class_config(&mut reg, ClassDefinition::new("B").extends("A"))
            .unwrap();
        let c = factory
            .try_apply_class_config(
                &mut reg,
                ClassDefinition::new("C").extends("B").on_destroy(|_, _| Ok(())),
            )
            .unwrap();
        assert_eq!(c.destroy_hooks().len(), 2);
    }
}
