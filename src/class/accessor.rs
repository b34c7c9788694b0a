//! AccessorSynthesizer: per-class getter/setter tables.
//!
//! Each config is bound to a private storage slot. Public names never index
//! storage directly, so a hook that reads or writes its own config through the
//! runtime goes through the accessor again rather than recursing on storage.

use indexmap::IndexMap;
use tracing::trace;

use crate::config::MergedConfigMap;
use crate::error::Result;
use crate::instance::InstanceId;
use crate::runtime::Runtime;
use crate::value::Value;

use super::hooks::{self, HookSet};

/// How a write notifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Compare, store on change, then `after_set`.
    #[default]
    Notify,
    /// Store and run `after_set` even when the value is unchanged.
    Force,
    /// Store without running `after_set`.
    Silent,
}

/// Getter/setter pair for one config.
#[derive(Debug, Clone)]
pub struct Accessor {
    name: String,
    slot: usize,
    reactive: bool,
    default_value: Value,
    base_value: Value,
    hooks: HookSet,
}

impl Accessor {
    /// Public config name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Private storage slot.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Whether writes run hooks and report updates.
    pub fn is_reactive(&self) -> bool {
        self.reactive
    }

    /// Default of the most-derived declaration.
    pub fn default_value(&self) -> &Value {
        &self.default_value
    }

    /// Value the slot holds before the creation batch runs.
    pub fn initial_value(&self) -> &Value {
        if self.reactive {
            &self.base_value
        } else {
            &self.default_value
        }
    }

    /// Whether creation must push the class default through the setter.
    pub(crate) fn default_needs_apply(&self) -> bool {
        self.reactive && !self.default_value.same_value(&self.base_value)
    }

    /// Read through `before_get` when present.
    pub(crate) fn read(&self, rt: &Runtime, id: InstanceId) -> Result<Value> {
        let stored = rt.instances.live(id)?.storage[self.slot].clone();
        if !self.reactive {
            return Ok(stored);
        }
        Ok(hooks::dispatch_before_get(&self.hooks, rt, id, stored))
    }

    /// Run the setter path. Returns whether the value was stored.
    pub(crate) fn write(
        &self,
        rt: &mut Runtime,
        id: InstanceId,
        incoming: Value,
        mode: WriteMode,
    ) -> Result<bool> {
        let old = rt.instances.live(id)?.storage[self.slot].clone();

        if !self.reactive {
            let changed = !incoming.same_value(&old);
            rt.store_slot(id, self.slot, &self.name, incoming)?;
            return Ok(changed);
        }

        let candidate = hooks::dispatch_before_set(&self.hooks, rt, id, incoming, &old)?;
        if mode == WriteMode::Notify && candidate.same_value(&old) {
            trace!(?id, config = %self.name, "unchanged, skipping");
            return Ok(false);
        }

        rt.store_slot(id, self.slot, &self.name, candidate.clone())?;
        if mode == WriteMode::Silent {
            return Ok(true);
        }

        rt.lifecycle.on_update(id, &self.name);
        hooks::dispatch_after_set(&self.hooks, rt, id, self.slot, &self.name, &candidate, &old)?;
        Ok(true)
    }
}

/// Accessors of one class, in merged declaration order.
#[derive(Debug, Clone, Default)]
pub struct AccessorTable {
    accessors: IndexMap<String, Accessor>,
}

impl AccessorTable {
    pub fn get(&self, name: &str) -> Option<&Accessor> {
        self.accessors.get(name)
    }

    /// Accessors in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Accessor> {
        self.accessors.values()
    }

    pub fn len(&self) -> usize {
        self.accessors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessors.is_empty()
    }

    /// Fresh storage for a new instance.
    pub fn initial_storage(&self) -> Vec<Value> {
        self.accessors
            .values()
            .map(|a| a.initial_value().clone())
            .collect()
    }
}

/// Builds [`AccessorTable`]s from merged config maps.
pub struct AccessorSynthesizer;

impl AccessorSynthesizer {
    /// Bind every descriptor of `merged` to a slot, in declaration order.
    pub fn synthesize(merged: &MergedConfigMap) -> AccessorTable {
        let accessors = merged
            .iter()
            .enumerate()
            .map(|(slot, descriptor)| {
                let accessor = Accessor {
                    name: descriptor.name.clone(),
                    slot,
                    reactive: descriptor.reactive,
                    default_value: descriptor.default_value.clone(),
                    base_value: descriptor.base_value.clone(),
                    hooks: descriptor.hooks.clone(),
                };
                (descriptor.name.clone(), accessor)
            })
            .collect();
        AccessorTable { accessors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClassDefinition, ConfigMap, ConfigRegistry};
    use pretty_assertions::assert_eq;

    fn table_for(defs: Vec<ClassDefinition>, name: &str) -> AccessorTable {
        let mut reg = ConfigRegistry::new();
        for def in defs {
            reg.register(def).unwrap();
        }
        AccessorSynthesizer::synthesize(&reg.merge(name).unwrap())
    }

    #[test]
    fn slots_follow_declaration_order() {
        let table = table_for(
            vec![ClassDefinition::new("A").configs(
                ConfigMap::new().declare("x_", 1).declare("y", 2).declare("z_", 3),
            )],
            "A",
        );
        let slots: Vec<_> = table.iter().map(|a| (a.name().to_owned(), a.slot())).collect();
        assert_eq!(
            slots,
            vec![("x".into(), 0), ("y".into(), 1), ("z".into(), 2)]
        );
        assert!(table.get("x").unwrap().is_reactive());
        assert!(!table.get("y").unwrap().is_reactive());
    }

    #[test]
    fn overridden_reactive_default_starts_at_base() {
        let table = table_for(
            vec![
                ClassDefinition::new("Base").config("floating_", false),
                ClassDefinition::new("Derived")
                    .extends("Base")
                    .config("floating_", true)
                    .config("gap", 4),
            ],
            "Derived",
        );
        let floating = table.get("floating").unwrap();
        assert_eq!(floating.initial_value(), &Value::Bool(false));
        assert_eq!(floating.default_value(), &Value::Bool(true));
        assert!(floating.default_needs_apply());
        assert_eq!(
            table.initial_storage(),
            vec![Value::Bool(false), Value::Int(4)]
        );
    }
}
