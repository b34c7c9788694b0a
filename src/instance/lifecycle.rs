//! InstanceLifecycle: creation, batched updates, ownership and teardown.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::class::{ClassEntry, WriteMode};
use crate::error::{Result, RuntimeError};
use crate::runtime::Runtime;
use crate::value::Value;

use super::store::{Instance, InstanceId};

impl Runtime {
    /// Instantiate `class`, applying class defaults and `overrides` as one batch.
    ///
    /// The batch runs in merged declaration order regardless of the order in
    /// which `overrides` are given. Unknown override names are rejected before
    /// the instance is allocated.
    pub fn create<K>(
        &mut self,
        class: &str,
        overrides: impl IntoIterator<Item = (K, Value)>,
    ) -> Result<InstanceId>
    where
        K: Into<String>,
    {
        let entry = self.factory.entry(class)?;
        let mut overrides = collect_overrides(&entry, overrides)?;

        let liveness = self.shutdown.child_token();
        let id = self.instances.insert(Instance::new(Rc::clone(&entry), liveness));

        let mut batch = HashMap::new();
        for accessor in entry.accessors().iter() {
            if let Some(value) = overrides.remove(accessor.name()) {
                batch.insert(accessor.name().to_owned(), value);
            } else if accessor.default_needs_apply() {
                batch.insert(accessor.name().to_owned(), accessor.default_value().clone());
            }
        }

        if let Err(err) = self.run_batch(id, &entry, batch) {
            warn!(class, ?id, error = %err, "initial batch failed, discarding instance");
            self.abandon(id);
            return Err(err);
        }

        debug!(app = ?self.config().app_name, class, ?id, "created instance");
        Ok(id)
    }

    /// Apply several config writes as one batch in merged declaration order.
    pub fn set_many<K>(
        &mut self,
        id: InstanceId,
        values: impl IntoIterator<Item = (K, Value)>,
    ) -> Result<()>
    where
        K: Into<String>,
    {
        let entry = Rc::clone(&self.instances.live(id)?.class);
        let values = collect_overrides(&entry, values)?;
        self.run_batch(id, &entry, values)
    }

    fn run_batch(
        &mut self,
        id: InstanceId,
        entry: &ClassEntry,
        mut values: HashMap<String, Value>,
    ) -> Result<()> {
        self.instances.live_mut(id)?.pending_batch = values.keys().cloned().collect();

        let mut result = Ok(());
        for accessor in entry.accessors().iter() {
            let Some(value) = values.remove(accessor.name()) else {
                continue;
            };
            if let Some(instance) = self.instances.get_mut(id) {
                instance.pending_batch.remove(accessor.name());
            }
            if let Err(err) = accessor.write(self, id, value, WriteMode::Notify) {
                result = Err(err);
                break;
            }
        }

        if let Some(instance) = self.instances.get_mut(id) {
            instance.pending_batch.clear();
        }
        result
    }

    /// Store into a slot, moving ownership of any child instances involved.
    ///
    /// Under relaxed ownership a child claimed from another owner is nulled
    /// out of that owner's storage, so it is never held from two places.
    pub(crate) fn store_slot(
        &mut self,
        id: InstanceId,
        slot: usize,
        config: &str,
        value: Value,
    ) -> Result<()> {
        let claimed = value.instances();
        let mut moved = Vec::new();
        for &child in &claimed {
            if child == id {
                return Err(RuntimeError::InvalidValue {
                    config: config.to_owned(),
                    message: "an instance cannot own itself".into(),
                });
            }
            let Some(owner) = self.instances.live(child)?.owner else {
                continue;
            };
            if owner == id {
                continue;
            }
            if self.config().strict_ownership && self.instances.is_live(owner) {
                return Err(RuntimeError::AlreadyOwned { child, owner });
            }
            moved.push((owner, child));
        }

        let instance = self.instances.live_mut(id)?;
        let old = std::mem::replace(&mut instance.storage[slot], value);
        let still_held: HashSet<InstanceId> = instance.owned_children().into_iter().collect();

        for released in old.instances() {
            if still_held.contains(&released) {
                continue;
            }
            if let Some(child) = self.instances.get_mut(released) {
                if child.owner == Some(id) {
                    trace!(parent = ?id, child = ?released, "released child");
                    child.owner = None;
                }
            }
        }
        for (previous, child) in moved {
            self.forget_child(previous, child);
            trace!(from = ?previous, to = ?id, ?child, "moved child");
        }
        for child in claimed {
            if let Some(child) = self.instances.get_mut(child) {
                child.owner = Some(id);
            }
        }
        Ok(())
    }

    /// Null every reference `owner` holds to `child`. No hooks run; mounted
    /// owners report an update per touched config.
    fn forget_child(&mut self, owner: InstanceId, child: InstanceId) {
        let Some(Instance { class, storage, .. }) = self.instances.get_mut(owner) else {
            return;
        };
        let touched: Vec<String> = class
            .accessors()
            .iter()
            .filter(|a| storage[a.slot()].null_instance(child))
            .map(|a| a.name().to_owned())
            .collect();
        for config in touched {
            self.lifecycle.on_update(owner, &config);
        }
    }

    /// Children that `id` holds in storage and still owns.
    fn owned_by(&self, id: InstanceId) -> Vec<InstanceId> {
        let Some(instance) = self.instances.get(id) else {
            return Vec::new();
        };
        instance
            .owned_children()
            .into_iter()
            .filter(|&child| {
                self.instances
                    .get(child)
                    .is_some_and(|c| c.owner == Some(id))
            })
            .collect()
    }

    /// Tear down an instance and every child it owns.
    ///
    /// Destruction is not idempotent: calling this on an instance that is
    /// already destroyed (or mid-teardown) fails with
    /// [`RuntimeError::DestroyedInstanceAccess`] before anything else happens.
    /// Once teardown starts it always completes; the first error raised by an
    /// `on_destroy` hook or a child's teardown is returned afterwards.
    pub fn destroy(&mut self, id: InstanceId) -> Result<()> {
        let instance = self.instances.live_mut(id)?;
        if instance.destroying {
            return Err(RuntimeError::DestroyedInstanceAccess(id));
        }
        instance.destroying = true;
        instance.liveness.cancel();
        let entry = Rc::clone(&instance.class);

        let mut first_error = None;
        for hook in entry.destroy_hooks() {
            if let Err(err) = hook(self, id) {
                warn!(class = entry.name(), ?id, error = %err, "destroy hook failed");
                first_error = first_error.or(Some(err));
            }
        }

        let (children, child_error) = self.destroy_owned(id);
        if let Some(err) = child_error {
            first_error = first_error.or(Some(err));
        }

        let owner = self.finish_teardown(id, &children);
        self.lifecycle.on_destroy(id, owner);
        debug!(
            app = ?self.config().app_name,
            class = entry.name(),
            ?id,
            children = children.len(),
            failed = first_error.is_some(),
            "destroyed instance"
        );
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Destroy every child `id` owns. Returns them and the first failure.
    fn destroy_owned(&mut self, id: InstanceId) -> (Vec<InstanceId>, Option<RuntimeError>) {
        let children = self.owned_by(id);
        let mut first_error = None;
        for &child in &children {
            let pending = self
                .instances
                .get(child)
                .is_some_and(|c| !c.destroyed && !c.destroying);
            if !pending {
                trace!(parent = ?id, ?child, "child already torn down");
                continue;
            }
            if let Err(err) = self.destroy(child) {
                first_error = first_error.or(Some(err));
            }
        }
        (children, first_error)
    }

    /// Null references to `children` and mark `id` destroyed. Returns its owner.
    fn finish_teardown(&mut self, id: InstanceId, children: &[InstanceId]) -> Option<InstanceId> {
        let instance = self.instances.get_mut(id)?;
        for value in instance.storage.iter_mut() {
            for &child in children {
                value.null_instance(child);
            }
        }
        instance.running_after_set.clear();
        instance.pending_batch.clear();
        instance.destroyed = true;
        instance.owner
    }

    /// Destroy every live instance that has no owner.
    ///
    /// Owned instances go down with their owners. Every root is torn down even
    /// when one fails; the first error is returned.
    pub fn shutdown(&mut self) -> Result<()> {
        let mut first_error = None;
        for id in self.instances.live_ids() {
            let is_root = self
                .instances
                .get(id)
                .is_some_and(|i| !i.destroyed && !i.destroying && i.owner.is_none());
            if is_root {
                if let Err(err) = self.destroy(id) {
                    first_error = first_error.or(Some(err));
                }
            }
        }
        self.shutdown.cancel();
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Discard a half-built instance without running its own teardown hooks.
    ///
    /// Children its batch already created and claimed are destroyed normally.
    fn abandon(&mut self, id: InstanceId) {
        let Some(instance) = self.instances.get_mut(id) else {
            return;
        };
        instance.destroying = true;
        instance.liveness.cancel();

        let (children, child_error) = self.destroy_owned(id);
        if let Some(err) = child_error {
            warn!(?id, error = %err, "child teardown failed while discarding instance");
        }
        self.finish_teardown(id, &children);
    }
}

/// Resolve override names against the class, rejecting unknown ones.
fn collect_overrides<K: Into<String>>(
    entry: &ClassEntry,
    values: impl IntoIterator<Item = (K, Value)>,
) -> Result<HashMap<String, Value>> {
    let mut out = HashMap::new();
    for (name, value) in values {
        let name = name.into();
        entry.accessor(&name)?;
        out.insert(name, value);
    }
    Ok(out)
}
