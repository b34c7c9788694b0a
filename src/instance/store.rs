//! Instance records and the slotmap arena that holds them.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};
use tokio_util::sync::CancellationToken;

use crate::class::ClassEntry;
use crate::error::{Result, RuntimeError};
use crate::value::Value;

new_key_type! {
    /// Unique identifier for an instance. Copy, lightweight (u64).
    pub struct InstanceId;
}

/// Per-instance state. Mutated only through the runtime's accessors.
pub struct Instance {
    pub(crate) class: Rc<ClassEntry>,
    /// Slot-indexed config storage.
    pub(crate) storage: Vec<Value>,
    /// Configs queued in the running batch but not yet applied.
    pub(crate) pending_batch: HashSet<String>,
    /// Slots whose `after_set` is currently on the stack.
    pub(crate) running_after_set: HashSet<usize>,
    pub(crate) owner: Option<InstanceId>,
    /// Revoked when teardown starts.
    pub(crate) liveness: CancellationToken,
    pub(crate) destroying: bool,
    pub(crate) destroyed: bool,
}

impl Instance {
    pub(crate) fn new(class: Rc<ClassEntry>, liveness: CancellationToken) -> Self {
        let storage = class.accessors().initial_storage();
        Self {
            class,
            storage,
            pending_batch: HashSet::new(),
            running_after_set: HashSet::new(),
            owner: None,
            liveness,
            destroying: false,
            destroyed: false,
        }
    }

    /// Name of the class the instance was created from.
    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    /// The instance holding this one, if any.
    pub fn owner(&self) -> Option<InstanceId> {
        self.owner
    }

    /// Whether teardown has completed.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Every child instance referenced from storage, deduplicated, in slot order.
    pub(crate) fn owned_children(&self) -> Vec<InstanceId> {
        let mut seen = HashSet::new();
        self.storage
            .iter()
            .flat_map(Value::instances)
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.name())
            .field("owner", &self.owner)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

/// Arena of every instance a runtime has created, destroyed ones included.
#[derive(Default)]
pub struct InstanceArena {
    slots: SlotMap<InstanceId, Instance>,
}

impl InstanceArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, instance: Instance) -> InstanceId {
        self.slots.insert(instance)
    }

    /// The record for `id`, destroyed or not.
    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.slots.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.slots.get_mut(id)
    }

    /// The instance, unless unknown or destroyed.
    pub fn live(&self, id: InstanceId) -> Result<&Instance> {
        match self.slots.get(id) {
            None => Err(RuntimeError::UnknownInstance(id)),
            Some(inst) if inst.destroyed => Err(RuntimeError::DestroyedInstanceAccess(id)),
            Some(inst) => Ok(inst),
        }
    }

    pub(crate) fn live_mut(&mut self, id: InstanceId) -> Result<&mut Instance> {
        match self.slots.get_mut(id) {
            None => Err(RuntimeError::UnknownInstance(id)),
            Some(inst) if inst.destroyed => Err(RuntimeError::DestroyedInstanceAccess(id)),
            Some(inst) => Ok(inst),
        }
    }

    /// Whether `id` exists and is not destroyed.
    pub fn is_live(&self, id: InstanceId) -> bool {
        self.slots.get(id).is_some_and(|i| !i.destroyed)
    }

    /// Ids of live instances, in allocation order.
    pub fn live_ids(&self) -> Vec<InstanceId> {
        self.slots
            .iter()
            .filter(|(_, i)| !i.destroyed)
            .map(|(id, _)| id)
            .collect()
    }

    /// Number of instances not yet destroyed.
    pub fn live_count(&self) -> usize {
        self.slots.values().filter(|i| !i.destroyed).count()
    }

    /// Number of records, destroyed ones included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
