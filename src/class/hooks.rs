//! Hook storage and dispatch.
//!
//! Hooks are registered explicitly on a [`ClassDefinition`] and resolved once,
//! when the merged map is built. Dispatch is synchronous and single-pass:
//! `before_set` transforms the incoming value, the accessor compares and
//! stores, then `after_set` reacts. A write that lands on a config whose
//! `after_set` is already on the stack for the same instance stores normally
//! but does not re-enter that `after_set`.
//!
//! [`ClassDefinition`]: crate::config::ClassDefinition

use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::error::Result;
use crate::instance::InstanceId;
use crate::runtime::Runtime;
use crate::value::Value;

/// `(runtime, id, stored) -> served`
pub type BeforeGetHook = Rc<dyn Fn(&Runtime, InstanceId, &Value) -> Value>;
/// `(runtime, id, incoming, old) -> candidate`
pub type BeforeSetHook = Rc<dyn Fn(&mut Runtime, InstanceId, Value, &Value) -> Result<Value>>;
/// `(runtime, id, value, old)`
pub type AfterSetHook = Rc<dyn Fn(&mut Runtime, InstanceId, &Value, &Value) -> Result<()>>;
/// `(runtime, id)`
pub type DestroyHook = Rc<dyn Fn(&mut Runtime, InstanceId) -> Result<()>>;

/// The optional hooks bound to one config.
#[derive(Clone, Default)]
pub struct HookSet {
    pub before_get: Option<BeforeGetHook>,
    pub before_set: Option<BeforeSetHook>,
    pub after_set: Option<AfterSetHook>,
}

impl HookSet {
    pub fn is_empty(&self) -> bool {
        self.before_get.is_none() && self.before_set.is_none() && self.after_set.is_none()
    }

    /// Overlay `self` on an ancestor's hooks: each slot set here wins.
    pub fn inherit(&self, ancestor: &HookSet) -> HookSet {
        HookSet {
            before_get: self.before_get.clone().or_else(|| ancestor.before_get.clone()),
            before_set: self.before_set.clone().or_else(|| ancestor.before_set.clone()),
            after_set: self.after_set.clone().or_else(|| ancestor.after_set.clone()),
        }
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSet")
            .field("before_get", &self.before_get.is_some())
            .field("before_set", &self.before_set.is_some())
            .field("after_set", &self.after_set.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Value served by a read. Not written back into storage.
pub(crate) fn dispatch_before_get(
    hooks: &HookSet,
    rt: &Runtime,
    id: InstanceId,
    stored: Value,
) -> Value {
    match &hooks.before_get {
        Some(hook) => hook(rt, id, &stored),
        None => stored,
    }
}

/// Candidate value for a write (identity without a hook).
pub(crate) fn dispatch_before_set(
    hooks: &HookSet,
    rt: &mut Runtime,
    id: InstanceId,
    incoming: Value,
    old: &Value,
) -> Result<Value> {
    match hooks.before_set.clone() {
        Some(hook) => hook(rt, id, incoming, old),
        None => Ok(incoming),
    }
}

/// Run `after_set` unless it is already running for this slot of `id`.
pub(crate) fn dispatch_after_set(
    hooks: &HookSet,
    rt: &mut Runtime,
    id: InstanceId,
    slot: usize,
    config: &str,
    value: &Value,
    old: &Value,
) -> Result<()> {
    let Some(hook) = hooks.after_set.clone() else {
        return Ok(());
    };

    if !rt.instances.live_mut(id)?.running_after_set.insert(slot) {
        trace!(?id, config, "after_set already running, nested write not re-dispatched");
        return Ok(());
    }

    trace!(?id, config, %value, %old, "after_set");
    let result = hook(rt, id, value, old);

    if let Some(instance) = rt.instances.get_mut(id) {
        instance.running_after_set.remove(&slot);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_after(_: &mut Runtime, _: InstanceId, _: &Value, _: &Value) -> Result<()> {
        Ok(())
    }

    fn identity_before(_: &mut Runtime, _: InstanceId, v: Value, _: &Value) -> Result<Value> {
        Ok(v)
    }

    #[test]
    fn inherit_prefers_own_slots() {
        let own_after: AfterSetHook = Rc::new(noop_after);
        let own = HookSet {
            after_set: Some(Rc::clone(&own_after)),
            ..HookSet::default()
        };
        let ancestor = HookSet {
            before_set: Some(Rc::new(identity_before) as BeforeSetHook),
            after_set: Some(Rc::new(noop_after) as AfterSetHook),
            ..HookSet::default()
        };
        let merged = own.inherit(&ancestor);
        assert!(merged.before_set.is_some());
        assert!(Rc::ptr_eq(merged.after_set.as_ref().unwrap(), &own_after));
        assert!(merged.before_get.is_none());
    }

    #[test]
    fn empty_set() {
        assert!(HookSet::default().is_empty());
        let dbg = format!("{:?}", HookSet::default());
        assert!(dbg.contains("after_set: false"));
    }
}
