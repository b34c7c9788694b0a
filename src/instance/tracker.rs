//! Mount bookkeeping for rendering collaborators.
//!
//! A collaborator only ever sees instances through this queue: which ones are
//! mounted, which reactive configs changed while mounted, and which ones went
//! away (with the owner that should drop its keyed entry for them).

use std::collections::HashSet;

use super::store::InstanceId;

/// Something a rendering collaborator has to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The instance became visible.
    Mount { instance: InstanceId },
    /// The instance was hidden. It stays alive and may be mounted again.
    Unmount { instance: InstanceId },
    /// A notifying write changed `config` on a mounted instance.
    Update { instance: InstanceId, config: String },
    /// The instance was torn down. `owner` held it, if anything did.
    Destroy {
        instance: InstanceId,
        owner: Option<InstanceId>,
    },
}

impl LifecycleEvent {
    /// The instance this event is about.
    pub fn instance(&self) -> InstanceId {
        match self {
            LifecycleEvent::Mount { instance }
            | LifecycleEvent::Unmount { instance }
            | LifecycleEvent::Update { instance, .. }
            | LifecycleEvent::Destroy { instance, .. } => *instance,
        }
    }
}

/// Mounted set plus the queue of events not yet drained.
#[derive(Debug, Default)]
pub struct LifecycleTracker {
    mounted: HashSet<InstanceId>,
    destroyed: HashSet<InstanceId>,
    pending: Vec<LifecycleEvent>,
}

impl LifecycleTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mount. Mounting twice, or mounting a destroyed instance,
    /// queues nothing.
    pub fn on_mount(&mut self, id: InstanceId) {
        if self.destroyed.contains(&id) {
            return;
        }
        if self.mounted.insert(id) {
            self.pending.push(LifecycleEvent::Mount { instance: id });
        }
    }

    /// Record an unmount. No-op if the instance was not mounted.
    pub fn on_unmount(&mut self, id: InstanceId) {
        if self.mounted.remove(&id) {
            self.pending.push(LifecycleEvent::Unmount { instance: id });
        }
    }

    /// Record a changed config. Only mounted instances produce events.
    pub fn on_update(&mut self, id: InstanceId, config: &str) {
        if self.mounted.contains(&id) {
            self.pending.push(LifecycleEvent::Update {
                instance: id,
                config: config.to_owned(),
            });
        }
    }

    /// Record a teardown, unmounting first if needed. Reported once per instance.
    pub fn on_destroy(&mut self, id: InstanceId, owner: Option<InstanceId>) {
        if !self.destroyed.insert(id) {
            return;
        }
        self.on_unmount(id);
        self.pending.push(LifecycleEvent::Destroy { instance: id, owner });
    }

    /// Whether `id` is mounted.
    pub fn is_mounted(&self, id: InstanceId) -> bool {
        self.mounted.contains(&id)
    }

    pub fn mounted_count(&self) -> usize {
        self.mounted.len()
    }

    /// Drain pending events in order of occurrence.
    pub fn drain(&mut self) -> Vec<LifecycleEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use slotmap::SlotMap;

    fn ids(n: usize) -> Vec<InstanceId> {
        let mut sm: SlotMap<InstanceId, ()> = SlotMap::with_key();
        (0..n).map(|_| sm.insert(())).collect()
    }

    #[test]
    fn double_mount_is_one_event() {
        let id = ids(1)[0];
        let mut tracker = LifecycleTracker::new();

        tracker.on_mount(id);
        tracker.on_mount(id);
        assert_eq!(tracker.mounted_count(), 1);
        assert_eq!(tracker.drain(), vec![LifecycleEvent::Mount { instance: id }]);
    }

    #[test]
    fn updates_name_the_config_and_need_a_mount() {
        let id = ids(1)[0];
        let mut tracker = LifecycleTracker::new();

        tracker.on_update(id, "style");
        assert!(!tracker.has_pending());

        tracker.on_mount(id);
        tracker.on_update(id, "style");
        tracker.on_unmount(id);
        tracker.on_unmount(id);
        assert_eq!(
            tracker.drain(),
            vec![
                LifecycleEvent::Mount { instance: id },
                LifecycleEvent::Update {
                    instance: id,
                    config: "style".into()
                },
                LifecycleEvent::Unmount { instance: id },
            ]
        );
    }

    #[test]
    fn destroy_unmounts_first_and_reports_owner() {
        let ids = ids(2);
        let (owner, id) = (ids[0], ids[1]);
        let mut tracker = LifecycleTracker::new();

        tracker.on_mount(id);
        let _ = tracker.drain();
        tracker.on_destroy(id, Some(owner));
        tracker.on_destroy(id, Some(owner));
        assert!(!tracker.is_mounted(id));

        let events = tracker.drain();
        assert_eq!(
            events,
            vec![
                LifecycleEvent::Unmount { instance: id },
                LifecycleEvent::Destroy {
                    instance: id,
                    owner: Some(owner)
                },
            ]
        );
        assert!(events.iter().all(|e| e.instance() == id));
    }

    #[test]
    fn destroyed_instances_cannot_remount() {
        let id = ids(1)[0];
        let mut tracker = LifecycleTracker::new();

        tracker.on_destroy(id, None);
        tracker.on_mount(id);
        assert!(!tracker.is_mounted(id));
        assert_eq!(
            tracker.drain(),
            vec![LifecycleEvent::Destroy {
                instance: id,
                owner: None
            }]
        );
    }
}
