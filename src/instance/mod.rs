//! Instances: arena storage, lifecycle operations, mount tracking.
//!
//! - [`InstanceArena`]: slotmap of [`Instance`] records keyed by [`InstanceId`].
//! - `lifecycle`: `create`, `set_many`, `destroy` and `shutdown` on
//!   [`Runtime`](crate::runtime::Runtime).
//! - [`LifecycleTracker`]: mount state and events for rendering collaborators.

mod lifecycle;
pub mod store;
pub mod tracker;

pub use store::{Instance, InstanceArena, InstanceId};
pub use tracker::{LifecycleEvent, LifecycleTracker};
