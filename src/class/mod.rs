//! Class composition: accessor synthesis, hook dispatch, class factory.
//!
//! - [`AccessorSynthesizer`]: turns a merged map into slot-bound accessors.
//! - [`hooks`]: `before_get` / `before_set` / `after_set` storage and dispatch.
//! - [`ClassFactory`]: registers, merges and freezes classes.

pub mod accessor;
pub mod factory;
pub mod hooks;

pub use accessor::{Accessor, AccessorSynthesizer, AccessorTable, WriteMode};
pub use factory::{ClassEntry, ClassFactory};
pub use hooks::{AfterSetHook, BeforeGetHook, BeforeSetHook, DestroyHook, HookSet};
