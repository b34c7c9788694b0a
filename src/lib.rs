//! # reclass
//!
//! A reactive config and class composition engine with a cross-context call
//! bridge.
//!
//! Classes declare configs; configs whose declared name ends in `_` are
//! reactive and get accessors that run optional `before_get`, `before_set`
//! and `after_set` hooks. Classes extend one ancestor and inherit its configs
//! and hooks. Instances live in a [`Runtime`] arena and may own child
//! instances, which are destroyed along with them.
//!
//! ## Core Systems
//!
//! - **[`config`]**: Class definitions, config declarations, merged maps
//! - **[`class`]**: Accessor synthesis, hook dispatch, class factory
//! - **[`instance`]**: Instance arena, creation batches, teardown, mount tracking
//! - **[`runtime`]**: The explicit registry + arena owner and its config
//! - **[`bridge`]**: Id-tagged async calls into a privileged context
//! - **[`widgets`]**: `component.Base` and the `menu.List` sub menu state machine
//! - **[`value`]**: Dynamic config values
//! - **[`geometry`]**: Offsets and bounding rectangles
//!
//! ## Example
//!
//! ```
//! use reclass::{ClassDefinition, Runtime, Value};
//!
//! let mut rt = Runtime::default();
//! rt.apply_class_config(ClassDefinition::new("Base").config("floating_", false))
//!     .unwrap();
//! rt.apply_class_config(
//!     ClassDefinition::new("Derived")
//!         .extends("Base")
//!         .config("floating_", true),
//! )
//! .unwrap();
//!
//! let id = rt.create::<&str>("Derived", []).unwrap();
//! assert_eq!(rt.get(id, "floating").unwrap(), Value::Bool(true));
//! ```

// Foundation
pub mod error;
pub mod geometry;
pub mod value;

// Engine
pub mod class;
pub mod config;
pub mod instance;
pub mod runtime;

// Cross-context calls
pub mod bridge;

// Built-in classes
pub mod widgets;

pub use class::WriteMode;
pub use config::{ClassDefinition, ConfigMap};
pub use error::{BridgeError, Result, RuntimeError};
pub use instance::{InstanceId, LifecycleEvent};
pub use runtime::{Runtime, RuntimeConfig};
pub use value::Value;

// Proc macros (feature-gated)
#[cfg(feature = "macros")]
pub use reclass_macros::class_config;
